use crate::error::{Error, Result};
use crate::model::bytes_to_gb;
use hf_hub::api::sync::{Api, ApiBuilder, ApiError};
use std::fs;
use std::path::{Path, PathBuf};

/// The two remote operations the downloader relies on.
pub trait HubClient {
    /// Fetch `filename` from `repo_id` into `dest_dir`, returning the local path.
    fn fetch_file(
        &self,
        repo_id: &str,
        filename: &str,
        dest_dir: &Path,
        token: Option<&str>,
        resume: bool,
    ) -> Result<PathBuf>;

    fn list_files(&self, repo_id: &str, token: Option<&str>) -> Result<Vec<String>>;
}

/// `HubClient` backed by the Hugging Face hub.
///
/// Files land in the hub's content cache first and are then hard-linked
/// (or copied) into the destination directory.
pub struct HfHubClient {
    cache_dir: Option<PathBuf>,
    progress: bool,
}

impl HfHubClient {
    pub fn new(cache_dir: Option<PathBuf>, progress: bool) -> Result<Self> {
        let client = Self {
            cache_dir,
            progress,
        };

        // Probe once so a broken environment fails before any action runs.
        client
            .api(None)
            .map_err(|e| Error::MissingDependency(e.to_string()))?;

        Ok(client)
    }

    fn api(&self, token: Option<&str>) -> std::result::Result<Api, ApiError> {
        let mut builder = ApiBuilder::new().with_progress(self.progress);

        // Without an explicit token the builder keeps the one saved by `huggingface-cli login`.
        if let Some(token) = token {
            builder = builder.with_token(Some(token.to_string()));
        }
        if let Some(cache_dir) = &self.cache_dir {
            builder = builder.with_cache_dir(cache_dir.clone());
        }

        builder.build()
    }
}

impl HubClient for HfHubClient {
    fn fetch_file(
        &self,
        repo_id: &str,
        filename: &str,
        dest_dir: &Path,
        token: Option<&str>,
        resume: bool,
    ) -> Result<PathBuf> {
        let fetch_error = |e: ApiError| Error::FetchFailed {
            filename: filename.to_string(),
            message: e.to_string(),
        };

        let api = self.api(token).map_err(fetch_error)?;
        let repo = api.model(repo_id.to_string());

        tracing::debug!(repo_id, filename, resume, "Fetching from hub");

        // `get` reuses whatever the cache already holds; `download` writes a fresh blob.
        let cached = if resume {
            repo.get(filename)
        } else {
            repo.download(filename)
        }
        .map_err(fetch_error)?;

        let target = dest_dir.join(filename);
        place(&cached, &target)?;

        Ok(target)
    }

    fn list_files(&self, repo_id: &str, token: Option<&str>) -> Result<Vec<String>> {
        let listing_error = |e: ApiError| Error::FetchFailed {
            filename: repo_id.to_string(),
            message: e.to_string(),
        };

        let api = self.api(token).map_err(listing_error)?;
        let info = api.model(repo_id.to_string()).info().map_err(listing_error)?;

        Ok(info.siblings.into_iter().map(|s| s.rfilename).collect())
    }
}

/// Link the cached blob at `target`, copying when a hard link is not possible.
fn place(cached: &Path, target: &Path) -> Result<()> {
    // Snapshot entries are symlinks into the blob store.
    let blob = fs::canonicalize(cached)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    if target.exists() {
        fs::remove_file(target)?;
    }

    if let Err(e) = fs::hard_link(&blob, target) {
        let size_gb = bytes_to_gb(fs::metadata(&blob)?.len());
        tracing::warn!(
            "Could not hard-link from the hub cache ({}); copying {:.2} GB, the cached copy at {:?} stays on disk",
            e,
            size_gb,
            blob
        );
        fs::copy(&blob, target)?;
    }

    Ok(())
}
