use crate::config::{Config, ExistingFilePolicy};
use crate::error::{Error, Result};
use crate::hub::HubClient;
use crate::model::Catalog;
use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Downloaded { path: PathBuf, size_bytes: u64 },
    /// The file was already present and left untouched.
    Skipped { path: PathBuf },
}

/// Asks whether an existing file should be replaced.
pub trait Prompter {
    fn confirm_overwrite(&mut self, filename: &str) -> bool;
}

/// Reads the answer from a line-oriented source, stdin in production.
pub struct LinePrompter<R> {
    input: R,
}

impl LinePrompter<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> LinePrompter<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Prompter for LinePrompter<R> {
    fn confirm_overwrite(&mut self, filename: &str) -> bool {
        println!("✓ Model already exists: {}", filename);
        print!("  Overwrite? (y/N): ");
        let _ = io::stdout().flush();

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
            Err(e) => {
                tracing::warn!("Could not read answer: {}", e);
                false
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl DownloadTally {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.all_succeeded() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    fn record(&mut self, result: &Result<DownloadOutcome>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Closing status block printed after a batch.
impl fmt::Display for DownloadTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        if self.all_succeeded() {
            writeln!(f, "✓ Successfully downloaded {} model(s)", self.succeeded)?;
        } else {
            writeln!(
                f,
                "⚠️  Downloaded {} model(s), {} failed",
                self.succeeded, self.failed
            )?;
        }
        writeln!(f, "{rule}")
    }
}

pub struct ModelDownloader<'a> {
    catalog: &'a Catalog,
    hub: &'a dyn HubClient,
    prompter: Box<dyn Prompter + 'a>,
    models_dir: PathBuf,
    token: Option<String>,
    policy: ExistingFilePolicy,
}

impl<'a> ModelDownloader<'a> {
    pub fn new(
        config: &Config,
        catalog: &'a Catalog,
        hub: &'a dyn HubClient,
        prompter: Box<dyn Prompter + 'a>,
    ) -> Self {
        Self {
            catalog,
            hub,
            prompter,
            models_dir: config.models_dir.clone(),
            token: config.token.clone(),
            policy: config.policy,
        }
    }

    /// Download one catalog entry into the models directory.
    pub fn download_one(&mut self, key: &str) -> Result<DownloadOutcome> {
        let entry = self.catalog.resolve(key)?;

        println!("\n{}", "=".repeat(60));
        println!("📥 Downloading: {}", entry.description);
        println!("   Repository: {}", entry.repo_id);
        println!("   File: {}", entry.filename);
        println!("   Size: ~{:.1} GB", entry.size_gb);
        println!("{}\n", "=".repeat(60));

        let target = self.models_dir.join(&entry.filename);
        let mut replacing = false;

        if target.exists() {
            let overwrite = match self.policy {
                ExistingFilePolicy::Overwrite => true,
                ExistingFilePolicy::Skip => {
                    println!("✓ Model already exists: {}", entry.filename);
                    false
                }
                ExistingFilePolicy::Prompt => self.prompter.confirm_overwrite(&entry.filename),
            };

            if !overwrite {
                println!("  Skipping...");
                return Ok(DownloadOutcome::Skipped { path: target });
            }

            tracing::debug!("Removing existing file {:?}", target);
            fs::remove_file(&target)?;
            replacing = true;
        }

        // A replaced file may share its blob with the hub cache, so it is fetched again.
        let resume = !replacing;

        let path = self.hub.fetch_file(
            &entry.repo_id,
            &entry.filename,
            &self.models_dir,
            self.token.as_deref(),
            resume,
        )?;

        let size_bytes = fs::metadata(&path)
            .map_err(|e| Error::FetchFailed {
                filename: entry.filename.clone(),
                message: format!("downloaded file is missing at {}: {}", path.display(), e),
            })?
            .len();

        println!(
            "\n✓ Successfully downloaded: {} ({:.2} GB)",
            entry.filename,
            bytes_to_gb(size_bytes)
        );

        Ok(DownloadOutcome::Downloaded { path, size_bytes })
    }

    /// Downloads each key in order; a failure is reported and counted, never fatal.
    pub fn download_many<S: AsRef<str>>(&mut self, keys: &[S]) -> DownloadTally {
        let mut tally = DownloadTally::default();
        let total = keys.len();

        for (i, key) in keys.iter().enumerate() {
            if total > 1 {
                print!("\n[{}/{}] ", i + 1, total);
            }
            let result = self.download_one(key.as_ref());
            match &result {
                Ok(DownloadOutcome::Downloaded { path, size_bytes }) => {
                    tracing::debug!(model = key.as_ref(), size_bytes, "Stored at {:?}", path);
                }
                Ok(DownloadOutcome::Skipped { path }) => {
                    tracing::debug!(model = key.as_ref(), "Kept existing {:?}", path);
                }
                Err(e) => report_failure(key.as_ref(), e),
            }
            tally.record(&result);
        }

        tally
    }

    pub fn download_preset(&mut self, name: &str) -> Result<DownloadTally> {
        let catalog = self.catalog;
        let preset = catalog.preset(name)?;

        if let Err(Error::UnknownModel(key)) = catalog.resolve_preset(name) {
            println!("⚠️  Preset '{}' includes unknown model '{}'", name, key);
        }

        println!("\n🎯 Downloading preset: {}", preset.name);
        println!("   Models: {}", preset.models.len());
        println!("   Total size: ~{:.1} GB", catalog.preset_size_gb(preset));

        Ok(self.download_many(&preset.models))
    }
}

fn report_failure(key: &str, err: &Error) {
    match err {
        Error::UnknownModel(_) => {
            println!("❌ Unknown model: {}", key);
            println!("   Run with --list to see available models");
        }
        _ => println!("\n❌ {}", err),
    }
    tracing::warn!(model = key, error = %err, "Download failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::path::Path;

    #[derive(Debug, Clone, PartialEq)]
    struct FetchCall {
        repo_id: String,
        filename: String,
        resume: bool,
        target_existed: bool,
    }

    /// Writes `payload` to the destination, or fails for filenames listed in `failing`.
    struct MockHub {
        calls: RefCell<Vec<FetchCall>>,
        payload: &'static [u8],
        failing: Vec<&'static str>,
        /// Report success without writing anything.
        write_nothing: bool,
    }

    impl MockHub {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                payload: b"fresh weights",
                failing: Vec::new(),
                write_nothing: false,
            }
        }

        fn writing_nothing() -> Self {
            Self {
                write_nothing: true,
                ..Self::new()
            }
        }

        fn failing(filenames: &[&'static str]) -> Self {
            Self {
                failing: filenames.to_vec(),
                ..Self::new()
            }
        }

        fn calls(&self) -> Vec<FetchCall> {
            self.calls.borrow().clone()
        }
    }

    impl HubClient for MockHub {
        fn fetch_file(
            &self,
            repo_id: &str,
            filename: &str,
            dest_dir: &Path,
            _token: Option<&str>,
            resume: bool,
        ) -> Result<PathBuf> {
            let target = dest_dir.join(filename);
            self.calls.borrow_mut().push(FetchCall {
                repo_id: repo_id.to_string(),
                filename: filename.to_string(),
                resume,
                target_existed: target.exists(),
            });

            if self.failing.iter().any(|f| *f == filename) {
                return Err(Error::FetchFailed {
                    filename: filename.to_string(),
                    message: "connection reset".to_string(),
                });
            }

            if !self.write_nothing {
                fs::write(&target, self.payload)?;
            }
            Ok(target)
        }

        fn list_files(&self, _repo_id: &str, _token: Option<&str>) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct FixedAnswer(bool);

    impl Prompter for FixedAnswer {
        fn confirm_overwrite(&mut self, _filename: &str) -> bool {
            self.0
        }
    }

    fn config(dir: &Path, policy: ExistingFilePolicy) -> Config {
        Config {
            models_dir: dir.to_path_buf(),
            token: None,
            policy,
            catalog_path: None,
            cache_dir: None,
            progress: false,
        }
    }

    const Q5_FILE: &str = "Qwen3-4B-Instruct-2507-Q5_K_M.gguf";

    #[test]
    fn fetches_qwen3_q5_with_catalog_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::builtin().unwrap();
        let hub = MockHub::new();
        let cfg = config(dir.path(), ExistingFilePolicy::Overwrite);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(false)));

        let outcome = downloader.download_one("qwen3-4b-q5").unwrap();

        assert_eq!(
            hub.calls(),
            [FetchCall {
                repo_id: "unsloth/Qwen3-4B-Instruct-2507-GGUF".to_string(),
                filename: Q5_FILE.to_string(),
                resume: true,
                target_existed: false,
            }]
        );
        assert_eq!(
            outcome,
            DownloadOutcome::Downloaded {
                path: dir.path().join(Q5_FILE),
                size_bytes: b"fresh weights".len() as u64,
            }
        );
    }

    #[test]
    fn unknown_model_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let models_dir = dir.path().join("models");
        let catalog = Catalog::builtin().unwrap();
        let hub = MockHub::new();
        let cfg = config(&models_dir, ExistingFilePolicy::Overwrite);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(true)));

        let result = downloader.download_one("no-such-model");

        assert!(matches!(result, Err(Error::UnknownModel(key)) if key == "no-such-model"));
        assert!(hub.calls().is_empty());
        assert!(!models_dir.exists());
    }

    #[test]
    fn overwrite_removes_stale_file_before_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(Q5_FILE);
        fs::write(&target, b"stale").unwrap();

        let catalog = Catalog::builtin().unwrap();
        let hub = MockHub::new();
        let cfg = config(dir.path(), ExistingFilePolicy::Overwrite);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(false)));

        downloader.download_one("qwen3-4b-q5").unwrap();

        assert!(!hub.calls()[0].target_existed);
        assert!(!hub.calls()[0].resume);
        assert_eq!(fs::read(&target).unwrap(), b"fresh weights");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn skip_policy_leaves_existing_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(Q5_FILE);
        fs::write(&target, b"keep me").unwrap();

        let catalog = Catalog::builtin().unwrap();
        let hub = MockHub::new();
        let cfg = config(dir.path(), ExistingFilePolicy::Skip);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(true)));

        let outcome = downloader.download_one("qwen3-4b-q5").unwrap();

        assert_eq!(outcome, DownloadOutcome::Skipped { path: target.clone() });
        assert!(hub.calls().is_empty());
        assert_eq!(fs::read(&target).unwrap(), b"keep me");
    }

    #[test]
    fn prompt_policy_follows_the_answer() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(Q5_FILE);
        let catalog = Catalog::builtin().unwrap();
        let cfg = config(dir.path(), ExistingFilePolicy::Prompt);

        fs::write(&target, b"old").unwrap();
        let hub = MockHub::new();
        let prompter = LinePrompter::new(Cursor::new("no\n"));
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(prompter));
        assert!(matches!(
            downloader.download_one("qwen3-4b-q5").unwrap(),
            DownloadOutcome::Skipped { .. }
        ));
        assert_eq!(fs::read(&target).unwrap(), b"old");

        let hub = MockHub::new();
        let prompter = LinePrompter::new(Cursor::new(" Y \n"));
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(prompter));
        assert!(matches!(
            downloader.download_one("qwen3-4b-q5").unwrap(),
            DownloadOutcome::Downloaded { .. }
        ));
        assert_eq!(fs::read(&target).unwrap(), b"fresh weights");
    }

    #[test]
    fn prompt_at_end_of_input_skips() {
        let mut prompter = LinePrompter::new(Cursor::new(""));
        assert!(!prompter.confirm_overwrite("model.gguf"));
    }

    #[test]
    fn minimal_preset_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::builtin().unwrap();
        let hub = MockHub::new();
        let cfg = config(dir.path(), ExistingFilePolicy::Skip);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(false)));

        let tally = downloader.download_preset("minimal").unwrap();

        assert_eq!(tally, DownloadTally { succeeded: 1, failed: 0 });
        assert_eq!(hub.calls().len(), 1);
        assert_eq!(hub.calls()[0].filename, Q5_FILE);
    }

    #[test]
    fn preset_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::builtin().unwrap();
        let hub = MockHub::failing(&[Q5_FILE]);
        let cfg = config(dir.path(), ExistingFilePolicy::Skip);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(false)));

        let tally = downloader.download_preset("recommended").unwrap();
        let preset_len = catalog.preset("recommended").unwrap().models.len();

        assert_eq!(tally, DownloadTally { succeeded: 2, failed: 1 });
        assert_eq!(tally.succeeded + tally.failed, preset_len);
        assert_eq!(hub.calls().len(), preset_len);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::builtin().unwrap();
        let hub = MockHub::new();
        let cfg = config(dir.path(), ExistingFilePolicy::Skip);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(false)));

        assert!(matches!(
            downloader.download_preset("everything"),
            Err(Error::UnknownPreset(_))
        ));
        assert!(hub.calls().is_empty());
    }

    #[test]
    fn dangling_preset_member_fails_only_itself() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::builtin().unwrap();
        catalog.merge(
            Catalog::parse(
                r#"
                [[preset]]
                name = "partial"
                models = ["qwen3-4b-q5", "gone", "qwen3-4b-q4"]
                "#,
            )
            .unwrap(),
        );
        let hub = MockHub::new();
        let cfg = config(dir.path(), ExistingFilePolicy::Skip);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(false)));

        let tally = downloader.download_preset("partial").unwrap();

        assert_eq!(tally, DownloadTally { succeeded: 2, failed: 1 });
        assert_eq!(hub.calls().len(), 2);
    }

    #[test]
    fn explicit_keys_are_tallied() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::builtin().unwrap();
        let hub = MockHub::new();
        let cfg = config(dir.path(), ExistingFilePolicy::Skip);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(false)));

        let tally = downloader.download_many(&["phi3-mini-q5", "bogus"]);

        assert_eq!(tally, DownloadTally { succeeded: 1, failed: 1 });
        assert_eq!(hub.calls()[0].repo_id, "microsoft/Phi-3-mini-4k-instruct-gguf");
    }

    #[test]
    fn fresh_download_resumes_partial_transfers() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::builtin().unwrap();
        let hub = MockHub::new();
        let cfg = config(dir.path(), ExistingFilePolicy::Overwrite);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(false)));

        downloader.download_one("qwen3-4b-q4").unwrap();

        assert!(hub.calls()[0].resume);
    }

    #[test]
    fn missing_file_after_fetch_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::builtin().unwrap();
        let hub = MockHub::writing_nothing();
        let cfg = config(dir.path(), ExistingFilePolicy::Skip);
        let mut downloader = ModelDownloader::new(&cfg, &catalog, &hub, Box::new(FixedAnswer(false)));

        let result = downloader.download_one("qwen3-4b-q5");
        assert!(matches!(
            result,
            Err(Error::FetchFailed { filename, .. }) if filename == Q5_FILE
        ));

        let tally = downloader.download_many(&["qwen3-4b-q5"]);
        assert_eq!(tally, DownloadTally { succeeded: 0, failed: 1 });
        assert!(!tally.all_succeeded());
    }

    #[test]
    fn exit_code_reflects_failures() {
        let all_good = DownloadTally { succeeded: 3, failed: 0 };
        assert!(all_good.all_succeeded());
        assert!(all_good.to_string().contains("✓ Successfully downloaded 3 model(s)"));

        let partial = DownloadTally { succeeded: 2, failed: 1 };
        assert!(!partial.all_succeeded());
        assert!(partial.to_string().contains("Downloaded 2 model(s), 1 failed"));

        let nothing = DownloadTally::default();
        assert!(nothing.all_succeeded());
        assert!(nothing.to_string().contains("Successfully downloaded 0 model(s)"));
    }
}
