//! Human-readable tables and the post-download summary.

use crate::error::Result;
use crate::model::{bytes_to_gb, Catalog, Tier};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const MODEL_EXTENSION: &str = "gguf";

#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub dir: PathBuf,
    pub files: Vec<LocalFile>,
}

impl Summary {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);

        writeln!(f, "\n{rule}\n📊 Download Summary\n{rule}\n")?;
        writeln!(f, "Models directory: {}", self.dir.display())?;
        writeln!(f, "\nDownloaded models:")?;
        for file in &self.files {
            writeln!(f, "  {:50} {:>6.2} GB", file.name, bytes_to_gb(file.size_bytes))?;
        }
        writeln!(f, "\n  Total: {:.2} GB", bytes_to_gb(self.total_bytes()))?;

        writeln!(f, "\n📝 Next steps:")?;
        writeln!(f, "  Set MODELS_DIR={} for the inference server", self.dir.display())
    }
}

/// Model files directly under `dir`, sorted by name. Read-only.
pub fn summarize(dir: &Path) -> Result<Summary> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_model = path
            .extension()
            .is_some_and(|ext| ext == MODEL_EXTENSION);
        if !is_model || !entry.file_type()?.is_file() {
            continue;
        }

        files.push(LocalFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            size_bytes: entry.metadata()?.len(),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Summary {
        dir: dir.to_path_buf(),
        files,
    })
}

/// Catalog grouped by tier, as printed by `--list`.
pub struct ModelsTable<'a>(pub &'a Catalog);

impl fmt::Display for ModelsTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n📦 Available Models:")?;

        for tier in Tier::ALL {
            let mut models = self.0.models_in_tier(tier).peekable();
            if models.peek().is_none() {
                continue;
            }

            writeln!(f, "\n{}:", tier.label())?;
            writeln!(f, "{}", "-".repeat(60))?;
            for model in models {
                let size = format!("{:.1} GB", model.size_gb);
                writeln!(f, "  {:20} {:>10}  {}", model.key, size, model.description)?;
            }
        }

        Ok(())
    }
}

pub struct PresetsTable<'a>(pub &'a Catalog);

impl fmt::Display for PresetsTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let catalog = self.0;
        writeln!(f, "\n🎯 Available Presets:\n")?;

        for preset in catalog.presets() {
            writeln!(
                f,
                "  {:15} {} models ({:.1} GB)",
                preset.name,
                preset.models.len(),
                catalog.preset_size_gb(preset)
            )?;
            for key in &preset.models {
                writeln!(f, "    - {}", key)?;
            }
        }

        Ok(())
    }
}

/// Keeps only model files from a repository listing.
pub fn model_files(files: Vec<String>) -> Vec<String> {
    let suffix = format!(".{MODEL_EXTENSION}");
    files.into_iter().filter(|f| f.ends_with(&suffix)).collect()
}

pub struct BrowseListing<'a> {
    pub repo_id: &'a str,
    pub files: &'a [String],
}

impl fmt::Display for BrowseListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📂 Browsing GGUF files in: {}\n", self.repo_id)?;

        if self.files.is_empty() {
            writeln!(f, "  No GGUF files found")?;
        }
        for (i, file) in self.files.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, file)?;
        }

        Ok(())
    }
}
