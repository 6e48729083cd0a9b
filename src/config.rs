use crate::cli::Cli;
use clap::ValueEnum;
use directories::ProjectDirs;
use std::io::IsTerminal;
use std::path::PathBuf;

/// What to do when the target file is already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExistingFilePolicy {
	Skip,
	Overwrite,
	Prompt,
}

#[derive(Debug, Clone)]
pub struct Config {
	pub models_dir: PathBuf,
	pub token: Option<String>,
	pub policy: ExistingFilePolicy,
	pub catalog_path: Option<PathBuf>,
	pub cache_dir: Option<PathBuf>,
	pub progress: bool,
}

impl Config {
	pub fn from_cli(cli: &Cli) -> crate::error::Result<Self> {
		let catalog_path = match &cli.catalog {
			Some(path) => Some(path.clone()),
			None => default_catalog_path(),
		};

		Ok(Self {
			models_dir: cli.dir.clone(),
			token: cli.token.clone().filter(|t| !t.is_empty()),
			policy: resolve_policy(cli.force, cli.on_exists, std::io::stdin().is_terminal()),
			catalog_path,
			cache_dir: cli.cache_dir.clone(),
			progress: !cli.no_progress,
		})
	}

	/// Creates the models directory and pins it to an absolute path.
	pub fn prepare_models_dir(&mut self) -> crate::error::Result<()> {
		std::fs::create_dir_all(&self.models_dir).map_err(|e| {
			crate::error::Error::ConfigError(format!(
				"Could not create models directory {}: {}",
				self.models_dir.display(),
				e
			))
		})?;
		self.models_dir = std::fs::canonicalize(&self.models_dir)?;
		Ok(())
	}
}

/// `--force` wins; otherwise the explicit choice, otherwise prompt only when someone can answer.
pub fn resolve_policy(
	force: bool,
	explicit: Option<ExistingFilePolicy>,
	interactive: bool,
) -> ExistingFilePolicy {
	if force {
		return ExistingFilePolicy::Overwrite;
	}
	match explicit {
		Some(policy) => policy,
		None if interactive => ExistingFilePolicy::Prompt,
		None => ExistingFilePolicy::Skip,
	}
}

/// `<config dir>/catalog.toml`, only if the file exists.
fn default_catalog_path() -> Option<PathBuf> {
	let project_dirs = ProjectDirs::from("", "", "gguf-fetch")?;
	let path = project_dirs.config_dir().join("catalog.toml");
	path.is_file().then_some(path)
}
