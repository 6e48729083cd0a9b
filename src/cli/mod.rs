use crate::config::ExistingFilePolicy;
use clap::Parser;
use std::path::PathBuf;

pub const USAGE_EXAMPLES: &str = "Usage:
  gguf-fetch --list
  gguf-fetch qwen3-4b-q5
  gguf-fetch --preset recommended";

#[derive(Parser, Debug)]
#[command(name = "gguf-fetch")]
#[command(version, about = "Download GGUF models from Hugging Face", long_about = None)]
#[command(after_help = USAGE_EXAMPLES)]
pub struct Cli {
	/// Model keys to download (see --list)
	pub models: Vec<String>,

	/// List all available models
	#[arg(short, long)]
	pub list: bool,

	/// List available presets
	#[arg(long)]
	pub presets: bool,

	/// Download a preset collection (e.g. minimal, recommended, production, qwen3-all)
	#[arg(short, long, value_name = "NAME")]
	pub preset: Option<String>,

	/// Models directory
	#[arg(short, long, env = "MODELS_DIR", default_value = "./models")]
	pub dir: PathBuf,

	/// Hugging Face token (for private or gated repos)
	#[arg(short, long, env = "HF_TOKEN", hide_env_values = true)]
	pub token: Option<String>,

	/// Force re-download even if the file exists
	#[arg(short, long)]
	pub force: bool,

	/// What to do with files already on disk (default: prompt on a terminal, skip otherwise)
	#[arg(long, value_enum, value_name = "POLICY")]
	pub on_exists: Option<ExistingFilePolicy>,

	/// Browse GGUF files in a Hugging Face repository
	#[arg(long, value_name = "REPO_ID")]
	pub browse: Option<String>,

	/// Extra catalog file merged over the built-in models and presets
	#[arg(long, env = "GGUF_FETCH_CATALOG", value_name = "PATH")]
	pub catalog: Option<PathBuf>,

	/// Hub cache directory
	#[arg(long, env = "HF_HUB_CACHE", value_name = "PATH")]
	pub cache_dir: Option<PathBuf>,

	/// Disable download progress bars
	#[arg(long)]
	pub no_progress: bool,

	/// Enable debug logging
	#[arg(short, long)]
	pub verbose: bool,
}

/// The single action an invocation performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	ListModels,
	ListPresets,
	Browse(String),
	Preset(String),
	Models(Vec<String>),
	NoModels,
}

impl Cli {
	/// Conflicting flags are resolved by priority, never rejected.
	pub fn action(&self) -> Action {
		if self.list {
			Action::ListModels
		} else if self.presets {
			Action::ListPresets
		} else if let Some(repo_id) = &self.browse {
			Action::Browse(repo_id.clone())
		} else if let Some(name) = &self.preset {
			Action::Preset(name.clone())
		} else if !self.models.is_empty() {
			Action::Models(self.models.clone())
		} else {
			Action::NoModels
		}
	}
}
