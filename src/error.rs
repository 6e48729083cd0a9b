use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("Unknown model: {0}")]
	UnknownModel(String),

	#[error("Unknown preset: {0}")]
	UnknownPreset(String),

	/// The hub client could not be initialised. Fatal, raised before any action runs.
	#[error("Hub client unavailable: {0}")]
	MissingDependency(String),

	#[error("Failed to download {filename}: {message}")]
	FetchFailed { filename: String, message: String },

	#[error("Invalid catalog: {0}")]
	InvalidCatalog(String),

	#[error("Configuration error: {0}")]
	ConfigError(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
