pub mod catalog;
pub mod downloader;

pub use catalog::{Catalog, Tier};
pub use downloader::{bytes_to_gb, LinePrompter, ModelDownloader};
