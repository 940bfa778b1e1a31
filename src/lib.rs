use std::sync::Arc;
use std::time::Duration;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;

pub use domain::{entities, use_cases};
pub use interfaces::{handlers, repositories, routes};
pub use infrastructure::storage;

use repositories::portfolio::{InMemoryPortfolioRepo, PortfolioRepository};
use storage::local::LocalDiskStorage;
use use_cases::metadata::MetadataExtractor;
use use_cases::upload::MediaUploadHandler;

pub type AppMediaHandler = MediaUploadHandler<LocalDiskStorage>;

pub struct AppState {
    pub media_handler: AppMediaHandler,
    pub portfolio_repo: Arc<dyn PortfolioRepository>,
}

impl AppState {
    pub fn new(config: &settings::AppConfig) -> Self {
        let storage = LocalDiskStorage::new(&config.upload_dir);
        let extractor = MetadataExtractor::new(
            config.ffprobe_path.clone(),
            Duration::from_secs(config.probe_timeout_secs),
        );
        let media_handler = MediaUploadHandler::new(storage, extractor);

        AppState {
            media_handler,
            portfolio_repo: Arc::new(InMemoryPortfolioRepo::new()),
        }
    }
}
