use std::sync::Arc;

use crate::channels::whatsapp::WhatsAppClient;
use crate::config::AppConfig;
use crate::llm::ImageAnalyzer;
use crate::shared::utils::DbPool;
use crate::storage::StorageClient;

/// Explicitly constructed collaborators shared by all handlers. Tests build
/// this with fakes instead of relying on process-wide singletons.
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub storage: StorageClient,
    pub whatsapp: WhatsAppClient,
    pub analyzer: Arc<dyn ImageAnalyzer>,
}
