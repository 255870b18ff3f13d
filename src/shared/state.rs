use crate::config::AppConfig;
use crate::shared::utils::DbPool;
use crate::storage::BlobStore;

/// Process-wide state, constructed once in `main` and handed to every
/// handler as `State<Arc<AppState>>`.
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub blobs: BlobStore,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            config: self.config.clone(),
            blobs: self.blobs.clone(),
        }
    }
}
