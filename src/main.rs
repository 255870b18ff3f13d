use dotenvy::dotenv;
use log::info;
use std::sync::Arc;

use ticketserver::config::AppConfig;
use ticketserver::main_module::run_server;
use ticketserver::shared::state::AppState;
use ticketserver::shared::utils::create_conn;
use ticketserver::storage::{BlobStore, UPLOADS_PREFIX};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();

    let pool = create_conn(config.database_url()).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            format!("Database pool creation failed: {}", e),
        )
    })?;

    let blobs = BlobStore::new(&config.storage.data_dir);
    blobs.ensure_root()?;
    info!(
        "Blob store rooted at {}",
        config.storage.data_dir.join(UPLOADS_PREFIX).display()
    );

    let server = config.server.clone();
    let app_state = Arc::new(AppState {
        conn: pool,
        config,
        blobs,
    });

    run_server(app_state, server).await
}
