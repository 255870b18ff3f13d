//! API Router
//!
//! Combines the API endpoints from the ticket and attachment modules into a
//! unified router.

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::tickets::configure_tickets_routes())
        .merge(crate::attachments::configure_attachments_routes())
        .route("/health", get(crate::main_module::health_check))
}
