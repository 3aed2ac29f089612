use std::sync::Arc;

use ama_events::Notifier;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: ama_db::DbPool,
    /// Server configuration, including the order settings.
    pub config: Arc<ServerConfig>,
    /// Post-commit push and email dispatch.
    pub notifier: Arc<dyn Notifier>,
}
