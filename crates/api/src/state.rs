//! Shared application state for the Axum API server.

use std::sync::Arc;

use pump_engine::tracking::TrackingService;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub tracking: Arc<TrackingService>,
    /// Expected value of the `x-api-key` header.
    pub api_key: Arc<str>,
}

impl AppState {
    pub fn new(tracking: Arc<TrackingService>, api_key: &str) -> Self {
        Self {
            tracking,
            api_key: Arc::from(api_key),
        }
    }
}
