//! HTTP API hosting the conversation turns

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::{DatabaseStorage, ProductionRuntime, RuntimeManager};
use crate::services::SessionTokenStore;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager<DatabaseStorage>>,
    /// Receives tokens from the sign-in callback
    pub tokens: Arc<SessionTokenStore>,
}

impl AppState {
    pub fn new(runtime: ProductionRuntime, tokens: Arc<SessionTokenStore>) -> Self {
        Self {
            runtime: Arc::new(RuntimeManager::new(runtime)),
            tokens,
        }
    }
}
