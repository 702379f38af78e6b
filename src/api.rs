//! HTTP surface for the chat transport adapter
//!
//! The adapter posts chat updates per user and listens on an SSE stream for
//! the messages to send back.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::ProductionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ProductionManager>,
}

impl AppState {
    pub fn new(runtime: ProductionManager) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }
}
