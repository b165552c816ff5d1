//! Application state for the HTTP server

use crate::{Config, Orchestrator};
use std::sync::Arc;

/// Shared state handed to every route handler (cheap Arc clone per request)
#[derive(Clone)]
pub struct AppState {
    /// The orchestrator, for job snapshots and event subscriptions
    pub orchestrator: Arc<Orchestrator>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(orchestrator: Arc<Orchestrator>, config: Arc<Config>) -> Self {
        Self {
            orchestrator,
            config,
        }
    }
}
