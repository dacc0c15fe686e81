//! Shared types for the HTTP layer.

use std::sync::Arc;

use serde::Serialize;

use crate::core_state::CoreState;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Entry of the static brand catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Brand {
    pub name: &'static str,
    pub logo_url: &'static str,
}
