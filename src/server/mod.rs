//! HTTP surface
//!
//! Routes, handlers and error-to-status mapping around the pipeline
//! and the store.

pub mod routes;

pub use routes::build_router;

use std::sync::Arc;

use crate::pipeline::PitchPipeline;
use crate::storage::Storage;

/// Shared handler state, constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PitchPipeline>,
    pub storage: Arc<dyn Storage>,
}
