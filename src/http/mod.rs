//! HTTP API surface
//!
//! Thin adapter binding the core to the wire:
//! - POST /v1/audio/transcriptions - Authenticate and route an upload
//! - GET /v1/local_service_status - Health belief for the local backend
//! - GET /usage - Per-client usage counters for today

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
