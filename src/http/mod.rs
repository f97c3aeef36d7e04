//! HTTP API for browsing stored lectures
//!
//! This module provides a REST API over the session store:
//! - GET /sessions - Session metadata, newest first
//! - GET /sessions/:id - Full session snapshot
//! - DELETE /sessions/:id - Remove a session
//! - GET /sessions/:id/usage - Cost breakdown by tag
//! - GET /sessions/:id/transcript - Plain-text transcript download
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
