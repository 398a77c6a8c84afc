//! Response bodies that aren't domain types.

use serde::Serialize;

use crate::store::RefreshStatus;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,

    /// Lines in the current snapshot, or `None` before the first refresh
    pub snapshot_lines: Option<usize>,

    /// Whether a refresh is running right now
    pub refreshing: bool,

    pub refresh: RefreshStatus,
}

/// Reply to `POST /refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshAccepted {
    pub status: &'static str,

    /// A refresh was already running; this one runs after it
    pub queued: bool,
}
