//! Request/response types for the Hubble processing service.
//!
//! Stream event types live in `hubble-core` and are re-exported here so
//! callers only need one import path for everything on the wire.

use serde::{Deserialize, Serialize};

pub use hubble_core::event::{CaseMetadata, CompletionPayload, EventKind, StreamEvent};

// ─── Endpoints ───────────────────────────────────────────────────────────────

/// Multipart upload returning a `text/event-stream` body.
pub const PROCESS_PATH: &str = "/api/process";
/// Form-encoded regeneration request.
pub const REGENERATE_PATH: &str = "/api/regenerate";
pub const HEALTH_PATH: &str = "/health";

/// Multipart field carrying the document bytes.
pub const FILE_FIELD: &str = "file";
/// Multipart field carrying the effective request.
pub const REQUEST_FIELD: &str = "request";

// ─── Health ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

// ─── Regenerate ──────────────────────────────────────────────────────────────

/// Ask the service to rebuild a finished timeline with a modification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegenerateRequest {
    /// `session_id` from the completion payload.
    pub session_id: String,
    /// Free-form instruction, e.g. "Move legend to right side".
    pub modification: String,
}

/// The service answers 200 with either a result or an `error` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RegenerateResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RegenerateResponse {
    /// Split an in-band `error` out into a `Result`.
    pub fn into_result(self) -> Result<Self, String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}
