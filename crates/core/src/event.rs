//! Typed events carried in the processing service's `data:` frames.
//!
//! The wire shape is `{"type": "...", "message": "...", "data": {...}}`,
//! where `data` is only present (and required) on `complete`.

use serde::{Deserialize, Serialize};

/// Discriminant of a [`StreamEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Progress,
    Thinking,
    Complete,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Progress => "progress",
            Self::Thinking => "thinking",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// `Complete` and `Error` end a stream's active consolidation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded server-sent event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Progress {
        message: String,
    },
    Thinking {
        message: String,
    },
    Complete {
        message: String,
        data: CompletionPayload,
    },
    Error {
        message: String,
    },
}

impl StreamEvent {
    /// Decode the JSON payload of a single `data:` frame.
    pub fn from_frame(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Progress { .. } => EventKind::Progress,
            Self::Thinking { .. } => EventKind::Thinking,
            Self::Complete { .. } => EventKind::Complete,
            Self::Error { .. } => EventKind::Error,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Progress { message }
            | Self::Thinking { message }
            | Self::Complete { message, .. }
            | Self::Error { message } => message,
        }
    }

    pub fn payload(&self) -> Option<&CompletionPayload> {
        match self {
            Self::Complete { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// Result summary attached to a `complete` event.
///
/// `chart_url` and `download_url` are paths relative to the service base
/// address; see [`resolve_ref`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionPayload {
    pub chart_url: String,
    pub download_url: String,
    pub event_count: u64,
    pub actor_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_count: Option<u64>,
    /// Handle for follow-up regeneration requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<CaseMetadata>,
}

/// Case header extracted from the analysed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseMetadata {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub case_type: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// Join a service-relative path onto the service base address.
///
/// Absolute `http(s)://` references are returned unchanged.
pub fn resolve_ref(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
