//! Submission planning: decides whether a send is a plain chat turn or a
//! document-processing request, and writes the opening transcript entries.
//!
//! The network half lives in `hubble-api-client`; everything here is a
//! synchronous mutation of [`SessionState`].

use tracing::{debug, info};

use crate::state::{Attachment, SessionState};
use crate::transcript::{EntryId, EntryKind, Speaker};

/// Request used when the user attaches a document without typing anything.
pub const DEFAULT_REQUEST: &str = "stakeholders";

/// Static reply to a chat turn sent without a document.
pub const UPLOAD_FIRST_TEXT: &str = "Please upload a document to analyze.";

/// Prefix of the local annotation written when a submission fails.
pub const SUBMISSION_ERROR_PREFIX: &str = "❌ Error processing document: ";

/// Prompts offered to users who do not know what to ask for.
pub const SUGGESTED_REQUESTS: [&str; 4] = [
    "Show executive timeline",
    "Focus on regulatory events",
    "Analyze all stakeholders",
    "Show key milestones only",
];

/// Outcome of [`plan_submission`].
#[derive(Debug)]
pub enum Submission {
    /// Nothing to send.
    Ignored,
    /// A stream is already being consolidated.
    Busy,
    /// Plain chat turn, answered locally.
    Chat,
    /// Document upload; the caller must issue the request.
    Process(ProcessRequest),
}

/// Everything needed to issue a processing request.
#[derive(Debug)]
pub struct ProcessRequest {
    pub attachment: Attachment,
    /// Effective request sent as the `request` form field.
    pub request: String,
    /// Consolidated entry that receives the stream's output.
    pub target: EntryId,
}

/// Trimmed user text, or [`DEFAULT_REQUEST`] when nothing was typed.
pub fn effective_request(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        DEFAULT_REQUEST.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Opening text of the consolidated entry for a given effective request.
pub fn acknowledgment(request: &str) -> String {
    let phrase = if request == DEFAULT_REQUEST {
        "analyze all stakeholders"
    } else {
        request
    };
    format!("Okay! I will {phrase} for you...")
}

/// Consume the current input and staged attachment.
///
/// On a document submission this appends the upload notice, the typed text
/// (if any) and the consolidated acknowledgment, clears the inputs and marks
/// the session as streaming. The returned [`ProcessRequest`] carries the
/// handle of the consolidated entry.
pub fn plan_submission(state: &mut SessionState) -> Submission {
    let has_text = !state.input().trim().is_empty();
    let has_attachment = state.pending_attachment().is_some();

    if !has_text && !has_attachment {
        return Submission::Ignored;
    }
    if state.is_streaming() {
        debug!("submission refused while a stream is active");
        return Submission::Busy;
    }

    let text = state.take_input();
    let Some(attachment) = state.take_attachment() else {
        state.push_entry(Speaker::User, text, EntryKind::Plain);
        state.push_entry(Speaker::Assistant, UPLOAD_FIRST_TEXT, EntryKind::Plain);
        return Submission::Chat;
    };

    state.push_entry(
        Speaker::User,
        format!("📎 Uploaded: {}", attachment.file_name()),
        EntryKind::Plain,
    );
    if has_text {
        state.push_entry(Speaker::User, text.clone(), EntryKind::Plain);
    }

    let request = effective_request(&text);
    state.demote_consolidated();
    let target = state.push_entry(
        Speaker::Assistant,
        acknowledgment(&request),
        EntryKind::Consolidated,
    );
    state.set_streaming(true);

    info!(file = %attachment.file_name(), %request, %target, "document submission planned");
    Submission::Process(ProcessRequest {
        attachment,
        request,
        target,
    })
}

/// Record a submission that never produced a usable stream.
///
/// The reason is appended to the consolidated entry, or to a freshly
/// synthesized one when `target` is gone, and the streaming flag is cleared.
pub fn fail_submission(state: &mut SessionState, target: Option<EntryId>, reason: &str) {
    let target = target
        .filter(|id| state.entry(*id).is_some_and(|e| e.is_consolidated()))
        .or_else(|| state.last_consolidated());

    match target.and_then(|id| state.entry_mut(id)) {
        Some(entry) => {
            entry.text.push_str("\n\n");
            entry.text.push_str(SUBMISSION_ERROR_PREFIX);
            entry.text.push_str(reason);
        }
        None => {
            state.push_entry(
                Speaker::Assistant,
                format!("{SUBMISSION_ERROR_PREFIX}{reason}"),
                EntryKind::Consolidated,
            );
        }
    }
    state.set_streaming(false);
}
