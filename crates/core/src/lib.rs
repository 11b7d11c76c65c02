//! Core of the Hubble document-analysis client: transcript model, session
//! state, stream framing and the consolidation protocol.

pub mod consolidate;
pub mod coordinator;
pub mod event;
pub mod frame;
pub mod state;
pub mod transcript;

pub use consolidate::{Consolidator, NoopSink, Phase, StreamOutcome, Update, UpdateSink};
pub use coordinator::{ProcessRequest, Submission, fail_submission, plan_submission};
pub use event::{CaseMetadata, CompletionPayload, EventKind, StreamEvent, resolve_ref};
pub use state::{Attachment, AttachmentError, SessionState};
pub use transcript::{EntryId, EntryKind, Speaker, TranscriptEntry};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
