//! Session state shared between the upload coordinator and the stream
//! consolidator.
//!
//! The struct is owned by the caller and mutated through `&mut` borrows only,
//! so a single writer is enforced at compile time.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::event::CompletionPayload;
use crate::transcript::{EntryId, EntryKind, Speaker, TranscriptEntry};

/// The only media type the processing service accepts.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Assistant entry appended when a non-PDF file is selected.
pub const REJECTED_ATTACHMENT_TEXT: &str = "⚠️ Please upload a PDF document.";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttachmentError {
    #[error("unsupported media type {media_type} for {file_name}: only PDF documents are accepted")]
    UnsupportedType {
        file_name: String,
        media_type: String,
    },
    #[error("attachment path has no file name: {0}")]
    MissingFileName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A document selected for upload but not yet submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    file_name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, deriving the media type from its extension.
    pub fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| AttachmentError::MissingFileName(path.display().to_string()))?;
        let bytes = std::fs::read(path)?;
        let media_type = media_type_for(&file_name);
        Ok(Self::new(file_name, media_type, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }
}

fn media_type_for(file_name: &str) -> &'static str {
    let is_pdf = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        PDF_MEDIA_TYPE
    } else {
        "application/octet-stream"
    }
}

/// Everything the rendering layer needs to draw a conversation.
#[derive(Debug, Default, Serialize)]
pub struct SessionState {
    transcript: Vec<TranscriptEntry>,
    input: String,
    #[serde(skip)]
    pending_attachment: Option<Attachment>,
    is_streaming: bool,
    chart_ref: Option<String>,
    download_ref: Option<String>,
    completion: Option<CompletionPayload>,
    #[serde(skip)]
    next_id: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Read-only projections ─────────────────────────────────────────────

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn entry(&self, id: EntryId) -> Option<&TranscriptEntry> {
        self.transcript.iter().find(|e| e.id == id)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn pending_attachment(&self) -> Option<&Attachment> {
        self.pending_attachment.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn chart_ref(&self) -> Option<&str> {
        self.chart_ref.as_deref()
    }

    pub fn download_ref(&self) -> Option<&str> {
        self.download_ref.as_deref()
    }

    pub fn completion(&self) -> Option<&CompletionPayload> {
        self.completion.as_ref()
    }

    /// Entries currently carrying the consolidation marker.
    pub fn consolidated_entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.transcript.iter().filter(|e| e.is_consolidated())
    }

    // ── Input surface ─────────────────────────────────────────────────────

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Stage a document for the next submission.
    ///
    /// Non-PDF files are refused with an assistant notice; the previously
    /// staged attachment (if any) stays in place.
    pub fn select_attachment(&mut self, attachment: Attachment) -> Result<(), AttachmentError> {
        if !attachment.is_pdf() {
            self.push_entry(Speaker::Assistant, REJECTED_ATTACHMENT_TEXT, EntryKind::Plain);
            return Err(AttachmentError::UnsupportedType {
                file_name: attachment.file_name,
                media_type: attachment.media_type,
            });
        }
        debug!(file = %attachment.file_name, size = attachment.bytes.len(), "attachment staged");
        self.pending_attachment = Some(attachment);
        Ok(())
    }

    /// Drop the staged attachment without touching the transcript.
    pub fn cancel_attachment(&mut self) -> Option<Attachment> {
        self.pending_attachment.take()
    }

    // ── Mutation helpers (crate-internal) ─────────────────────────────────

    pub(crate) fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub(crate) fn take_attachment(&mut self) -> Option<Attachment> {
        self.pending_attachment.take()
    }

    pub(crate) fn push_entry(
        &mut self,
        speaker: Speaker,
        text: impl Into<String>,
        kind: EntryKind,
    ) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.transcript.push(TranscriptEntry {
            id,
            speaker,
            text: text.into(),
            kind,
        });
        id
    }

    pub(crate) fn entry_mut(&mut self, id: EntryId) -> Option<&mut TranscriptEntry> {
        self.transcript.iter_mut().find(|e| e.id == id)
    }

    /// Nearest consolidated entry, scanning from the most recent backward.
    pub(crate) fn last_consolidated(&self) -> Option<EntryId> {
        self.transcript
            .iter()
            .rev()
            .find(|e| e.is_consolidated())
            .map(|e| e.id)
    }

    /// Clear the marker on every entry left over from earlier submissions.
    pub(crate) fn demote_consolidated(&mut self) {
        for entry in self.transcript.iter_mut().filter(|e| e.is_consolidated()) {
            entry.kind = EntryKind::Plain;
        }
    }

    pub(crate) fn set_streaming(&mut self, streaming: bool) {
        self.is_streaming = streaming;
    }

    pub(crate) fn set_completion(
        &mut self,
        chart_ref: String,
        download_ref: String,
        payload: CompletionPayload,
    ) {
        self.chart_ref = Some(chart_ref);
        self.download_ref = Some(download_ref);
        self.completion = Some(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_follows_extension() {
        assert_eq!(media_type_for("report.pdf"), PDF_MEDIA_TYPE);
        assert_eq!(media_type_for("REPORT.PDF"), PDF_MEDIA_TYPE);
        assert_eq!(media_type_for("notes.docx"), "application/octet-stream");
        assert_eq!(media_type_for("pdf"), "application/octet-stream");
    }

    #[test]
    fn from_path_reads_bytes_and_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("brief.pdf");
        std::fs::write(&path, b"%PDF-1.4\n").expect("write pdf");

        let attachment = Attachment::from_path(&path).expect("read attachment");
        assert_eq!(attachment.file_name(), "brief.pdf");
        assert!(attachment.is_pdf());
        assert_eq!(attachment.bytes(), b"%PDF-1.4\n");
    }

    #[test]
    fn from_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Attachment::from_path(&dir.path().join("missing.pdf")).expect_err("missing");
        assert!(matches!(err, AttachmentError::Io(_)));
    }

    #[test]
    fn rejecting_attachment_appends_notice_and_keeps_previous() {
        let mut state = SessionState::new();
        state
            .select_attachment(Attachment::new("a.pdf", PDF_MEDIA_TYPE, vec![1]))
            .expect("pdf accepted");

        let err = state
            .select_attachment(Attachment::new("b.png", "image/png", vec![2]))
            .expect_err("png rejected");
        assert!(matches!(err, AttachmentError::UnsupportedType { .. }));

        assert_eq!(state.transcript().len(), 1);
        assert_eq!(state.transcript()[0].speaker, Speaker::Assistant);
        assert_eq!(state.transcript()[0].text, REJECTED_ATTACHMENT_TEXT);
        assert_eq!(
            state.pending_attachment().map(Attachment::file_name),
            Some("a.pdf")
        );
        assert!(!state.is_streaming());
    }

    #[test]
    fn cancel_attachment_leaves_transcript_alone() {
        let mut state = SessionState::new();
        state.set_input("keep me");
        state
            .select_attachment(Attachment::new("a.pdf", PDF_MEDIA_TYPE, vec![]))
            .expect("pdf accepted");

        let removed = state.cancel_attachment().expect("attachment removed");
        assert_eq!(removed.file_name(), "a.pdf");
        assert!(state.pending_attachment().is_none());
        assert!(state.transcript().is_empty());
        assert_eq!(state.input(), "keep me");
        assert!(state.cancel_attachment().is_none());
    }

    #[test]
    fn entry_ids_are_unique_and_ordered() {
        let mut state = SessionState::new();
        let a = state.push_entry(Speaker::User, "a", EntryKind::Plain);
        let b = state.push_entry(Speaker::Assistant, "b", EntryKind::Consolidated);
        let c = state.push_entry(Speaker::Assistant, "c", EntryKind::Plain);
        assert!(a < b && b < c);
        assert_eq!(state.last_consolidated(), Some(b));
        assert_eq!(state.entry(c).map(|e| e.text.as_str()), Some("c"));

        state.demote_consolidated();
        assert_eq!(state.last_consolidated(), None);
        assert_eq!(state.consolidated_entries().count(), 0);
    }
}
