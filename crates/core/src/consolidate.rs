//! Stream consolidation: folds the processing service's event stream into
//! the single consolidated transcript entry of a submission.
//!
//! Phases: `Seeking` until a target entry resolves, `Accumulating` while
//! events are appended, `Terminated` once `complete` or `error` has been
//! applied. After termination every further frame is ignored.

use tracing::{debug, warn};

use crate::event::{StreamEvent, resolve_ref};
use crate::frame::FrameDecoder;
use crate::state::SessionState;
use crate::transcript::EntryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Seeking,
    Accumulating,
    Terminated,
}

/// Effect of a single frame on the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Progress or thinking text appended to the target entry.
    Appended { entry: EntryId, delta: String },
    /// Completion message appended; chart and download refs are now set.
    Completed { entry: EntryId, delta: String },
    /// Service-reported error appended; the stream is over.
    Failed { entry: EntryId, delta: String },
    /// Frame was not a well-formed event record.
    Malformed,
    /// No consolidated entry could be resolved for this event.
    Unrouted,
    /// Event arrived after a terminal event.
    Ignored,
}

/// How a consumed stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Failed,
    /// The byte stream closed without a terminal event; the session is
    /// still flagged as streaming.
    Unterminated,
}

/// Receives every [`Update`] as it is applied.
pub trait UpdateSink {
    fn on_update(&mut self, state: &SessionState, update: &Update);
}

/// Sink that discards updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl UpdateSink for NoopSink {
    fn on_update(&mut self, _state: &SessionState, _update: &Update) {}
}

/// State machine consuming one submission's response stream.
#[derive(Debug)]
pub struct Consolidator {
    base_url: String,
    binding: Option<EntryId>,
    target: Option<EntryId>,
    accumulated: String,
    phase: Phase,
    decoder: FrameDecoder,
}

impl Consolidator {
    /// Consolidator bound to the entry created at submission time.
    pub fn bound(base_url: &str, target: EntryId) -> Self {
        Self::with_binding(base_url, Some(target))
    }

    /// Consolidator that resolves its target by scanning the transcript
    /// backward for the nearest consolidated entry.
    pub fn unbound(base_url: &str) -> Self {
        Self::with_binding(base_url, None)
    }

    fn with_binding(base_url: &str, binding: Option<EntryId>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            binding,
            target: None,
            accumulated: String::new(),
            phase: Phase::Seeking,
            decoder: FrameDecoder::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Entry currently receiving output; `None` before resolution and after release.
    pub fn target(&self) -> Option<EntryId> {
        self.target
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// Decode one chunk of the response body and apply every complete frame.
    pub fn feed<S: UpdateSink>(&mut self, state: &mut SessionState, chunk: &[u8], sink: &mut S) {
        for payload in self.decoder.feed(chunk) {
            let update = self.apply_frame(state, &payload);
            sink.on_update(state, &update);
        }
    }

    /// Apply the JSON payload of one `data:` frame.
    pub fn apply_frame(&mut self, state: &mut SessionState, payload: &str) -> Update {
        if self.is_terminated() {
            return Update::Ignored;
        }
        match StreamEvent::from_frame(payload) {
            Ok(event) => self.apply(state, event),
            Err(e) => {
                debug!(error = %e, frame = payload, "skipping malformed frame");
                Update::Malformed
            }
        }
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, state: &mut SessionState, event: StreamEvent) -> Update {
        let entry = match self.phase {
            Phase::Terminated => return Update::Ignored,
            Phase::Seeking => match self.resolve(state) {
                Some(entry) => entry,
                None => {
                    debug!(kind = %event.kind(), "no consolidated entry; dropping event");
                    return Update::Unrouted;
                }
            },
            Phase::Accumulating => match self.target {
                Some(entry) => entry,
                None => return Update::Unrouted,
            },
        };

        let kind = event.kind();
        let update = match event {
            StreamEvent::Progress { message } | StreamEvent::Thinking { message } => {
                let delta = format!("\n{message}");
                self.write_back(state, entry, &delta);
                Update::Appended { entry, delta }
            }
            StreamEvent::Complete { message, data } => {
                let delta = format!("\n\n{message}");
                self.write_back(state, entry, &delta);
                let chart_ref = resolve_ref(&self.base_url, &data.chart_url);
                let download_ref = resolve_ref(&self.base_url, &data.download_url);
                debug!(%chart_ref, %download_ref, events = data.event_count, "stream completed");
                state.set_completion(chart_ref, download_ref, data);
                Update::Completed { entry, delta }
            }
            StreamEvent::Error { message } => {
                let delta = format!("\n\n❌ {message}");
                self.write_back(state, entry, &delta);
                warn!(%message, "processing service reported an error");
                Update::Failed { entry, delta }
            }
        };
        if kind.is_terminal() {
            self.terminate(state);
        }
        update
    }

    /// Close out the stream once the body is exhausted.
    pub fn finish(&mut self, state: &SessionState) -> StreamOutcome {
        let dropped = self.decoder.finish();
        if dropped > 0 {
            debug!(bytes = dropped, "discarding unterminated trailing frame");
        }
        if self.is_terminated() {
            return if state.completion().is_some() {
                StreamOutcome::Completed
            } else {
                StreamOutcome::Failed
            };
        }
        self.target = None;
        warn!("stream ended without a terminal event; session is still marked as streaming");
        StreamOutcome::Unterminated
    }

    fn resolve(&mut self, state: &SessionState) -> Option<EntryId> {
        let entry = match self.binding {
            Some(id) => state.entry(id).filter(|e| e.is_consolidated()),
            None => state.last_consolidated().and_then(|id| state.entry(id)),
        }?;
        self.accumulated = entry.text.clone();
        self.target = Some(entry.id);
        self.phase = Phase::Accumulating;
        Some(entry.id)
    }

    fn write_back(&mut self, state: &mut SessionState, entry: EntryId, delta: &str) {
        self.accumulated.push_str(delta);
        if let Some(target) = state.entry_mut(entry) {
            target.text.clone_from(&self.accumulated);
        }
    }

    fn terminate(&mut self, state: &mut SessionState) {
        state.set_streaming(false);
        self.phase = Phase::Terminated;
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{Submission, plan_submission};
    use crate::state::{Attachment, PDF_MEDIA_TYPE};
    use crate::transcript::{EntryKind, Speaker};

    const BASE: &str = "http://localhost:8000";

    #[derive(Default)]
    struct Recorder {
        updates: Vec<Update>,
        lengths: Vec<usize>,
    }

    impl UpdateSink for Recorder {
        fn on_update(&mut self, state: &SessionState, update: &Update) {
            let len = state
                .consolidated_entries()
                .next()
                .map(|e| e.text.len())
                .unwrap_or_default();
            self.lengths.push(len);
            self.updates.push(update.clone());
        }
    }

    fn submitted(text: &str) -> (SessionState, EntryId) {
        let mut state = SessionState::new();
        state.set_input(text);
        state
            .select_attachment(Attachment::new("report.pdf", PDF_MEDIA_TYPE, vec![]))
            .expect("pdf");
        match plan_submission(&mut state) {
            Submission::Process(req) => (state, req.target),
            other => panic!("expected process submission, got {other:?}"),
        }
    }

    fn frame(json: &str) -> Vec<u8> {
        format!("data: {json}\n\n").into_bytes()
    }

    const COMPLETE: &str = r#"{"type":"complete","message":"Done","data":{"chart_url":"/x.html","download_url":"/x.png","event_count":12,"actor_count":4}}"#;

    #[test]
    fn milestone_scenario_end_to_end() {
        let (mut state, target) = submitted("Show key milestones only");
        let mut consolidator = Consolidator::bound(BASE, target);
        let mut sink = Recorder::default();

        consolidator.feed(
            &mut state,
            &frame(r#"{"type":"progress","message":"Parsing document"}"#),
            &mut sink,
        );
        consolidator.feed(&mut state, &frame(COMPLETE), &mut sink);
        assert_eq!(consolidator.finish(&state), StreamOutcome::Completed);

        let entry = state.entry(target).expect("target");
        assert_eq!(
            entry.text,
            "Okay! I will Show key milestones only for you...\nParsing document\n\nDone"
        );
        assert!(!state.is_streaming());
        assert_eq!(state.chart_ref(), Some("http://localhost:8000/x.html"));
        assert_eq!(state.download_ref(), Some("http://localhost:8000/x.png"));
        let completion = state.completion().expect("completion payload");
        assert_eq!((completion.event_count, completion.actor_count), (12, 4));
        assert_eq!(
            sink.updates,
            vec![
                Update::Appended {
                    entry: target,
                    delta: "\nParsing document".into()
                },
                Update::Completed {
                    entry: target,
                    delta: "\n\nDone".into()
                },
            ]
        );
    }

    #[test]
    fn all_events_update_the_same_entry() {
        let (mut state, target) = submitted("");
        let before: Vec<_> = state
            .transcript()
            .iter()
            .filter(|e| e.id != target)
            .cloned()
            .collect();

        let mut consolidator = Consolidator::bound(BASE, target);
        let mut sink = Recorder::default();
        let mut body = Vec::new();
        body.extend(frame(r#"{"type":"progress","message":"a"}"#));
        body.extend(frame(r#"{"type":"thinking","message":"b"}"#));
        body.extend(frame(r#"{"type":"error","message":"boom"}"#));
        consolidator.feed(&mut state, &body, &mut sink);

        let after: Vec<_> = state
            .transcript()
            .iter()
            .filter(|e| e.id != target)
            .cloned()
            .collect();
        assert_eq!(before, after);
        assert!(sink.updates.iter().all(|u| match u {
            Update::Appended { entry, .. }
            | Update::Completed { entry, .. }
            | Update::Failed { entry, .. } => *entry == target,
            _ => false,
        }));
        assert_eq!(
            state.entry(target).map(|e| e.text.as_str()),
            Some("Okay! I will analyze all stakeholders for you...\na\nb\n\n❌ boom")
        );
        assert!(!state.is_streaming());
        assert!(state.chart_ref().is_none());
        assert_eq!(consolidator.finish(&state), StreamOutcome::Failed);
    }

    #[test]
    fn text_length_is_monotonic() {
        let (mut state, target) = submitted("");
        let mut consolidator = Consolidator::bound(BASE, target);
        let mut sink = Recorder::default();
        for i in 0..5 {
            let msg = format!(r#"{{"type":"progress","message":"step {i}"}}"#);
            consolidator.feed(&mut state, &frame(&msg), &mut sink);
        }
        assert!(sink.lengths.windows(2).all(|w| w[0] < w[1]));
        let text = &state.entry(target).expect("target").text;
        assert_eq!(text.matches('\n').count(), 5);
    }

    #[test]
    fn events_after_terminal_are_ignored() {
        let (mut state, target) = submitted("");
        let mut consolidator = Consolidator::bound(BASE, target);
        let mut sink = Recorder::default();
        consolidator.feed(&mut state, &frame(COMPLETE), &mut sink);
        let snapshot = state.entry(target).cloned();

        let mut trailing = Vec::new();
        trailing.extend(frame(r#"{"type":"progress","message":"late"}"#));
        trailing.extend(frame(r#"{"type":"error","message":"late error"}"#));
        consolidator.feed(&mut state, &trailing, &mut sink);

        assert_eq!(state.entry(target).cloned(), snapshot);
        assert!(!state.is_streaming());
        assert_eq!(consolidator.phase(), Phase::Terminated);
        assert_eq!(consolidator.target(), None);
        assert_eq!(&sink.updates[1..], &[Update::Ignored, Update::Ignored]);
    }

    #[test]
    fn malformed_frames_are_skipped() {
        let (mut state, target) = submitted("");
        let original = state.entry(target).expect("target").text.clone();
        let mut consolidator = Consolidator::bound(BASE, target);
        let mut sink = Recorder::default();

        let mut body = Vec::new();
        body.extend(frame("{not json"));
        body.extend(frame(r#"{"type":"mystery","message":"?"}"#));
        body.extend(frame(r#"{"message":"untyped"}"#));
        consolidator.feed(&mut state, &body, &mut sink);

        assert_eq!(sink.updates, vec![Update::Malformed; 3]);
        assert_eq!(state.entry(target).expect("target").text, original);
        assert!(state.is_streaming());
        assert_eq!(consolidator.phase(), Phase::Seeking);

        consolidator.feed(
            &mut state,
            &frame(r#"{"type":"progress","message":"still alive"}"#),
            &mut sink,
        );
        assert!(
            state
                .entry(target)
                .expect("target")
                .text
                .ends_with("\nstill alive")
        );
    }

    #[test]
    fn frames_split_across_chunks() {
        let (mut state, target) = submitted("");
        let mut consolidator = Consolidator::bound(BASE, target);
        let mut sink = Recorder::default();

        let mut body = frame(r#"{"type":"progress","message":"📄 Document loaded successfully"}"#);
        body.extend(frame(COMPLETE));
        for chunk in body.chunks(7) {
            consolidator.feed(&mut state, chunk, &mut sink);
        }
        assert_eq!(sink.updates.len(), 2);
        assert!(matches!(sink.updates[1], Update::Completed { .. }));
        assert!(
            state
                .entry(target)
                .expect("target")
                .text
                .contains("\n📄 Document loaded successfully\n\nDone")
        );
    }

    #[test]
    fn unterminated_stream_keeps_streaming_flag() {
        let (mut state, target) = submitted("");
        let mut consolidator = Consolidator::bound(BASE, target);
        let mut sink = Recorder::default();
        consolidator.feed(
            &mut state,
            &frame(r#"{"type":"progress","message":"partial"}"#),
            &mut sink,
        );
        consolidator.feed(&mut state, b"data: {\"type\":\"compl", &mut sink);

        assert_eq!(consolidator.finish(&state), StreamOutcome::Unterminated);
        assert!(state.is_streaming());
        assert!(state.completion().is_none());
        assert!(state.entry(target).expect("target").text.ends_with("\npartial"));
        assert_eq!(consolidator.target(), None);
    }

    #[test]
    fn unbound_consolidator_scans_for_nearest_marked_entry() {
        let (mut state, target) = submitted("");
        state.push_entry(Speaker::Assistant, "unrelated", EntryKind::Plain);

        let mut consolidator = Consolidator::unbound(BASE);
        let update = consolidator.apply(
            &mut state,
            StreamEvent::Thinking {
                message: "hmm".into(),
            },
        );
        assert_eq!(
            update,
            Update::Appended {
                entry: target,
                delta: "\nhmm".into()
            }
        );
        assert_eq!(consolidator.target(), Some(target));
        assert_eq!(state.transcript().last().map(|e| e.text.as_str()), Some("unrelated"));
    }

    #[test]
    fn missing_target_drops_events_and_keeps_seeking() {
        let mut state = SessionState::new();
        state.push_entry(Speaker::User, "hello", EntryKind::Plain);

        let mut consolidator = Consolidator::unbound(BASE);
        let update = consolidator.apply_frame(
            &mut state,
            r#"{"type":"progress","message":"orphan"}"#,
        );
        assert_eq!(update, Update::Unrouted);
        assert_eq!(consolidator.phase(), Phase::Seeking);
        assert_eq!(state.transcript()[0].text, "hello");

        let bound_to_plain = state.transcript()[0].id;
        let mut consolidator = Consolidator::bound(BASE, bound_to_plain);
        assert_eq!(
            consolidator.apply_frame(&mut state, COMPLETE),
            Update::Unrouted
        );
        assert!(state.completion().is_none());
    }

    #[test]
    fn bound_consolidator_ignores_newer_marked_entries() {
        let (mut state, target) = submitted("");
        let intruder = state.push_entry(Speaker::Assistant, "other", EntryKind::Consolidated);

        let mut consolidator = Consolidator::bound(BASE, target);
        consolidator.apply_frame(&mut state, r#"{"type":"progress","message":"mine"}"#);

        assert!(state.entry(target).expect("target").text.ends_with("\nmine"));
        assert_eq!(state.entry(intruder).expect("intruder").text, "other");
    }
}
