use std::io::{self, Write};

use hubble_core::{CompletionPayload, SessionState, Speaker, Update, UpdateSink};

/// Streams the transcript to a terminal as it grows.
///
/// Entries are append-only apart from the consolidated one, whose text only
/// ever grows, so printing the unseen suffix of every entry is enough.
pub struct TranscriptRenderer<W: Write> {
    out: W,
    shown: Vec<usize>,
    error: Option<io::Error>,
}

impl<W: Write> TranscriptRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: Vec::new(),
            error: None,
        }
    }

    /// Print whatever part of the transcript has not been printed yet.
    pub fn sync(&mut self, state: &SessionState) {
        if let Err(e) = self.write_pending(state) {
            self.error.get_or_insert(e);
        }
    }

    /// Flush the remainder and report the first write error, if any.
    pub fn finish(mut self, state: &SessionState) -> io::Result<W> {
        self.sync(state);
        if !self.shown.is_empty() {
            writeln!(self.out)?;
        }
        self.out.flush()?;
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.out),
        }
    }

    fn write_pending(&mut self, state: &SessionState) -> io::Result<()> {
        for (index, entry) in state.transcript().iter().enumerate() {
            match self.shown.get(index).copied() {
                None => {
                    if index > 0 {
                        writeln!(self.out)?;
                    }
                    write!(self.out, "{}> {}", label(entry.speaker), entry.text)?;
                    self.shown.push(entry.text.len());
                }
                Some(printed) if entry.text.len() > printed => {
                    write!(self.out, "{}", &entry.text[printed..])?;
                    self.shown[index] = entry.text.len();
                }
                Some(_) => {}
            }
        }
        self.out.flush()
    }
}

impl<W: Write> UpdateSink for TranscriptRenderer<W> {
    fn on_update(&mut self, state: &SessionState, update: &Update) {
        if matches!(update, Update::Malformed | Update::Unrouted | Update::Ignored) {
            return;
        }
        self.sync(state);
    }
}

fn label(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::User => "you",
        Speaker::Assistant => "hubble",
    }
}

/// Human-readable summary of a finished analysis.
pub fn completion_summary(
    payload: &CompletionPayload,
    chart_ref: Option<&str>,
    download_ref: Option<&str>,
) -> String {
    let mut lines = Vec::new();
    let mut counts = format!(
        "{} events • {} actors",
        payload.event_count, payload.actor_count
    );
    if let Some(milestones) = payload.milestone_count {
        counts.push_str(&format!(" • {milestones} milestones"));
    }
    lines.push(format!("Timeline ready: {counts}"));
    if let Some(case) = &payload.case {
        lines.push(format!("Case:     {}", case.name));
    }
    if let Some(chart) = chart_ref {
        lines.push(format!("Chart:    {chart}"));
    }
    if let Some(download) = download_ref {
        lines.push(format!("Download: {download}"));
    }
    if let Some(session_id) = &payload.session_id {
        lines.push(format!("Session:  {session_id}"));
    }
    lines.join("\n")
}
