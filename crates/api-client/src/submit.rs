//! Network half of a submission: issue the processing request and pump the
//! response body through a [`Consolidator`], one chunk per suspension.

use tracing::{info, warn};

use hubble_core::{
    Consolidator, SessionState, StreamOutcome, Submission, UpdateSink, fail_submission,
    plan_submission,
};

use crate::client::ApiClient;

impl ApiClient {
    /// Submit the session's current input and staged attachment.
    ///
    /// Plain chat turns and refused submissions resolve locally. Document
    /// submissions upload the attachment and consume the response stream
    /// until a terminal event or end of body; every applied frame is passed
    /// to `sink`. All results are recorded in `state`.
    pub async fn submit<S: UpdateSink>(&self, state: &mut SessionState, sink: &mut S) {
        let req = match plan_submission(state) {
            Submission::Process(req) => req,
            Submission::Ignored | Submission::Busy | Submission::Chat => return,
        };
        let target = req.target;

        let mut resp = match self.process(req.attachment, &req.request).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "processing request failed");
                fail_submission(state, Some(target), &e.to_string());
                return;
            }
        };

        let mut consolidator = Consolidator::bound(self.base_url(), target);
        loop {
            match resp.chunk().await {
                Ok(Some(chunk)) => {
                    consolidator.feed(state, &chunk, sink);
                    if consolidator.is_terminated() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "processing stream interrupted");
                    fail_submission(state, Some(target), &e.to_string());
                    return;
                }
            }
        }

        match consolidator.finish(state) {
            StreamOutcome::Completed => info!("document processing complete"),
            StreamOutcome::Failed => info!("document processing ended with a service error"),
            StreamOutcome::Unterminated => {}
        }
    }
}
