use crate::state::{Attachment, PDF_MEDIA_TYPE};

/// Minimal PDF attachment with the given file name.
pub fn pdf_attachment(name: &str) -> Attachment {
    Attachment::new(name, PDF_MEDIA_TYPE, b"%PDF-1.7\n%%EOF\n".to_vec())
}

/// One `data:` frame wrapping an arbitrary JSON value, blank-line terminated.
pub fn data_frame(value: &serde_json::Value) -> String {
    format!("data: {value}\n\n")
}

pub fn progress_frame(message: &str) -> String {
    data_frame(&serde_json::json!({ "type": "progress", "message": message }))
}

pub fn thinking_frame(message: &str) -> String {
    data_frame(&serde_json::json!({ "type": "thinking", "message": message }))
}

pub fn error_frame(message: &str) -> String {
    data_frame(&serde_json::json!({ "type": "error", "message": message }))
}

/// `complete` frame with the fields the service always sends.
pub fn complete_frame(
    message: &str,
    chart_url: &str,
    download_url: &str,
    event_count: u64,
    actor_count: u64,
) -> String {
    data_frame(&serde_json::json!({
        "type": "complete",
        "message": message,
        "data": {
            "chart_url": chart_url,
            "download_url": download_url,
            "event_count": event_count,
            "actor_count": actor_count,
            "milestone_count": 2,
            "session_id": "0f3c9a7e",
        }
    }))
}
