pub const METRICS: &str = "/metrics";

pub const RECORDING_START: &str = "/recording/start";
pub const RECORDING_STOP: &str = "/recording/stop";
pub const RECORDING_QUERY: &str = "/recording/query";
pub const RECORDING_UPDATE_LAYOUT: &str = "/recording/update-layout";
pub const RECORDING_SESSIONS: &str = "/recording/sessions";

pub const UPLOAD_WEBHOOK: &str = "/upload-webhook";

pub fn recording_files(sid: &str) -> String {
    format!("/recording/{}", sid)
}

pub fn uploads(stored_name: &str) -> String {
    format!("/uploads/{}", stored_name)
}
