use chrono::{DateTime, SecondsFormat, Utc};

pub use api::request::Role;

pub mod manager;

/// Persisted states of the lifecycle; `NONE` and `STOPPED` have no index
/// entry, freeing the channel for a new recording.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Acquiring,
    Recording,
    Stopping,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Acquiring => "acquiring",
            SessionState::Recording => "recording",
            SessionState::Stopping => "stopping",
        }
    }
}

/// The one active recording per channel while it lives in the index.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub channel: String,
    pub resource_id: String,
    pub sid: String,
    pub uid: u64,
    pub initiated_by: Role,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    pub fn summary(&self) -> api::response::SessionSummary {
        api::response::SessionSummary {
            channel_name: self.channel.clone(),
            resource_id: self.resource_id.clone(),
            sid: self.sid.clone(),
            uid: self.uid,
            state: self.state.as_str().to_string(),
            initiated_by: self.initiated_by.as_str().to_string(),
            started_at: self
                .started_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}
