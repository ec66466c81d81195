use serde::{Deserialize, Serialize};

/// One delivered media file, as stored locally and exposed to clients.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub original_name: String,
    pub stored_name: String,
    pub location: String,
    pub public_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StartRecording {
    pub success: bool,
    pub resource_id: String,
    pub sid: String,
    pub channel_name: String,
    pub uid: u64,
    pub initiated_by: String,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StopRecording {
    pub success: bool,
    pub resource_id: String,
    pub sid: String,
    pub status: String,
    pub stopped_at: String,
    pub stopped_by: String,
    /// `null` until the provider's upload callback has delivered the files.
    pub files: Option<Vec<FileRecord>>,
    pub uploading_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_endpoint: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecording {
    pub success: bool,
    pub resource_id: String,
    pub sid: String,
    pub status: Option<serde_json::Value>,
    pub files: Option<Vec<FileRecord>>,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LayoutUpdated {
    pub success: bool,
    pub resource_id: String,
    pub sid: String,
    pub message: String,
    pub updated_by: String,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub channel_name: String,
    pub resource_id: String,
    pub sid: String,
    pub uid: u64,
    pub state: String,
    pub initiated_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessions {
    pub success: bool,
    pub count: usize,
    pub sessions: Vec<SessionSummary>,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionFiles {
    pub sid: String,
    pub files: Vec<FileRecord>,
    pub received_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    pub received: usize,
    pub timestamp: String,
}

/// Error shape for validation and upstream failures, carrying the provider
/// error catalogue code.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error_code: i64,
    pub error_message: String,
    pub timestamp: String,
}

/// Error shape for authorization and conflict rejections.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}
