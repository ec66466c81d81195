use serde::{Deserialize, Serialize};

/// Role the caller claims in the channel. Anything that is not `host`
/// deserializes to `Other` and is rejected by mutating operations.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Host,
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Other => "other",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StartRecording {
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub uid: Option<u64>,
    #[serde(default = "default_mode")]
    pub recording_mode: String,
    #[serde(default)]
    pub initiator_role: Role,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StopRecording {
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub uid: Option<u64>,
    #[serde(default = "default_mode")]
    pub recording_mode: String,
    #[serde(default)]
    pub async_stop: bool,
    #[serde(default)]
    pub initiator_role: Role,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecording {
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default = "default_mode")]
    pub recording_mode: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLayout {
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub uid: Option<u64>,
    #[serde(default = "default_mode")]
    pub recording_mode: String,
    #[serde(default)]
    pub layout_config: Option<LayoutConfig>,
    #[serde(default)]
    pub initiator_role: Role,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(default = "default_layout")]
    pub layout: u32,
    #[serde(default = "default_background")]
    pub background_color: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            layout: default_layout(),
            background_color: default_background(),
        }
    }
}

fn default_mode() -> String {
    "mix".to_string()
}

fn default_layout() -> u32 {
    1
}

fn default_background() -> String {
    "#000000".to_string()
}
