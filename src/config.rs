use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::{env, fs, net::SocketAddr, str::FromStr};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub recording: Recording,
    #[serde(default)]
    pub storage: Storage,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
    /// Externally reachable base URL; used to build the webhook destination
    /// handed to the provider and the public URLs of stored files.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub tokens: Vec<String>,
    /// When set, upload callbacks must carry a valid x-signature/x-timestamp pair.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_certificate: String,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub customer_secret: String,
}

impl Provider {
    /// Basic-auth header value for the provider's REST control plane.
    pub fn basic_authorization(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.customer_id, self.customer_secret));
        format!("Basic {}", encoded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_max_idle_time")]
    pub max_idle_time: u32,
    /// Provider resource lease, in hours.
    #[serde(default = "default_resource_expired_hour")]
    pub resource_expired_hour: u32,
    /// Lifetime of the recorder bot credential, in seconds.
    #[serde(default = "default_credential_ttl")]
    pub credential_ttl: u64,
    #[serde(default)]
    pub transcoding: Transcoding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcoding {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_mixed_video_layout")]
    pub mixed_video_layout: u32,
    #[serde(default = "default_background_color")]
    pub background_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    /// Local directory delivered media files are written to.
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Upload batch retention, in seconds, before the sweep evicts them.
    #[serde(default = "default_retention")]
    pub retention: u64,
}

impl Config {
    pub fn parse(path: Option<String>) -> Self {
        let result = fs::read_to_string(path.unwrap_or(String::from("cloudrec.toml")))
            .or(fs::read_to_string("/etc/cloudrec/cloudrec.toml"))
            .unwrap_or("".to_string());
        let mut cfg: Self = toml::from_str(result.as_str()).expect("config parse error");
        cfg.http.public_url = cfg.http.public_url.trim_end_matches('/').to_string();
        match cfg.validate() {
            Ok(_) => cfg,
            Err(err) => panic!("config validate [{}]", err),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.storage.root.trim().is_empty() {
            return Err(anyhow::anyhow!("storage.root must not be empty"));
        }
        if self.storage.retention == 0 {
            return Err(anyhow::anyhow!("storage.retention must be positive"));
        }
        Ok(())
    }
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
            public_url: default_public_url(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            app_id: Default::default(),
            app_certificate: Default::default(),
            customer_id: Default::default(),
            customer_secret: Default::default(),
        }
    }
}

impl Default for Recording {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            max_idle_time: default_max_idle_time(),
            resource_expired_hour: default_resource_expired_hour(),
            credential_ttl: default_credential_ttl(),
            transcoding: Default::default(),
        }
    }
}

impl Default for Transcoding {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            bitrate: default_bitrate(),
            fps: default_fps(),
            mixed_video_layout: default_mixed_video_layout(),
            background_color: default_background_color(),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            retention: default_retention(),
        }
    }
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("8080"))
    ))
    .expect("invalid listen address")
}

fn default_public_url() -> String {
    format!(
        "http://localhost:{}",
        env::var("PORT").unwrap_or(String::from("8080"))
    )
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_api_base() -> String {
    "https://api.agora.io/v1".to_string()
}

fn default_mode() -> String {
    "mix".to_string()
}

fn default_max_idle_time() -> u32 {
    30
}

fn default_resource_expired_hour() -> u32 {
    24
}

fn default_credential_ttl() -> u64 {
    3600
}

fn default_width() -> u32 {
    360
}

fn default_height() -> u32 {
    640
}

fn default_bitrate() -> u32 {
    500
}

fn default_fps() -> u32 {
    15
}

fn default_mixed_video_layout() -> u32 {
    1
}

fn default_background_color() -> String {
    "#000000".to_string()
}

fn default_storage_root() -> String {
    "./uploads".to_string()
}

fn default_retention() -> u64 {
    86400
}
