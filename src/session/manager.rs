use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppError;
use crate::helper;
use crate::metrics;
use crate::provider::ProviderClient;
use crate::result::Result;
use crate::token;
use crate::uploads::UploadStore;

use super::{RecordingSession, Role, SessionState};

/// Valid characters for a channel name on the provider side, besides
/// ASCII alphanumerics.
const CHANNEL_EXTRA_CHARS: &str = " !#$%&()+-:;<=>?@[]^_{|}~,.";

/// Drives the per-channel recording lifecycle against the provider.
///
/// The index entry is the channel reservation: it is inserted atomically
/// before any provider call and removed the moment a stop is accepted, so
/// "channel is free" never waits on the provider's upload pipeline. No lock
/// is held across a provider call.
#[derive(Clone)]
pub struct Manager {
    sessions: Arc<RwLock<HashMap<String, RecordingSession>>>,
    provider: Arc<ProviderClient>,
    uploads: UploadStore,
    config: Config,
}

impl Manager {
    pub fn new(config: Config, provider: Arc<ProviderClient>, uploads: UploadStore) -> Self {
        Manager {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            provider,
            uploads,
            config,
        }
    }

    pub async fn start(
        &self,
        req: api::request::StartRecording,
    ) -> Result<api::response::StartRecording> {
        require_host(req.initiator_role, "start recording")?;
        let uid = match req.uid {
            Some(uid) if !req.channel_name.is_empty() => uid,
            _ => return Err(AppError::bad_request(2, "Missing channelName or uid")),
        };
        validate_channel(&req.channel_name)?;

        self.reserve(&req.channel_name, uid, req.initiator_role)
            .await?;

        match self
            .acquire_and_start(&req.channel_name, uid, &req.recording_mode)
            .await
        {
            Ok((resource_id, sid)) => {
                self.activate(&req.channel_name, &resource_id, &sid).await;
                info!(
                    channel = req.channel_name,
                    sid,
                    mode = req.recording_mode,
                    "recording started"
                );
                Ok(api::response::StartRecording {
                    success: true,
                    resource_id,
                    sid,
                    channel_name: req.channel_name,
                    uid,
                    initiated_by: req.initiator_role.as_str().to_string(),
                    timestamp: helper::timestamp(),
                })
            }
            Err(err) => {
                // No partial state may leak into the index on a failed start.
                self.release(&req.channel_name).await;
                Err(err)
            }
        }
    }

    pub async fn stop(
        &self,
        req: api::request::StopRecording,
    ) -> Result<api::response::StopRecording> {
        require_host(req.initiator_role, "stop recording")?;
        if req.resource_id.is_empty() || req.sid.is_empty() {
            return Err(AppError::bad_request(2, "Missing resourceId or sid"));
        }

        if !req.channel_name.is_empty() {
            self.mark_stopping(&req.channel_name).await;
        }

        let outcome = self
            .provider
            .stop(
                &req.resource_id,
                &req.sid,
                &req.recording_mode,
                &req.channel_name,
                req.uid,
                req.async_stop,
            )
            .await;

        // The channel is freed before the response goes out, whatever the
        // provider said; a new start must never race a stale entry.
        if !req.channel_name.is_empty() {
            self.release(&req.channel_name).await;
        }
        let _ = outcome?;
        info!(channel = req.channel_name, sid = req.sid, "recording stopped");

        let stopped_at = helper::timestamp();
        let stopped_by = req.initiator_role.as_str().to_string();
        match self.uploads.get_by_sid(&req.sid) {
            Some(batch) => Ok(api::response::StopRecording {
                success: true,
                resource_id: req.resource_id,
                sid: req.sid,
                status: "stopped".to_string(),
                stopped_at,
                stopped_by,
                files: Some(batch.files.clone()),
                uploading_status: "done".to_string(),
                poll_endpoint: None,
            }),
            None => {
                let poll_endpoint = format!(
                    "{}{}",
                    self.config.http.public_url,
                    api::path::recording_files(&req.sid)
                );
                Ok(api::response::StopRecording {
                    success: true,
                    resource_id: req.resource_id,
                    sid: req.sid,
                    status: "stopped".to_string(),
                    stopped_at,
                    stopped_by,
                    files: None,
                    uploading_status: "pending".to_string(),
                    poll_endpoint: Some(poll_endpoint),
                })
            }
        }
    }

    pub async fn query(
        &self,
        req: api::request::QueryRecording,
    ) -> Result<api::response::QueryRecording> {
        if req.resource_id.is_empty() || req.sid.is_empty() {
            return Err(AppError::bad_request(2, "Missing resourceId or sid"));
        }
        let server_response = self
            .provider
            .query(&req.resource_id, &req.sid, &req.recording_mode)
            .await?;
        let files = self
            .uploads
            .get_by_sid(&req.sid)
            .map(|batch| batch.files.clone());
        Ok(api::response::QueryRecording {
            success: true,
            resource_id: req.resource_id,
            sid: req.sid,
            status: server_response.get("status").cloned(),
            files,
            timestamp: helper::timestamp(),
        })
    }

    pub async fn update_layout(
        &self,
        req: api::request::UpdateLayout,
    ) -> Result<api::response::LayoutUpdated> {
        require_host(req.initiator_role, "update recording layout")?;
        if req.resource_id.is_empty() || req.sid.is_empty() {
            return Err(AppError::bad_request(2, "Missing resourceId or sid"));
        }
        let layout = req.layout_config.unwrap_or_default();
        self.provider
            .update_layout(
                &req.resource_id,
                &req.sid,
                &req.recording_mode,
                &req.channel_name,
                req.uid,
                layout.layout,
                &layout.background_color,
            )
            .await?;
        Ok(api::response::LayoutUpdated {
            success: true,
            resource_id: req.resource_id,
            sid: req.sid,
            message: "Layout updated successfully".to_string(),
            updated_by: req.initiator_role.as_str().to_string(),
            timestamp: helper::timestamp(),
        })
    }

    pub async fn active(&self) -> Vec<api::response::SessionSummary> {
        let sessions = self.sessions.read().await;
        sessions.values().map(RecordingSession::summary).collect()
    }

    /// Acquire a provider resource, mint the recorder credential and issue
    /// the start call. Runs with no index lock held.
    async fn acquire_and_start(
        &self,
        channel: &str,
        uid: u64,
        mode: &str,
    ) -> Result<(String, String)> {
        let recording = &self.config.recording;
        let resource_id = self
            .provider
            .acquire(channel, uid, recording.resource_expired_hour)
            .await?;
        debug!(channel, resource_id, "provider resource acquired");

        let credential = token::recorder_credential(
            &self.config.provider.app_id,
            &self.config.provider.app_certificate,
            channel,
            uid,
            token::expiry_timestamp(recording.credential_ttl),
        );

        let transcoding = &recording.transcoding;
        let client_request = json!({
            "token": credential,
            "recordingConfig": {
                "channelType": 0,
                "streamTypes": 2,
                "maxIdleTime": recording.max_idle_time,
                "transcodingConfig": {
                    "width": transcoding.width,
                    "height": transcoding.height,
                    "bitrate": transcoding.bitrate,
                    "fps": transcoding.fps,
                    "mixedVideoLayout": transcoding.mixed_video_layout,
                    "backgroundColor": transcoding.background_color,
                },
            },
            "storageConfig": {
                "vendor": 0,
                "callbackUrl": format!(
                    "{}{}",
                    self.config.http.public_url,
                    api::path::UPLOAD_WEBHOOK
                ),
            },
        });

        let sid = self
            .provider
            .start(&resource_id, mode, channel, uid, client_request)
            .await?;
        Ok((resource_id, sid))
    }

    /// Atomic check-and-insert of the channel reservation.
    async fn reserve(&self, channel: &str, uid: u64, initiated_by: Role) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(channel) {
            return Err(AppError::conflict(
                "Recording already in progress for this channel",
            ));
        }
        sessions.insert(
            channel.to_string(),
            RecordingSession {
                channel: channel.to_string(),
                resource_id: String::new(),
                sid: String::new(),
                uid,
                initiated_by,
                state: SessionState::Acquiring,
                started_at: None,
                stopped_at: None,
            },
        );
        metrics::SESSIONS.inc();
        Ok(())
    }

    async fn activate(&self, channel: &str, resource_id: &str, sid: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(channel) {
            session.resource_id = resource_id.to_string();
            session.sid = sid.to_string();
            session.state = SessionState::Recording;
            session.started_at = Some(Utc::now());
        }
    }

    async fn mark_stopping(&self, channel: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(channel) {
            session.state = SessionState::Stopping;
            session.stopped_at = Some(Utc::now());
        }
    }

    async fn release(&self, channel: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(channel).is_some() {
            metrics::SESSIONS.dec();
        }
    }
}

fn require_host(role: Role, action: &str) -> Result<()> {
    if role != Role::Host {
        return Err(AppError::forbidden(format!("Only HOST can {}", action)));
    }
    Ok(())
}

fn validate_channel(channel: &str) -> Result<()> {
    let valid = channel.len() <= 64
        && channel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || CHANNEL_EXTRA_CHARS.contains(c));
    if !valid {
        return Err(AppError::bad_request(1013, "Invalid channel name"));
    }
    Ok(())
}
