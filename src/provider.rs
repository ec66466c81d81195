use std::time::Duration;

use http::header;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Provider;
use crate::error::AppError;
use crate::result::Result;

/// REST client for the provider's cloud recording control plane.
///
/// Every call is single-shot: a rejection or a transport failure is mapped
/// onto the provider error catalogue and returned to the caller, never
/// retried here.
#[derive(Clone, Debug)]
pub struct ProviderClient {
    base: String,
    app_id: String,
    authorization: String,
    client: Client,
}

impl ProviderClient {
    pub fn new(cfg: &Provider) -> Self {
        ProviderClient {
            base: cfg.api_base.trim_end_matches('/').to_string(),
            app_id: cfg.app_id.clone(),
            authorization: cfg.basic_authorization(),
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(3))
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap(),
        }
    }

    pub async fn acquire(&self, channel: &str, uid: u64, resource_expired_hour: u32) -> Result<String> {
        let body = json!({
            "cname": channel,
            "uid": uid.to_string(),
            "clientRequest": {
                "resourceExpiredHour": resource_expired_hour,
            },
        });
        let response = self.post(&self.url("acquire"), body).await?;
        match response.get("resourceId").and_then(Value::as_str) {
            Some(resource_id) => Ok(resource_id.to_string()),
            None => Err(AppError::upstream(1001, "acquire response without resourceId")),
        }
    }

    pub async fn start(
        &self,
        resource_id: &str,
        mode: &str,
        channel: &str,
        uid: u64,
        client_request: Value,
    ) -> Result<String> {
        let url = self.url(&format!("resourceid/{}/mode/{}/start", resource_id, mode));
        let body = json!({
            "cname": channel,
            "uid": uid.to_string(),
            "clientRequest": client_request,
        });
        let response = self.post(&url, body).await?;
        match response.get("sid").and_then(Value::as_str) {
            Some(sid) => Ok(sid.to_string()),
            None => Err(AppError::upstream(501, "start response without sid")),
        }
    }

    pub async fn stop(
        &self,
        resource_id: &str,
        sid: &str,
        mode: &str,
        channel: &str,
        uid: Option<u64>,
        async_stop: bool,
    ) -> Result<Value> {
        let url = self.url(&format!(
            "resourceid/{}/sid/{}/mode/{}/stop",
            resource_id, sid, mode
        ));
        let body = json!({
            "cname": channel,
            "uid": uid.map(|u| u.to_string()),
            "clientRequest": {
                "async_stop": async_stop,
            },
        });
        let response = self.post(&url, body).await?;
        Ok(response.get("serverResponse").cloned().unwrap_or(Value::Null))
    }

    pub async fn query(&self, resource_id: &str, sid: &str, mode: &str) -> Result<Value> {
        let url = self.url(&format!(
            "resourceid/{}/sid/{}/mode/{}/query",
            resource_id, sid, mode
        ));
        let response = self.get(&url).await?;
        Ok(response.get("serverResponse").cloned().unwrap_or(Value::Null))
    }

    pub async fn update_layout(
        &self,
        resource_id: &str,
        sid: &str,
        mode: &str,
        channel: &str,
        uid: Option<u64>,
        mixed_video_layout: u32,
        background_color: &str,
    ) -> Result<()> {
        let url = self.url(&format!(
            "resourceid/{}/sid/{}/mode/{}/updateLayout",
            resource_id, sid, mode
        ));
        let body = json!({
            "cname": channel,
            "uid": uid.map(|u| u.to_string()),
            "clientRequest": {
                "mixedVideoLayout": mixed_video_layout,
                "backgroundColor": background_color,
            },
        });
        self.post(&url, body).await?;
        Ok(())
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/apps/{}/cloud_recording/{}", self.base, self.app_id, tail)
    }

    async fn post(&self, url: &str, body: Value) -> Result<Value> {
        let request = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, &self.authorization)
            .json(&body)
            .send();
        self.dispatch(url, request).await
    }

    async fn get(&self, url: &str) -> Result<Value> {
        let request = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, &self.authorization)
            .send();
        self.dispatch(url, request).await
    }

    async fn dispatch(
        &self,
        url: &str,
        request: impl std::future::Future<Output = std::result::Result<reqwest::Response, reqwest::Error>>,
    ) -> Result<Value> {
        match request.await {
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.map_err(AppError::from)?;
                if status.is_success() {
                    debug!(url, ?status, body = text, "provider call ok");
                    if text.is_empty() {
                        return Ok(Value::Null);
                    }
                    Ok(serde_json::from_str(&text)?)
                } else {
                    let parsed: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
                    let code = parsed.get("code").and_then(Value::as_i64).unwrap_or(501);
                    let message = parsed
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or(text);
                    warn!(url, ?status, code, message, "provider call rejected");
                    Err(AppError::Upstream { code, message })
                }
            }
            Err(err) => {
                warn!(url, ?err, "provider request error");
                Err(AppError::upstream(501, err.to_string()))
            }
        }
    }
}
