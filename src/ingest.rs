use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::Multipart;
use chrono::Utc;
use opendal::{services, Operator};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use api::response::FileRecord;

use crate::config::Config;
use crate::error::AppError;
use crate::result::Result;
use crate::uploads::{UploadBatch, UploadStore};

/// Monotonic part of the stored-file name; keeps two files arriving within
/// the same millisecond apart.
static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// What one webhook callback yielded after normalization.
#[derive(Debug, Default)]
pub struct Delivery {
    pub sid: Option<String>,
    pub resource_id: Option<String>,
    pub files: Vec<FileRecord>,
}

/// A remote-file descriptor from the callback body. Providers disagree on
/// the name key, hence the alias.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    #[serde(default, alias = "name")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Normalizes provider-pushed callbacks into stored file records: inline
/// multipart parts are persisted as-is, remote descriptors are downloaded,
/// and the result is committed to the correlation store. Everything is on
/// disk before the callback is acknowledged.
#[derive(Clone)]
pub struct Ingestor {
    op: Operator,
    client: Client,
    public_url: String,
    root: String,
    uploads: UploadStore,
}

impl Ingestor {
    pub fn new(cfg: &Config, uploads: UploadStore) -> anyhow::Result<Self> {
        let builder = services::Fs::default().root(&cfg.storage.root);
        let op = Operator::new(builder)?.finish();
        Ok(Ingestor {
            op,
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(3))
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap(),
            public_url: cfg.http.public_url.clone(),
            root: cfg.storage.root.trim_end_matches('/').to_string(),
            uploads,
        })
    }

    pub async fn ingest_multipart(&self, mut parts: Multipart) -> Result<Delivery> {
        let mut delivery = Delivery::default();
        let mut remote_list = None;
        while let Some(field) = parts
            .next_field()
            .await
            .map_err(|err| AppError::bad_request(2, err))?
        {
            if let Some(original) = field.file_name().map(str::to_string) {
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(2, err))?;
                match self.persist(&original, data.to_vec()).await {
                    Ok(record) => delivery.files.push(record),
                    Err(err) => warn!(file = original, ?err, "inline part not persisted"),
                }
                continue;
            }
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("sid") | Some("sessionId") => {
                    delivery.sid = non_empty(field.text().await.unwrap_or_default());
                }
                Some("resourceId") => {
                    delivery.resource_id = non_empty(field.text().await.unwrap_or_default());
                }
                Some("fileList") | Some("files") => {
                    remote_list = non_empty(field.text().await.unwrap_or_default());
                }
                _ => {}
            }
        }
        if let Some(raw) = remote_list {
            let descriptors = parse_remote_list(&Value::String(raw));
            self.fetch_all(descriptors, &mut delivery).await;
        }
        Ok(delivery)
    }

    pub async fn ingest_json(&self, body: &Value) -> Delivery {
        let mut delivery = Delivery {
            sid: string_field(body, &["sid", "sessionId"]),
            resource_id: string_field(body, &["resourceId"]),
            files: vec![],
        };
        let descriptors = body
            .get("fileList")
            .or_else(|| body.get("files"))
            .map(parse_remote_list)
            .unwrap_or_default();
        self.fetch_all(descriptors, &mut delivery).await;
        delivery
    }

    /// Commits the delivery if it captured any files; a callback without
    /// files is metadata-only and writes no batch. Returns the file count.
    pub async fn commit(&self, delivery: Delivery) -> usize {
        if delivery.files.is_empty() {
            debug!(
                sid = delivery.sid,
                resource_id = delivery.resource_id,
                "metadata-only callback, no batch stored"
            );
            return 0;
        }
        let batch = UploadBatch {
            sid: delivery.sid,
            resource_id: delivery.resource_id,
            files: delivery.files,
            received_at: Utc::now(),
        };
        let received = batch.files.len();
        self.audit(&batch).await;
        self.uploads.put(batch);
        received
    }

    /// One failed download skips that file only; the rest of the batch
    /// still goes through.
    async fn fetch_all(&self, descriptors: Vec<RemoteFile>, delivery: &mut Delivery) {
        for descriptor in descriptors {
            let Some(url) = descriptor.url else { continue };
            let original = descriptor
                .file_name
                .or_else(|| {
                    url.rsplit('/')
                        .next()
                        .filter(|tail| !tail.is_empty())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "upload.bin".to_string());
            match self.fetch(&url, &original).await {
                Ok(record) => delivery.files.push(record),
                Err(err) => warn!(url, ?err, "remote file skipped"),
            }
        }
    }

    async fn fetch(&self, url: &str, original: &str) -> Result<FileRecord> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::from(anyhow::anyhow!(
                "download failed with status {}",
                response.status()
            )));
        }
        let stored = stored_name(original);
        let mut writer = self.op.writer(&stored).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            writer.write(chunk?).await?;
        }
        writer.close().await?;
        debug!(url, stored, "remote file fetched");
        Ok(self.record(original, stored, Some(url.to_string())))
    }

    async fn persist(&self, original: &str, data: Vec<u8>) -> Result<FileRecord> {
        let stored = stored_name(original);
        self.op.write(&stored, data).await?;
        debug!(original, stored, "inline part persisted");
        Ok(self.record(original, stored, None))
    }

    fn record(&self, original: &str, stored: String, source_url: Option<String>) -> FileRecord {
        FileRecord {
            original_name: original.to_string(),
            stored_name: stored.clone(),
            location: format!("{}/{}", self.root, stored),
            public_url: format!("{}{}", self.public_url, api::path::uploads(&stored)),
            source_url,
        }
    }

    /// Batch manifest written next to the files for diagnostics; losing it
    /// must not fail the callback.
    async fn audit(&self, batch: &UploadBatch) {
        let key = batch
            .sid
            .clone()
            .or_else(|| batch.resource_id.clone())
            .unwrap_or_else(|| format!("unkeyed-{}", batch.received_at.timestamp_millis()));
        let record = serde_json::json!({
            "sid": batch.sid,
            "resourceId": batch.resource_id,
            "receivedAt": batch.received_at.to_rfc3339(),
            "files": batch.files,
        });
        let path = format!("audit/{}.json", key);
        if let Err(err) = self.op.write(&path, record.to_string().into_bytes()).await {
            warn!(path, ?err, "audit record not written");
        }
    }
}

fn stored_name(original: &str) -> String {
    format!(
        "{}_{:04}_{}",
        Utc::now().timestamp_millis(),
        UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed) % 10000,
        sanitize(original)
    )
}

/// Keeps alphanumerics, dot, dash and underscore; everything else becomes
/// an underscore so a hostile original name cannot traverse out of the
/// storage root.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}

/// The descriptor list arrives either structured or as a JSON-encoded
/// string; both forms normalize to the same descriptors.
fn parse_remote_list(value: &Value) -> Vec<RemoteFile> {
    match value {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_default(),
        Value::Array(_) => serde_json::from_value(value.clone()).unwrap_or_default(),
        _ => vec![],
    }
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .and_then(|s| non_empty(s.to_string()))
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
