use axum::extract::{FromRequest, Multipart, Request, State};
use axum::middleware;
use axum::routing::post;
use axum::{Json, Router};
use http::{header, HeaderMap};
use http_body_util::BodyExt;
use serde_json::Value;
use tracing::info;

use crate::error::AppError;
use crate::helper;
use crate::result::Result;
use crate::route::AppState;
use crate::signature;

pub const SESSION_ID_HEADER: &str = "x-session-id";
pub const RESOURCE_ID_HEADER: &str = "x-resource-id";

pub fn route(state: AppState) -> Router<AppState> {
    Router::new()
        .route(api::path::UPLOAD_WEBHOOK, post(upload_webhook))
        .layer(middleware::from_fn_with_state(
            state,
            signature::verify_webhook,
        ))
}

/// Provider-pushed file delivery. Inline multipart parts and remote-file
/// descriptors both end up as local files; correlation hints come from the
/// body with the headers as fallback. Downloads complete before the 200
/// goes out, so an immediately-following poll sees the files.
async fn upload_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: Request,
) -> Result<Json<api::response::WebhookAck>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let mut delivery = if content_type.starts_with("multipart/") {
        let parts = Multipart::from_request(req, &())
            .await
            .map_err(|err| AppError::bad_request(2, err))?;
        state.ingestor.ingest_multipart(parts).await?
    } else {
        let bytes = req
            .into_body()
            .collect()
            .await
            .map_err(|err| AppError::InternalServerError(err.into()))?
            .to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        state.ingestor.ingest_json(&body).await
    };

    if delivery.sid.is_none() {
        delivery.sid = header_string(&headers, SESSION_ID_HEADER);
    }
    if delivery.resource_id.is_none() {
        delivery.resource_id = header_string(&headers, RESOURCE_ID_HEADER);
    }

    let sid = delivery.sid.clone();
    let received = state.ingestor.commit(delivery).await;
    info!(sid, received, "upload callback processed");

    Ok(Json(api::response::WebhookAck {
        success: true,
        received,
        timestamp: helper::timestamp(),
    }))
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
