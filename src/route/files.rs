use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::SecondsFormat;

use crate::error::AppError;
use crate::result::Result;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new().route(&api::path::recording_files("{sid}"), get(files_by_sid))
}

/// Poll endpoint for clients that got a `pending` stop response. 404 until
/// the provider's callback has delivered files for this sid.
async fn files_by_sid(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<api::response::SessionFiles>> {
    match state.uploads.get_by_sid(&sid) {
        Some(batch) => Ok(Json(api::response::SessionFiles {
            sid,
            files: batch.files.clone(),
            received_at: batch
                .received_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        })),
        None => Err(AppError::not_found("files not delivered yet")),
    }
}
