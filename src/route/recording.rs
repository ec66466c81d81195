use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::helper;
use crate::result::Result;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::RECORDING_START, post(start))
        .route(api::path::RECORDING_STOP, post(stop))
        .route(api::path::RECORDING_QUERY, post(query))
        .route(api::path::RECORDING_UPDATE_LAYOUT, post(update_layout))
        .route(api::path::RECORDING_SESSIONS, get(active_sessions))
}

async fn start(
    State(state): State<AppState>,
    Json(req): Json<api::request::StartRecording>,
) -> Result<Json<api::response::StartRecording>> {
    Ok(Json(state.sessions.start(req).await?))
}

async fn stop(
    State(state): State<AppState>,
    Json(req): Json<api::request::StopRecording>,
) -> Result<Json<api::response::StopRecording>> {
    Ok(Json(state.sessions.stop(req).await?))
}

async fn query(
    State(state): State<AppState>,
    Json(req): Json<api::request::QueryRecording>,
) -> Result<Json<api::response::QueryRecording>> {
    Ok(Json(state.sessions.query(req).await?))
}

async fn update_layout(
    State(state): State<AppState>,
    Json(req): Json<api::request::UpdateLayout>,
) -> Result<Json<api::response::LayoutUpdated>> {
    Ok(Json(state.sessions.update_layout(req).await?))
}

async fn active_sessions(
    State(state): State<AppState>,
) -> Result<Json<api::response::ActiveSessions>> {
    let sessions = state.sessions.active().await;
    Ok(Json(api::response::ActiveSessions {
        success: true,
        count: sessions.len(),
        sessions,
        timestamp: helper::timestamp(),
    }))
}
