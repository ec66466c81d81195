use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use tracing::{error, info_span, Level};

use crate::auth::StaticTokens;
use crate::config::Config;
use crate::ingest::Ingestor;
use crate::provider::ProviderClient;
use crate::route::AppState;
use crate::session::manager::Manager;
use crate::uploads::UploadStore;

pub mod config;
pub mod log;

mod auth;
pub mod error;
mod helper;
pub mod ingest;
mod metrics;
pub mod provider;
pub mod result;
pub mod route;
pub mod session;
pub mod signature;
pub mod token;
pub mod uploads;

pub fn app_state(cfg: Config) -> anyhow::Result<AppState> {
    let provider = Arc::new(ProviderClient::new(&cfg.provider));
    let uploads = UploadStore::new(Duration::from_secs(cfg.storage.retention));
    let ingestor = Ingestor::new(&cfg, uploads.clone())?;
    let sessions = Manager::new(cfg.clone(), provider, uploads.clone());
    Ok(AppState {
        config: cfg,
        sessions,
        uploads,
        ingestor,
    })
}

pub fn app(state: AppState) -> Router {
    let cfg = state.config.clone();
    let auth_layer = ValidateRequestHeaderLayer::custom(StaticTokens::new(cfg.auth.tokens.clone()));
    Router::new()
        .merge(
            route::recording::route()
                .merge(route::files::route())
                .layer(auth_layer),
        )
        .merge(route::webhook::route(state.clone()))
        .route(api::path::METRICS, get(metrics))
        .nest_service("/uploads", ServeDir::new(&cfg.storage.root))
        .with_state(state)
        .layer(if cfg.http.cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let span = info_span!(
                        "http_request",
                        uri = ?request.uri(),
                        method = ?request.method(),
                        span_id = tracing::field::Empty,
                    );
                    span.record(
                        "span_id",
                        span.id().map(|id| id.into_u64()).unwrap_or_default(),
                    );
                    span
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO))
                .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
        )
}

pub async fn server_up<F>(cfg: Config, listener: TcpListener, signal: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = match app_state(cfg) {
        Ok(state) => state,
        Err(err) => {
            error!("failed to initialize application state: {err}");
            return;
        }
    };
    tokio::spawn(state.uploads.clone().retention_tick());
    axum::serve(listener, app(state))
        .with_graceful_shutdown(signal)
        .await
        .unwrap_or_else(|e| error!("Application error: {e}"));
}

pub fn metrics_register() {
    metrics::REGISTRY
        .register(Box::new(metrics::SESSIONS.clone()))
        .unwrap();
    metrics::REGISTRY
        .register(Box::new(metrics::BATCHES.clone()))
        .unwrap();
}

async fn metrics() -> String {
    metrics::ENCODER
        .encode_to_string(&metrics::REGISTRY.gather())
        .unwrap()
}
