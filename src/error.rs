use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;

use api::response::{ErrorEnvelope, Rejection};

use crate::helper;

#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed request field; carries the catalogue code.
    BadRequest(i64, String),
    /// Mutating operation attempted by a non-host caller.
    Forbidden(String),
    /// A non-terminal session already occupies the channel.
    SessionConflict(String),
    NotFound(String),
    /// Webhook signature or timestamp header did not check out.
    SignatureInvalid,
    /// The provider rejected a control-plane call; surfaced verbatim, never retried.
    Upstream { code: i64, message: String },
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn bad_request<T: ToString>(code: i64, t: T) -> Self {
        AppError::BadRequest(code, t.to_string())
    }

    pub fn forbidden<T: ToString>(t: T) -> Self {
        AppError::Forbidden(t.to_string())
    }

    pub fn conflict<T: ToString>(t: T) -> Self {
        AppError::SessionConflict(t.to_string())
    }

    pub fn not_found<T: ToString>(t: T) -> Self {
        AppError::NotFound(t.to_string())
    }

    pub fn upstream<T: ToString>(code: i64, t: T) -> Self {
        AppError::Upstream {
            code,
            message: t.to_string(),
        }
    }
}

/// Fixed provider error catalogue; codes outside it fall back to the
/// message the provider sent.
pub fn catalogue(code: i64) -> Option<&'static str> {
    match code {
        2 => Some("Invalid parameter"),
        7 => Some("Recording already running"),
        8 => Some("HTTP request header error"),
        49 => Some("Repeated stop request"),
        53 => Some("Recording already running (different resource)"),
        62 => Some("Cloud recording not enabled"),
        65 => Some("Network jitter - retry recommended"),
        109 => Some("Token expired"),
        110 => Some("Token invalid"),
        432 => Some("Parameter mismatch"),
        433 => Some("Resource ID expired"),
        435 => Some("No recorded files created"),
        501 => Some("Recording service exiting"),
        1001 => Some("Failed to parse resource ID"),
        1003 => Some("App ID or recording ID mismatch"),
        1013 => Some("Invalid channel name"),
        _ => None,
    }
}

fn envelope(code: i64, fallback: &str) -> ErrorEnvelope {
    let message = match catalogue(code) {
        Some(known) => known.to_string(),
        None if fallback.is_empty() => "Unknown error".to_string(),
        None => fallback.to_string(),
    };
    ErrorEnvelope {
        success: false,
        error_code: code,
        error_message: message,
        timestamp: helper::timestamp(),
    }
}

fn rejection(message: String) -> Rejection {
    Rejection {
        success: false,
        message,
        timestamp: helper::timestamp(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, Json(envelope(code, &msg))).into_response()
            }
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, Json(rejection(msg))).into_response()
            }
            AppError::SessionConflict(msg) => {
                (StatusCode::CONFLICT, Json(rejection(msg))).into_response()
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::SignatureInvalid => {
                (StatusCode::UNAUTHORIZED, "invalid signature").into_response()
            }
            AppError::Upstream { code, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(envelope(code, &message)),
            )
                .into_response(),
            AppError::InternalServerError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(envelope(501, &err.to_string())),
            )
                .into_response(),
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::InternalServerError(err.into())
    }
}
