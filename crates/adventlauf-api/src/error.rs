use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

use adventlauf_types::api::ErrorResponse;

use crate::middleware::clear_session_cookie;

/// Everything a handler can reject a request with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input or a broken business rule. The message is shown to the user.
    #[error("{0}")]
    Validation(String),

    #[error("Keine Schreibberechtigung.")]
    Forbidden,

    #[error("Nicht gefunden.")]
    NotFound,

    #[error("Anmeldung erforderlich.")]
    LoginRequired,

    /// The session points at a team that no longer exists.
    #[error("Team existiert nicht mehr.")]
    StaleSession,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => json_error(StatusCode::UNPROCESSABLE_ENTITY, message),
            Self::Forbidden => json_error(StatusCode::FORBIDDEN, self.to_string()),
            Self::NotFound => json_error(StatusCode::NOT_FOUND, self.to_string()),
            Self::LoginRequired => Redirect::to("/team").into_response(),
            Self::StaleSession => (
                [(header::SET_COOKIE, clear_session_cookie())],
                Redirect::to("/team"),
            )
                .into_response(),
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Interner Fehler.".into())
            }
        }
    }
}
