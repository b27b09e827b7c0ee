//! Service error taxonomy shared by all API handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Error categories with a fixed HTTP status mapping.
///
/// `Integrity` is raised only by the credential cipher when authentication of
/// a stored blob fails; it must never be remapped to another variant so that
/// tampering and key rotation breakage stay distinguishable from ordinary
/// failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed required fields (400).
    #[error("{0}")]
    Validation(String),

    /// Unknown correlation handle or store id (404).
    #[error("{0}")]
    NotFound(String),

    /// A required key or setting is absent; raised when the dependent
    /// feature is invoked, not at startup (500).
    #[error("{0}")]
    Configuration(String),

    /// Cipher authentication failure: tampered blob or wrong key (500).
    #[error("credential cipher authentication failed")]
    Integrity,

    /// Non-2xx from the third-party store API, status preserved (502).
    #[error("upstream store returned status {status}: {detail}")]
    Upstream { status: u16, detail: String },

    /// Record-store transport failures and other unexpected paths (500).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Integrity => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
