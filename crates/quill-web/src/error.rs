//! # Web Error Types
//!
//! [`AppError`] is returned by every handler and renders as an HTML error
//! page with the matching status code. Server-side failures are logged with
//! their details and shown to the visitor only as a generic notice.
//!
//! Form validation failures and failed logins are not errors at this level:
//! the handler re-renders the form with field messages or a flash.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use crate::templates::ErrorPage;

/// Notice shown for any 500-class failure.
pub const GENERIC_FAILURE: &str =
    "Something went wrong while handling your request. Nothing was changed, please try again.";

/// Handler-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// No post with the requested id, or no such page (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The request could not be decoded or failed the CSRF check (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The action needs a signed-in user (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The admin gate refused the caller (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A read or write against the database failed (500).
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Anything else that should not happen (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code and machine-readable code for this error.
    pub(crate) fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Text safe to show the visitor.
    fn public_message(&self) -> String {
        match self {
            Self::NotFound(msg) | Self::BadRequest(msg) | Self::Unauthorized(msg) => msg.clone(),
            Self::Forbidden(_) => "You do not have permission to view this page.".to_string(),
            Self::Persistence(_) | Self::Internal(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match &self {
            Self::Persistence(_) => tracing::error!(error = %self, "database operation failed"),
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Forbidden(_) => tracing::info!(error = %self, "request refused"),
            _ => tracing::debug!(error = %self, code, "request rejected"),
        }

        let page = ErrorPage::new(status, self.public_message());
        match page.render_html() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "error page failed to render");
                (status, page.message).into_response()
            }
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session store: {err}"))
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        Self::Internal(format!("template rendering: {err}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task: {err}"))
    }
}
