//! # Extraction Helpers
//!
//! Handlers take axum extractors as `Result<_, Rejection>` and pass them
//! through these helpers so malformed requests render the HTML error page
//! instead of axum's plain-text rejection.

use axum::extract::rejection::{FormRejection, PathRejection};
use axum::extract::{Form, Path};

use crate::error::AppError;

/// Extract a urlencoded form body, mapping decode errors to
/// [`AppError::BadRequest`].
pub fn extract_form<T>(result: Result<Form<T>, FormRejection>) -> Result<T, AppError> {
    result
        .map(|Form(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a numeric post id from the path.
///
/// A segment that is not an integer cannot name a post, so it is a 404
/// like any other unknown post.
pub fn extract_post_id(result: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    result.map(|Path(id)| id).map_err(|err| {
        tracing::debug!(error = %err.body_text(), "unparseable post id");
        AppError::NotFound("That post does not exist.".to_string())
    })
}
