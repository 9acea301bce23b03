//! Static pages.

use axum::extract::State;
use axum::response::Html;
use tower_sessions::Session;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;
use crate::templates::{render, AboutTemplate, ContactTemplate, PageContext};

/// GET /about
pub async fn about(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
) -> Result<Html<String>, AppError> {
    let page = PageContext::load(&session, &identity, &state.config).await?;
    render(&AboutTemplate { page })
}

/// GET /contact
pub async fn contact(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
) -> Result<Html<String>, AppError> {
    let page = PageContext::load(&session, &identity, &state.config).await?;
    render(&ContactTemplate { page })
}
