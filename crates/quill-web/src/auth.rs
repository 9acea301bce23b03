//! # Authentication & Admin Gate
//!
//! The session stores the signed-in user's id under a single key. On every
//! request [`CurrentUser`] turns that id back into a [`User`] row; an id
//! whose row has disappeared is dropped from the session and the visitor is
//! treated as anonymous.
//!
//! ## Admin gate
//!
//! [`admin_gate`] wraps the create and edit post routes. The decision itself
//! is [`quill_core::AdminGate::check`], selected by `QUILL_ADMIN_GATE`.
//!
//! ## Passwords
//!
//! PBKDF2 with hundreds of thousands of iterations takes long enough to
//! stall a runtime worker, so hashing and verification run on the blocking
//! thread pool.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use quill_core::{Identity, PasswordHasher, User};
use sqlx::AnyPool;
use tower_sessions::Session;

use crate::db::users;
use crate::error::AppError;
use crate::state::AppState;

const USER_ID_KEY: &str = "_user_id";

// ── CurrentUser ─────────────────────────────────────────────────────────────

/// Who is making the request, resolved from the session.
///
/// Resolved at most once per request and cached in the request extensions,
/// so the admin gate and the handler behind it agree.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<CurrentUser>() {
            return Ok(cached.clone());
        }
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;
        let current = CurrentUser(resolve_identity(&session, &state.db).await?);
        parts.extensions.insert(current.clone());
        Ok(current)
    }
}

/// Load the user whose id the session holds.
pub async fn resolve_identity(session: &Session, pool: &AnyPool) -> Result<Identity, AppError> {
    let Some(user_id) = session.get::<i64>(USER_ID_KEY).await? else {
        return Ok(Identity::Anonymous);
    };
    match users::get_by_id(pool, user_id).await? {
        Some(user) => Ok(Identity::Authenticated(user)),
        None => {
            tracing::warn!(user_id, "session refers to a deleted user, signing out");
            session.remove::<i64>(USER_ID_KEY).await?;
            Ok(Identity::Anonymous)
        }
    }
}

/// Start an authenticated session for `user`.
///
/// The session id is rotated first so a pre-login id cannot be reused.
pub async fn login(session: &Session, user: &User) -> Result<(), AppError> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user.id).await?;
    tracing::info!(user_id = user.id, "user signed in");
    Ok(())
}

/// End the authenticated session. Anonymous callers are a no-op.
pub async fn logout(session: &Session) -> Result<(), AppError> {
    if let Some(user_id) = session.remove::<i64>(USER_ID_KEY).await? {
        session.cycle_id().await?;
        tracing::info!(user_id, "user signed out");
    }
    Ok(())
}

// ── Admin gate ──────────────────────────────────────────────────────────────

/// Middleware refusing callers the configured [`quill_core::AdminGate`]
/// does not admit, with 403 Forbidden.
pub async fn admin_gate(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.config.admin_gate.check(&identity) {
        Ok(()) => Ok(next.run(request).await),
        Err(denial) => {
            tracing::warn!(
                caller = %identity,
                path = %request.uri().path(),
                policy = state.config.admin_gate.as_str(),
                "admin gate refused request"
            );
            Err(AppError::Forbidden(denial.to_string()))
        }
    }
}

// ── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` off the async runtime.
pub async fn hash_password(hasher: PasswordHasher, password: String) -> Result<String, AppError> {
    Ok(tokio::task::spawn_blocking(move || hasher.hash(&password)).await?)
}

/// Verify `candidate` against a stored hash off the async runtime.
pub async fn check_password(stored: String, candidate: String) -> Result<bool, AppError> {
    Ok(
        tokio::task::spawn_blocking(move || quill_core::verify_password(&stored, &candidate))
            .await?,
    )
}
