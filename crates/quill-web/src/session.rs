//! # Session Helpers
//!
//! Besides the signed-in user id (see [`crate::auth`]) a session holds
//! one-shot flash messages and the CSRF token embedded in every form.
//! Session data lives in the server-side store; the cookie only holds the
//! signed session id.

use serde::Deserialize;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use tower_sessions::cookie::Key;
use tower_sessions::Session;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::AppError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "quill-session";

const FLASHES_KEY: &str = "_flashes";
const CSRF_KEY: &str = "_csrf_token";

/// Shown when a submission carries a missing or stale CSRF token.
pub const CSRF_REJECTED: &str =
    "This form has expired or did not come from this site. Reload the page and try again.";

/// Cookie signing key derived from `SECRET_KEY`.
///
/// SHA-512 stretches any accepted secret to the 64 bytes the signer needs.
pub fn signing_key(config: &AppConfig) -> Key {
    let digest = Sha512::digest(config.secret_key.as_bytes());
    Key::from(digest.as_slice())
}

/// Queue a message for the next rendered page.
pub async fn flash(session: &Session, message: impl Into<String>) -> Result<(), AppError> {
    let mut messages: Vec<String> = session.get(FLASHES_KEY).await?.unwrap_or_default();
    messages.push(message.into());
    session.insert(FLASHES_KEY, messages).await?;
    Ok(())
}

/// Remove and return every queued message.
pub async fn take_flashes(session: &Session) -> Result<Vec<String>, AppError> {
    Ok(session
        .remove::<Vec<String>>(FLASHES_KEY)
        .await?
        .unwrap_or_default())
}

/// The session's CSRF token, created on first use.
pub async fn csrf_token(session: &Session) -> Result<String, AppError> {
    if let Some(token) = session.get::<String>(CSRF_KEY).await? {
        return Ok(token);
    }
    let token = Uuid::new_v4().simple().to_string();
    session.insert(CSRF_KEY, &token).await?;
    Ok(token)
}

/// Check a submitted CSRF token against the session's.
///
/// Always passes when CSRF protection is disabled in configuration.
pub async fn verify_csrf(
    session: &Session,
    config: &AppConfig,
    submitted: &str,
) -> Result<(), AppError> {
    if !config.csrf_enabled {
        return Ok(());
    }
    let expected = session.get::<String>(CSRF_KEY).await?;
    match expected {
        Some(expected) if bool::from(expected.as_bytes().ct_eq(submitted.as_bytes())) => Ok(()),
        Some(_) => {
            tracing::warn!("rejected form submission: CSRF token mismatch");
            Err(AppError::BadRequest(CSRF_REJECTED.to_string()))
        }
        None => {
            tracing::warn!("rejected form submission: session has no CSRF token");
            Err(AppError::BadRequest(CSRF_REJECTED.to_string()))
        }
    }
}

/// A submitted form together with its hidden `csrf_token` field.
#[derive(Debug, Deserialize)]
pub struct CsrfProtected<T> {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CsrfProtected<T> {
    /// Verify the token and hand back the form fields.
    pub async fn verified(self, session: &Session, config: &AppConfig) -> Result<T, AppError> {
        verify_csrf(session, config, &self.csrf_token).await?;
        Ok(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::CommentForm;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn config(csrf_enabled: bool) -> AppConfig {
        let mut config = AppConfig::new("0123456789abcdef", "sqlite::memory:");
        config.csrf_enabled = csrf_enabled;
        config
    }

    #[tokio::test]
    async fn flashes_are_taken_once_in_order() {
        let session = session();
        flash(&session, "first").await.unwrap();
        flash(&session, "second").await.unwrap();
        assert_eq!(take_flashes(&session).await.unwrap(), vec!["first", "second"]);
        assert!(take_flashes(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn csrf_token_is_stable_within_a_session() {
        let session = session();
        let first = csrf_token(&session).await.unwrap();
        let second = csrf_token(&session).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }

    #[tokio::test]
    async fn csrf_verification() {
        let session = session();
        let token = csrf_token(&session).await.unwrap();
        let enabled = config(true);

        assert!(verify_csrf(&session, &enabled, &token).await.is_ok());
        assert!(matches!(
            verify_csrf(&session, &enabled, "forged").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            verify_csrf(&session, &enabled, "").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn csrf_without_session_token_is_rejected() {
        let session = session();
        assert!(verify_csrf(&session, &config(true), "anything")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn csrf_disabled_accepts_anything() {
        let session = session();
        assert!(verify_csrf(&session, &config(false), "").await.is_ok());
    }

    #[test]
    fn protected_form_splits_token_from_fields() {
        let form: CsrfProtected<CommentForm> =
            decode_form("csrf_token=abc&body=Nice+post");
        assert_eq!(form.csrf_token, "abc");
        assert_eq!(form.data.body, "Nice post");

        let form: CsrfProtected<CommentForm> = decode_form("body=x");
        assert_eq!(form.csrf_token, "");
    }

    fn decode_form<T: serde::de::DeserializeOwned>(query: &str) -> T {
        axum::extract::Query::<T>::try_from_uri(
            &format!("/?{query}").parse().expect("valid uri"),
        )
        .expect("form decodes")
        .0
    }

    #[test]
    fn signing_key_is_deterministic() {
        let a = signing_key(&config(true));
        let b = signing_key(&config(true));
        assert_eq!(a.master(), b.master());
    }
}
