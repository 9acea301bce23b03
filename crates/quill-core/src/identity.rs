//! # Visitor Identity and the Admin Gate
//!
//! A request is made either by an anonymous visitor or by one authenticated
//! user:
//!
//! ```text
//!   Anonymous ──login / register──▶ Authenticated(user)
//!       ▲                                  │
//!       └──────────── logout ──────────────┘
//! ```
//!
//! A session pointing at a user row that no longer exists resolves to
//! `Anonymous`.
//!
//! ## Admin gate policies
//!
//! | Caller                     | `Legacy` | `Strict` |
//! |----------------------------|----------|----------|
//! | anonymous                  | admitted | denied   |
//! | authenticated, id != 1     | denied   | denied   |
//! | authenticated, id == 1     | admitted | admitted |
//!
//! `Legacy` is the behaviour the blog has always had: it only turns away
//! signed-in non-admins. Whether anonymous visitors should also be turned
//! away is awaiting a product decision, so both policies exist and
//! `Legacy` stays the default.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::User;

/// The administrator's user id.
pub const ADMIN_USER_ID: i64 = 1;

/// Who is making the current request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    /// No session, or a session whose user no longer exists.
    #[default]
    Anonymous,
    /// A logged-in user.
    Authenticated(User),
}

impl Identity {
    /// The logged-in user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }

    /// The logged-in user's id, if any.
    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }

    /// Whether a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Whether the administrator is logged in.
    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(User::is_admin)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticated(user) => write!(f, "user {}", user.id),
        }
    }
}

/// Why the admin gate refused a caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateDenial {
    /// A signed-in user other than the administrator.
    #[error("user {0} is not the administrator")]
    NotAdmin(i64),

    /// Nobody is signed in (only under [`AdminGate::Strict`]).
    #[error("administrator login required")]
    NotLoggedIn,
}

/// Policy deciding who reaches admin-only pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminGate {
    /// Deny signed-in non-admins; let anonymous visitors through.
    #[default]
    Legacy,
    /// Deny everyone except the signed-in administrator.
    Strict,
}

impl AdminGate {
    /// Decide whether `identity` may proceed.
    pub fn check(&self, identity: &Identity) -> Result<(), GateDenial> {
        match (self, identity) {
            (_, Identity::Authenticated(user)) if user.is_admin() => Ok(()),
            (_, Identity::Authenticated(user)) => Err(GateDenial::NotAdmin(user.id)),
            (Self::Legacy, Identity::Anonymous) => Ok(()),
            (Self::Strict, Identity::Anonymous) => Err(GateDenial::NotLoggedIn),
        }
    }

    /// Configuration spelling of this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for AdminGate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown admin gate policy '{other}' (expected 'legacy' or 'strict')"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> Identity {
        Identity::Authenticated(User {
            id,
            email: format!("u{id}@example.com"),
            password_hash: String::new(),
            name: format!("User {id}"),
        })
    }

    #[test]
    fn legacy_admits_admin() {
        assert_eq!(AdminGate::Legacy.check(&user(1)), Ok(()));
    }

    #[test]
    fn legacy_denies_authenticated_non_admin() {
        assert_eq!(
            AdminGate::Legacy.check(&user(2)),
            Err(GateDenial::NotAdmin(2))
        );
    }

    #[test]
    fn legacy_admits_anonymous() {
        // Historical behaviour: anonymous callers are not stopped by the gate.
        assert_eq!(AdminGate::Legacy.check(&Identity::Anonymous), Ok(()));
    }

    #[test]
    fn strict_denies_anonymous() {
        assert_eq!(
            AdminGate::Strict.check(&Identity::Anonymous),
            Err(GateDenial::NotLoggedIn)
        );
        assert_eq!(AdminGate::Strict.check(&user(1)), Ok(()));
        assert!(AdminGate::Strict.check(&user(3)).is_err());
    }

    #[test]
    fn identity_accessors() {
        let anon = Identity::Anonymous;
        assert!(!anon.is_authenticated());
        assert!(!anon.is_admin());
        assert_eq!(anon.user_id(), None);
        assert_eq!(anon.to_string(), "anonymous");

        let admin = user(1);
        assert!(admin.is_authenticated());
        assert!(admin.is_admin());
        assert_eq!(admin.user_id(), Some(1));
        assert_eq!(admin.to_string(), "user 1");
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("STRICT".parse::<AdminGate>(), Ok(AdminGate::Strict));
        assert_eq!(" legacy ".parse::<AdminGate>(), Ok(AdminGate::Legacy));
        assert!("open".parse::<AdminGate>().is_err());
        assert_eq!(AdminGate::default(), AdminGate::Legacy);
    }
}
