//! # Password Hashing
//!
//! PBKDF2-HMAC-SHA256 with an 8-character random salt, stored as
//!
//! ```text
//! pbkdf2:sha256:<iterations>$<salt>$<hex digest>
//! ```
//!
//! This is the layout written by the blog's earlier deployment, so rows
//! created there keep verifying. The salt is used as its ASCII bytes and the
//! derived key is 32 bytes (the SHA-256 output size).
//!
//! Verification never compares plaintext: the candidate is re-hashed with
//! the stored salt and iteration count and the hex digests are compared in
//! constant time.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Salt length in characters.
pub const SALT_LENGTH: usize = 8;

/// Iteration count used when none is configured.
pub const DEFAULT_ITERATIONS: u32 = 600_000;

const METHOD_PREFIX: &str = "pbkdf2";
const DIGEST_NAME: &str = "sha256";
const KEY_LENGTH: usize = 32;

/// Errors reading a stored password hash.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The stored value is not `method$salt$hash`.
    #[error("malformed password hash: {0}")]
    Malformed(&'static str),

    /// The hash uses an algorithm other than pbkdf2:sha256.
    #[error("unsupported password hash method: {0}")]
    UnsupportedMethod(String),

    /// The iteration count is not a positive integer.
    #[error("invalid iteration count: {0}")]
    InvalidIterations(String),
}

/// Produces new password hashes with a fixed iteration count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    /// Create a hasher. An iteration count of zero is raised to one.
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    /// Iteration count written into new hashes.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> String {
        let salt = generate_salt();
        self.hash_with_salt(password, &salt)
    }

    fn hash_with_salt(&self, password: &str, salt: &str) -> String {
        let digest = derive_hex(password, salt, self.iterations);
        format!(
            "{METHOD_PREFIX}:{DIGEST_NAME}:{}${salt}${digest}",
            self.iterations
        )
    }
}

/// Check `candidate` against a stored hash.
///
/// Returns `false` for a wrong password and for stored values that cannot
/// be parsed; a malformed row must never let anyone in.
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    match ParsedHash::parse(stored) {
        Ok(parsed) => {
            let computed = derive_hex(candidate, parsed.salt, parsed.iterations);
            let expected = parsed.digest.as_bytes();
            let computed = computed.as_bytes();
            if expected.len() != computed.len() {
                return false;
            }
            expected.ct_eq(computed).into()
        }
        Err(_) => false,
    }
}

/// Check that a stored value has the layout [`verify_password`] understands.
pub fn check_hash_format(stored: &str) -> Result<(), PasswordError> {
    ParsedHash::parse(stored).map(|_| ())
}

struct ParsedHash<'a> {
    iterations: u32,
    salt: &'a str,
    digest: &'a str,
}

impl<'a> ParsedHash<'a> {
    fn parse(stored: &'a str) -> Result<Self, PasswordError> {
        let mut parts = stored.splitn(3, '$');
        let method = parts.next().ok_or(PasswordError::Malformed("empty"))?;
        let salt = parts
            .next()
            .ok_or(PasswordError::Malformed("missing salt"))?;
        let digest = parts
            .next()
            .ok_or(PasswordError::Malformed("missing digest"))?;

        let mut method_parts = method.split(':');
        if method_parts.next() != Some(METHOD_PREFIX) {
            return Err(PasswordError::UnsupportedMethod(method.to_string()));
        }
        let digest_name = method_parts.next().unwrap_or(DIGEST_NAME);
        if digest_name != DIGEST_NAME {
            return Err(PasswordError::UnsupportedMethod(method.to_string()));
        }
        let iterations = match method_parts.next() {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(PasswordError::InvalidIterations(raw.to_string())),
            },
            None => DEFAULT_ITERATIONS,
        };
        if method_parts.next().is_some() {
            return Err(PasswordError::Malformed("too many method fields"));
        }

        Ok(Self {
            iterations,
            salt,
            digest,
        })
    }
}

fn generate_salt() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}

fn derive_hex(password: &str, salt: &str, iterations: u32) -> String {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut key);
    key.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    #[test]
    fn hash_layout() {
        let stored = fast().hash("secret");
        let (method, rest) = stored.split_once('$').unwrap();
        let (salt, digest) = rest.split_once('$').unwrap();
        assert_eq!(method, "pbkdf2:sha256:1000");
        assert_eq!(salt.len(), SALT_LENGTH);
        assert!(salt.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(digest.len(), KEY_LENGTH * 2);
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let stored = fast().hash("correct horse battery staple");
        assert!(!stored.contains("correct horse"));
    }

    #[test]
    fn verify_accepts_right_password() {
        let stored = fast().hash("secret");
        assert!(verify_password(&stored, "secret"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let stored = fast().hash("secret");
        assert!(!verify_password(&stored, "Secret"));
        assert!(!verify_password(&stored, ""));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = fast().hash("same");
        let b = fast().hash("same");
        assert_ne!(a, b);
        assert!(verify_password(&a, "same"));
        assert!(verify_password(&b, "same"));
    }

    #[test]
    fn known_vector() {
        // RFC 7914 §11 PBKDF2-HMAC-SHA256 test vector (P="passwd", S="salt", c=1).
        let stored = format!(
            "pbkdf2:sha256:1$salt${}",
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
        assert!(verify_password(&stored, "passwd"));
    }

    #[test]
    fn hash_with_salt_is_deterministic() {
        let hasher = fast();
        assert_eq!(
            hasher.hash_with_salt("pw", "abcdefgh"),
            hasher.hash_with_salt("pw", "abcdefgh")
        );
    }

    #[test]
    fn malformed_hashes_never_verify() {
        for stored in [
            "",
            "plaintext",
            "pbkdf2:sha256:1000$onlysalt",
            "scrypt:32768:8:1$salt$abcd",
            "pbkdf2:sha1:1000$salt$abcd",
            "pbkdf2:sha256:zero$salt$abcd",
            "pbkdf2:sha256:0$salt$abcd",
        ] {
            assert!(!verify_password(stored, "anything"), "{stored}");
        }
    }

    #[test]
    fn parse_reports_reason() {
        assert!(matches!(
            ParsedHash::parse("scrypt$a$b"),
            Err(PasswordError::UnsupportedMethod(_))
        ));
        assert!(matches!(
            ParsedHash::parse("pbkdf2:sha256:x$a$b"),
            Err(PasswordError::InvalidIterations(_))
        ));
        assert!(matches!(
            ParsedHash::parse("pbkdf2:sha256:5"),
            Err(PasswordError::Malformed(_))
        ));
    }

    #[test]
    fn zero_iterations_raised_to_one() {
        assert_eq!(PasswordHasher::new(0).iterations(), 1);
        assert_eq!(PasswordHasher::default().iterations(), DEFAULT_ITERATIONS);
    }
}
