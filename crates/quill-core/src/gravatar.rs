//! Gravatar avatar URLs for comment authors.

use sha2::{Digest, Sha256};

/// Avatar size in pixels used on post pages.
pub const DEFAULT_SIZE: u32 = 100;

/// Build the Gravatar image URL for `email`.
///
/// The address is trimmed and lower-cased before hashing. Unknown addresses
/// get the generated "retro" image and only G-rated avatars are served.
pub fn gravatar_url(email: &str, size: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    let hash: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    format!("https://www.gravatar.com/avatar/{hash}?s={size}&d=retro&r=g")
}
