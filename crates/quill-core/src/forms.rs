//! # Form Schemas
//!
//! The four submitted form shapes and the validators that turn them into
//! typed values.
//!
//! Input structs deserialize leniently: every field defaults to the empty
//! string so that a missing field surfaces as a "required" error next to the
//! field instead of a body-parsing failure.

use serde::Deserialize;
use url::Url;

use crate::error::{FormErrors, ValidationError};

/// A submitted form that can be checked and converted into typed values.
pub trait Validate {
    /// The typed value produced by a successful validation.
    type Output;

    /// Check every field, collecting all failures.
    fn validate(&self) -> Result<Self::Output, FormErrors>;
}

// ── Column widths ───────────────────────────────────────────────────────────

/// Width of `users.name`.
pub const NAME_MAX_LEN: usize = 50;
/// Width of `users.email`.
pub const EMAIL_MAX_LEN: usize = 100;
/// Width of `blog_posts.title`, `subtitle` and `img_url`.
pub const POST_FIELD_MAX_LEN: usize = 250;

// ── Validators ──────────────────────────────────────────────────────────────

/// The value must contain something other than whitespace.
pub fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required)
    } else {
        Ok(())
    }
}

/// The value must be non-empty. Whitespace counts as input.
///
/// Used for passwords, which are taken exactly as typed.
pub fn present(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::Required)
    } else {
        Ok(())
    }
}

/// The trimmed value must fit in `max` characters.
pub fn max_length(value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().chars().count() > max {
        Err(ValidationError::TooLong { max })
    } else {
        Ok(())
    }
}

/// The value must look like `local@domain.tld`.
///
/// Only the shape is checked: one `@`, a non-empty local part, and a
/// dotted domain without empty labels. No whitespace anywhere.
pub fn email_shape(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    let (local, domain) = value
        .split_once('@')
        .ok_or(ValidationError::InvalidEmail)?;
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ValidationError::InvalidEmail);
    }
    if domain.split('.').any(str::is_empty) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// The value must be an absolute `http` or `https` URL with a host.
pub fn http_url(value: &str) -> Result<(), ValidationError> {
    let parsed = Url::parse(value.trim()).map_err(|_| ValidationError::InvalidUrl)?;
    let web_scheme = matches!(parsed.scheme(), "http" | "https");
    let has_host = parsed.host_str().is_some_and(|h| !h.is_empty());
    if web_scheme && has_host {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl)
    }
}

/// `confirmation` must equal `original` exactly.
pub fn equal_to(confirmation: &str, original: &str) -> Result<(), ValidationError> {
    if confirmation == original {
        Ok(())
    } else {
        Err(ValidationError::Mismatch)
    }
}

// ── Create / edit post ──────────────────────────────────────────────────────

/// Submitted fields of the create/edit post form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreatePostForm {
    /// "Blog Post Title"
    pub title: String,
    /// "Subtitle"
    pub subtitle: String,
    /// "Blog Image URL"
    pub img_url: String,
    /// "Blog Content"
    pub body: String,
}

/// A validated post form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    /// Trimmed title.
    pub title: String,
    /// Trimmed subtitle.
    pub subtitle: String,
    /// Trimmed image URL.
    pub img_url: String,
    /// Body exactly as submitted.
    pub body: String,
}

impl Validate for CreatePostForm {
    type Output = PostDraft;

    fn validate(&self) -> Result<PostDraft, FormErrors> {
        let mut errors = FormErrors::new();
        errors.record(
            "title",
            required(&self.title).and_then(|_| max_length(&self.title, POST_FIELD_MAX_LEN)),
        );
        errors.record(
            "subtitle",
            required(&self.subtitle).and_then(|_| max_length(&self.subtitle, POST_FIELD_MAX_LEN)),
        );
        errors.record(
            "img_url",
            required(&self.img_url)
                .and_then(|_| max_length(&self.img_url, POST_FIELD_MAX_LEN))
                .and_then(|_| http_url(&self.img_url)),
        );
        errors.record("body", required(&self.body));
        errors.into_result(PostDraft {
            title: self.title.trim().to_string(),
            subtitle: self.subtitle.trim().to_string(),
            img_url: self.img_url.trim().to_string(),
            body: self.body.clone(),
        })
    }
}

impl From<&crate::model::Post> for CreatePostForm {
    /// Pre-populate the edit form from a stored post.
    fn from(post: &crate::model::Post) -> Self {
        Self {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            img_url: post.img_url.clone(),
            body: post.body.clone(),
        }
    }
}

// ── Register ────────────────────────────────────────────────────────────────

/// Submitted fields of the registration form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    /// "Name"
    pub name: String,
    /// "Email"
    pub email: String,
    /// "Password"
    pub password: String,
    /// "Retype password"
    pub password2: String,
}

/// A validated registration. The password is still plaintext here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Trimmed display name.
    pub name: String,
    /// Trimmed email.
    pub email: String,
    /// Plaintext password, to be hashed before storage.
    pub password: String,
}

impl Validate for RegisterForm {
    type Output = Registration;

    fn validate(&self) -> Result<Registration, FormErrors> {
        let mut errors = FormErrors::new();
        errors.record(
            "name",
            required(&self.name).and_then(|_| max_length(&self.name, NAME_MAX_LEN)),
        );
        errors.record(
            "email",
            required(&self.email)
                .and_then(|_| max_length(&self.email, EMAIL_MAX_LEN))
                .and_then(|_| email_shape(&self.email)),
        );
        errors.record("password", present(&self.password));
        errors.record(
            "password2",
            present(&self.password2).and_then(|_| equal_to(&self.password2, &self.password)),
        );
        errors.into_result(Registration {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

// ── Login ───────────────────────────────────────────────────────────────────

/// Submitted fields of the login form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    /// "Email"
    pub email: String,
    /// "Password"
    pub password: String,
}

/// Validated login credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Trimmed email.
    pub email: String,
    /// Plaintext password as submitted.
    pub password: String,
}

impl Validate for LoginForm {
    type Output = Credentials;

    fn validate(&self) -> Result<Credentials, FormErrors> {
        let mut errors = FormErrors::new();
        errors.record("email", required(&self.email));
        errors.record("password", present(&self.password));
        errors.into_result(Credentials {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

// ── Comment ─────────────────────────────────────────────────────────────────

/// Submitted fields of the comment form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    /// "Comment"
    pub body: String,
}

/// A validated comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    /// Comment text as submitted.
    pub body: String,
}

impl Validate for CommentForm {
    type Output = CommentDraft;

    fn validate(&self) -> Result<CommentDraft, FormErrors> {
        let mut errors = FormErrors::new();
        errors.record("body", required(&self.body));
        errors.into_result(CommentDraft {
            body: self.body.clone(),
        })
    }
}
