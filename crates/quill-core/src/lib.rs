#![deny(missing_docs)]

//! # quill-core — Domain Types for the Quill Blog
//!
//! Everything the web layer needs to reason about a blog without touching
//! I/O: the three records (users, posts, comments), the four submitted form
//! shapes and their validators, password hashing, and the rules that decide
//! who the current visitor is and whether they may use admin-only pages.
//!
//! ## Design Principles
//!
//! 1. **No I/O.** Persistence, sessions and rendering live in `quill-web`.
//!    This crate is synchronous and deterministic apart from salt generation.
//!
//! 2. **Validated input is a different type.** A submitted [`RegisterForm`]
//!    becomes a [`Registration`] only through [`Validate::validate`], so a
//!    handler cannot persist unchecked input by accident.
//!
//! 3. **The administrator is user id 1.** There is no role column. The
//!    [`AdminGate`] policy keeps the historical gate behaviour selectable.

pub mod error;
pub mod forms;
pub mod gravatar;
pub mod identity;
pub mod model;
pub mod password;

pub use error::{FieldError, FormErrors, ValidationError};
pub use forms::{
    CommentDraft, CommentForm, CreatePostForm, Credentials, LoginForm, PostDraft, RegisterForm,
    Registration, Validate,
};
pub use gravatar::gravatar_url;
pub use identity::{AdminGate, GateDenial, Identity, ADMIN_USER_ID};
pub use model::{
    display_date, today, Comment, CommentWithAuthor, NewComment, NewPost, NewUser, Post,
    PostUpdate, PostWithAuthor, User,
};
pub use password::{check_hash_format, verify_password, PasswordError, PasswordHasher};
