//! # Route Handlers
//!
//! - [`posts`]: listing, reading and commenting on posts, and the admin
//!   create, edit and delete actions.
//! - [`accounts`]: registration, login and logout.
//! - [`pages`]: the static about and contact pages.

pub mod accounts;
pub mod pages;
pub mod posts;
