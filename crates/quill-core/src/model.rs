//! # Blog Records
//!
//! The three persisted record types and their insert/update payloads.
//!
//! Relationships are plain foreign-key ids. There are no back-references
//! between in-memory records; the persistence layer answers
//! "posts by user" and "comments on post" with explicit queries.
//!
//! Dates are stored as display strings (`October 18, 2026`), not as date
//! types, matching the existing `blog_posts.date` and `comments.time`
//! columns.

use chrono::{Local, NaiveDate};

use crate::identity::ADMIN_USER_ID;

/// Display format of post dates and comment times.
pub const DATE_FORMAT: &str = "%B %d, %Y";

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Primary key. Id 1 is the administrator.
    pub id: i64,
    /// Login email. Expected to be unique, checked at registration only.
    pub email: String,
    /// Salted PBKDF2 hash, see [`crate::password`].
    pub password_hash: String,
    /// Display name shown next to posts and comments.
    pub name: String,
}

impl User {
    /// Whether this account is the administrator.
    pub fn is_admin(&self) -> bool {
        self.id == ADMIN_USER_ID
    }
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Primary key.
    pub id: i64,
    /// Headline, unique across posts.
    pub title: String,
    /// Sub-headline.
    pub subtitle: String,
    /// Publish date as a display string.
    pub date: String,
    /// Rich-text HTML body.
    pub body: String,
    /// Header image URL.
    pub img_url: String,
    /// Author (`users.id`).
    pub user_id: i64,
}

/// A comment left on a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Primary key.
    pub id: i64,
    /// Comment text.
    pub body: String,
    /// Creation date as a display string.
    pub time: String,
    /// Commenter (`users.id`).
    pub user_id: i64,
    /// Commented post (`blog_posts.id`).
    pub post_id: i64,
}

/// A post joined with its author's display name, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostWithAuthor {
    /// The post row.
    pub post: Post,
    /// Author display name.
    pub author_name: String,
}

/// A comment joined with the name and email of its author, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentWithAuthor {
    /// The comment row.
    pub comment: Comment,
    /// Author display name.
    pub author_name: String,
    /// Author email, used for the avatar.
    pub author_email: String,
}

/// Payload for inserting a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Already-hashed password.
    pub password_hash: String,
}

/// Payload for inserting a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Headline.
    pub title: String,
    /// Sub-headline.
    pub subtitle: String,
    /// Publish date display string.
    pub date: String,
    /// Rich-text HTML body.
    pub body: String,
    /// Header image URL.
    pub img_url: String,
    /// Author id.
    pub user_id: i64,
}

/// Editable fields of a post. The publish date never changes on edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUpdate {
    /// Headline.
    pub title: String,
    /// Sub-headline.
    pub subtitle: String,
    /// Rich-text HTML body.
    pub body: String,
    /// Header image URL.
    pub img_url: String,
    /// The editing user becomes the author.
    pub user_id: i64,
}

/// Payload for inserting a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    /// Comment text.
    pub body: String,
    /// Creation date display string.
    pub time: String,
    /// Commenter id.
    pub user_id: i64,
    /// Commented post id.
    pub post_id: i64,
}

/// Format a calendar date the way posts and comments display it.
pub fn display_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Today's date (server local time) in display format.
pub fn today() -> String {
    display_date(Local::now().date_naive())
}
