//! Askama templates for the blog pages.
//!
//! Every page extends `base.html`, which reads the shared [`PageContext`]
//! (navigation state, flashed messages, CSRF token) from a `page` field.

use askama::Template;
use axum::http::StatusCode;
use axum::response::Html;
use quill_core::{
    gravatar, gravatar_url, CommentForm, CommentWithAuthor, CreatePostForm, FormErrors, Identity,
    LoginForm, Post, PostWithAuthor, RegisterForm,
};
use tower_sessions::Session;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::session;

/// State shared by every page layout.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub logged_in: bool,
    pub is_admin: bool,
    pub user_name: String,
    pub flashes: Vec<String>,
    pub csrf_token: String,
}

impl PageContext {
    /// Layout state for a page without forms, consuming queued flashes.
    ///
    /// Leaves a visitor without a session without one.
    pub async fn load(
        session: &Session,
        identity: &Identity,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        Self::build(session, identity, config, false).await
    }

    /// Layout state for a page carrying a form. Issues the session's CSRF
    /// token when the check is enabled.
    pub async fn for_form(
        session: &Session,
        identity: &Identity,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        Self::build(session, identity, config, true).await
    }

    async fn build(
        session: &Session,
        identity: &Identity,
        config: &AppConfig,
        issue_token: bool,
    ) -> Result<Self, AppError> {
        let flashes = session::take_flashes(session).await?;
        let csrf_token = if config.csrf_enabled && issue_token {
            session::csrf_token(session).await?
        } else {
            String::new()
        };
        Ok(Self {
            logged_in: identity.is_authenticated(),
            is_admin: identity.is_admin(),
            user_name: identity.user().map(|u| u.name.clone()).unwrap_or_default(),
            flashes,
            csrf_token,
        })
    }
}

/// Field-level validation messages, looked up by field name.
#[derive(Debug, Clone, Default)]
pub struct FieldMessages(FormErrors);

impl FieldMessages {
    pub fn has(&self, field: &str) -> bool {
        self.0.has(field)
    }

    pub fn get(&self, field: &str) -> String {
        self.0.message_for(field).unwrap_or_default()
    }
}

impl From<FormErrors> for FieldMessages {
    fn from(errors: FormErrors) -> Self {
        Self(errors)
    }
}

/// A post as listed on the home page.
#[derive(Debug, Clone)]
pub struct PostCard {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub author: String,
}

impl From<PostWithAuthor> for PostCard {
    fn from(entry: PostWithAuthor) -> Self {
        Self {
            id: entry.post.id,
            title: entry.post.title,
            subtitle: entry.post.subtitle,
            date: entry.post.date,
            author: entry.author_name,
        }
    }
}

/// A comment as shown under a post.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub body: String,
    pub author: String,
    pub avatar_url: String,
    pub time: String,
}

impl From<CommentWithAuthor> for CommentView {
    fn from(entry: CommentWithAuthor) -> Self {
        Self {
            avatar_url: gravatar_url(&entry.author_email, gravatar::DEFAULT_SIZE),
            body: entry.comment.body,
            author: entry.author_name,
            time: entry.comment.time,
        }
    }
}

/// Home page: every post, oldest first.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
    pub posts: Vec<PostCard>,
}

/// A single post with its comments and the comment form.
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub page: PageContext,
    /// `post.img_url` made safe for a quoted CSS `url()`.
    pub header_image: String,
    pub post: Post,
    pub author: String,
    pub comments: Vec<CommentView>,
    pub form: CommentForm,
    pub errors: FieldMessages,
}

/// Create and edit post form.
#[derive(Template)]
#[template(path = "make-post.html")]
pub struct MakePostTemplate {
    pub page: PageContext,
    pub is_edit: bool,
    pub action: String,
    pub form: CreatePostForm,
    pub errors: FieldMessages,
}

/// Registration form. Passwords are never echoed back.
#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub form: RegisterForm,
    pub errors: FieldMessages,
}

/// Login form. Only the email is echoed back.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub form: LoginForm,
    pub errors: FieldMessages,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub page: PageContext,
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub page: PageContext,
}

/// Error page rendered by [`AppError`].
///
/// Has no access to the session, so navigation renders as for a visitor.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub page: PageContext,
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl ErrorPage {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            page: PageContext::default(),
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
        }
    }

    pub fn render_html(&self) -> Result<String, askama::Error> {
        self.render()
    }
}

/// Percent-encode the characters that could end a quoted CSS `url()`
/// value or the attribute around it.
pub fn css_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            '\'' | '"' | '(' | ')' | '\\' | '<' | '>' => {
                out.push_str(&format!("%{:02X}", c as u32));
            }
            c if c.is_whitespace() || c.is_control() => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{b:02X}"));
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Render a template into an HTML response body.
pub fn render<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{Comment, User, ValidationError};

    fn admin_page() -> PageContext {
        PageContext {
            logged_in: true,
            is_admin: true,
            user_name: "Admin".to_string(),
            flashes: vec![],
            csrf_token: "tok123".to_string(),
        }
    }

    fn post() -> Post {
        Post {
            id: 7,
            title: "Rust & Flasks".to_string(),
            subtitle: "Sub".to_string(),
            date: "October 18, 2026".to_string(),
            body: "<p>Trusted <b>markup</b></p>".to_string(),
            img_url: "https://img.example.com/a.png".to_string(),
            user_id: 1,
        }
    }

    #[tokio::test]
    async fn page_context_reflects_identity() {
        let session = Session::new(
            None,
            std::sync::Arc::new(tower_sessions::MemoryStore::default()),
            None,
        );
        session::flash(&session, "hello").await.unwrap();
        let identity = Identity::Authenticated(User {
            id: 2,
            email: "b@example.com".to_string(),
            password_hash: String::new(),
            name: "Bob".to_string(),
        });
        let config = AppConfig::new("0123456789abcdef", "sqlite::memory:");

        let page = PageContext::for_form(&session, &identity, &config)
            .await
            .unwrap();
        assert!(page.logged_in);
        assert!(!page.is_admin);
        assert_eq!(page.user_name, "Bob");
        assert_eq!(page.flashes, vec!["hello"]);
        assert!(!page.csrf_token.is_empty());

        let again = PageContext::for_form(&session, &identity, &config)
            .await
            .unwrap();
        assert!(again.flashes.is_empty());
        assert_eq!(again.csrf_token, page.csrf_token);
    }

    #[tokio::test]
    async fn plain_pages_leave_a_fresh_session_empty() {
        let session = Session::new(
            None,
            std::sync::Arc::new(tower_sessions::MemoryStore::default()),
            None,
        );
        let config = AppConfig::new("0123456789abcdef", "sqlite::memory:");

        let page = PageContext::load(&session, &Identity::Anonymous, &config)
            .await
            .unwrap();
        assert!(page.csrf_token.is_empty());
        assert!(!page.logged_in);
        assert!(session.is_empty().await);
    }

    #[test]
    fn css_url_cannot_close_the_quoted_value() {
        assert_eq!(
            css_url("https://img.example.com/a.png"),
            "https://img.example.com/a.png"
        );
        assert_eq!(
            css_url("http://x/a.png');background:url('http://evil/"),
            "http://x/a.png%27%29;background:url%28%27http://evil/"
        );
        assert_eq!(css_url(r#"http://x/a b\"c"#), "http://x/a%20b%5C%22c");
    }

    #[test]
    fn post_body_is_trusted_but_comments_are_escaped() {
        let comment = CommentWithAuthor {
            comment: Comment {
                id: 1,
                body: "<script>alert(1)</script>".to_string(),
                time: "October 18, 2026".to_string(),
                user_id: 2,
                post_id: 7,
            },
            author_name: "Bob".to_string(),
            author_email: "bob@example.com".to_string(),
        };
        let html = PostTemplate {
            page: admin_page(),
            header_image: css_url(&post().img_url),
            post: post(),
            author: "Admin".to_string(),
            comments: vec![comment.into()],
            form: CommentForm::default(),
            errors: FieldMessages::default(),
        }
        .render()
        .unwrap();

        assert!(html.contains("<b>markup</b>"));
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Rust &amp; Flasks"));
        assert!(html.contains("www.gravatar.com"));
        assert!(html.contains("/edit-post/7"));
        assert!(html.contains(r#"name="csrf_token" value="tok123""#));
    }

    #[test]
    fn field_messages_render_next_to_fields() {
        let mut errors = FormErrors::new();
        errors.record("img_url", Err(ValidationError::InvalidUrl));
        let html = MakePostTemplate {
            page: admin_page(),
            is_edit: false,
            action: "/new-post".to_string(),
            form: CreatePostForm::default(),
            errors: errors.into(),
        }
        .render()
        .unwrap();
        assert!(html.contains("Invalid URL."));
        assert!(html.contains("Blog Image URL"));
        assert!(html.contains("New Post"));
    }

    #[test]
    fn anonymous_navigation() {
        let html = IndexTemplate {
            page: PageContext::default(),
            posts: vec![],
        }
        .render()
        .unwrap();
        assert!(html.contains(r#"href="/login""#));
        assert!(html.contains(r#"href="/register""#));
        assert!(!html.contains(r#"href="/logout""#));
        assert!(!html.contains("Create New Post"));
    }

    #[test]
    fn error_page_uses_reason_phrase() {
        let page = ErrorPage::new(StatusCode::NOT_FOUND, "No post with id 9.".to_string());
        let html = page.render_html().unwrap();
        assert!(html.contains("404"));
        assert!(html.contains("Not Found"));
        assert!(html.contains("No post with id 9."));
    }
}
