//! Post handlers: the public listing and detail pages, commenting, and the
//! administrator's create, edit and delete actions.
//!
//! Create and edit sit behind [`crate::auth::admin_gate`]. Delete does not:
//! it is reachable by any caller and every use is logged at WARN with the
//! caller's identity.

use axum::extract::rejection::{FormRejection, PathRejection};
use axum::extract::{Form, Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use quill_core::{
    today, CommentForm, CreatePostForm, Identity, NewComment, NewPost, Post, PostDraft,
    PostUpdate, User, Validate,
};
use tower_sessions::Session;

use crate::auth::CurrentUser;
use crate::db::{comments, posts, users};
use crate::error::AppError;
use crate::extractors::{extract_form, extract_post_id};
use crate::session::{self, CsrfProtected};
use crate::state::AppState;
use crate::templates::{
    css_url, render, CommentView, FieldMessages, IndexTemplate, MakePostTemplate, PageContext,
    PostCard, PostTemplate,
};

/// Flashed when a create or edit would reuse another post's title.
pub const DUPLICATE_TITLE: &str = "A post with that title already exists.";

/// Flashed when an anonymous visitor submits a comment.
pub const LOGIN_TO_COMMENT: &str = "You need to login or register to comment.";

const LOGIN_TO_PUBLISH: &str = "Log in as the administrator to publish posts.";

/// GET /
pub async fn list_posts(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
) -> Result<Html<String>, AppError> {
    let posts = posts::list_all(&state.db).await?;
    let page = PageContext::load(&session, &identity, &state.config).await?;
    render(&IndexTemplate {
        page,
        posts: posts.into_iter().map(PostCard::from).collect(),
    })
}

/// GET /post/{post_id}
pub async fn show_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Html<String>, AppError> {
    let post = load_post(&state, extract_post_id(path)?).await?;
    render_post(
        &state,
        &session,
        &identity,
        post,
        CommentForm::default(),
        FieldMessages::default(),
    )
    .await
}

/// POST /post/{post_id}
///
/// Only signed-in users' comments are stored. Anonymous submissions get a
/// flash asking them to log in and the page is shown again unchanged. The
/// CSRF token is checked once a comment is about to be written.
pub async fn comment_on_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    path: Result<Path<i64>, PathRejection>,
    form: Result<Form<CsrfProtected<CommentForm>>, FormRejection>,
) -> Result<Html<String>, AppError> {
    let post = load_post(&state, extract_post_id(path)?).await?;
    let CsrfProtected {
        csrf_token,
        data: input,
    } = extract_form(form)?;

    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            return render_post(&state, &session, &identity, post, input, errors.into()).await
        }
    };

    let Some(user) = identity.user() else {
        tracing::info!(post_id = post.id, "anonymous comment refused");
        session::flash(&session, LOGIN_TO_COMMENT).await?;
        return render_post(
            &state,
            &session,
            &identity,
            post,
            input,
            FieldMessages::default(),
        )
        .await;
    };
    session::verify_csrf(&session, &state.config, &csrf_token).await?;

    let comment = NewComment {
        body: draft.body,
        time: today(),
        user_id: user.id,
        post_id: post.id,
    };
    let mut tx = state.db.begin().await?;
    let comment_id = comments::insert(&mut tx, &comment).await?;
    tx.commit().await?;
    tracing::info!(comment_id, post_id = post.id, user_id = user.id, "comment added");

    render_post(
        &state,
        &session,
        &identity,
        post,
        CommentForm::default(),
        FieldMessages::default(),
    )
    .await
}

/// GET /new-post
pub async fn new_post_form(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
) -> Result<Html<String>, AppError> {
    render_editor(
        &state,
        &session,
        &identity,
        None,
        CreatePostForm::default(),
        FieldMessages::default(),
    )
    .await
}

/// POST /new-post
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    form: Result<Form<CsrfProtected<CreatePostForm>>, FormRejection>,
) -> Result<Response, AppError> {
    let input = extract_form(form)?
        .verified(&session, &state.config)
        .await?;
    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(
                render_editor(&state, &session, &identity, None, input, errors.into())
                    .await?
                    .into_response(),
            )
        }
    };
    let author = publishing_author(&identity)?;

    if posts::title_taken(&state.db, &draft.title, None).await? {
        session::flash(&session, DUPLICATE_TITLE).await?;
        return Ok(render_editor(
            &state,
            &session,
            &identity,
            None,
            input,
            FieldMessages::default(),
        )
        .await?
        .into_response());
    }

    let PostDraft {
        title,
        subtitle,
        img_url,
        body,
    } = draft;
    let new_post = NewPost {
        title,
        subtitle,
        date: today(),
        body,
        img_url,
        user_id: author.id,
    };
    let mut tx = state.db.begin().await?;
    let post_id = posts::insert(&mut tx, &new_post).await?;
    tx.commit().await?;
    tracing::info!(post_id, user_id = author.id, title = %new_post.title, "post created");

    Ok(Redirect::to("/").into_response())
}

/// GET /edit-post/{post_id}
pub async fn edit_post_form(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Html<String>, AppError> {
    let post = load_post(&state, extract_post_id(path)?).await?;
    render_editor(
        &state,
        &session,
        &identity,
        Some(post.id),
        CreatePostForm::from(&post),
        FieldMessages::default(),
    )
    .await
}

/// POST /edit-post/{post_id}
///
/// Overwrites title, subtitle, image and body, and makes the editor the
/// author. The publish date is left unchanged.
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    path: Result<Path<i64>, PathRejection>,
    form: Result<Form<CsrfProtected<CreatePostForm>>, FormRejection>,
) -> Result<Response, AppError> {
    let post = load_post(&state, extract_post_id(path)?).await?;
    let input = extract_form(form)?
        .verified(&session, &state.config)
        .await?;
    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(render_editor(
                &state,
                &session,
                &identity,
                Some(post.id),
                input,
                errors.into(),
            )
            .await?
            .into_response())
        }
    };
    let author = publishing_author(&identity)?;

    if posts::title_taken(&state.db, &draft.title, Some(post.id)).await? {
        session::flash(&session, DUPLICATE_TITLE).await?;
        return Ok(render_editor(
            &state,
            &session,
            &identity,
            Some(post.id),
            input,
            FieldMessages::default(),
        )
        .await?
        .into_response());
    }

    let update = PostUpdate {
        title: draft.title,
        subtitle: draft.subtitle,
        body: draft.body,
        img_url: draft.img_url,
        user_id: author.id,
    };
    let mut tx = state.db.begin().await?;
    if !posts::update(&mut tx, post.id, &update).await? {
        return Err(not_found(post.id));
    }
    tx.commit().await?;
    tracing::info!(post_id = post.id, user_id = author.id, "post updated");

    Ok(Redirect::to(&format!("/post/{}", post.id)).into_response())
}

/// GET /delete/{post_id}
///
/// Removes the post and its comments in one transaction.
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Redirect, AppError> {
    let post_id = extract_post_id(path)?;
    tracing::warn!(post_id, caller = %identity, "post deletion requested");

    let mut tx = state.db.begin().await?;
    let removed_comments = comments::delete_by_post(&mut tx, post_id).await?;
    if !posts::delete(&mut tx, post_id).await? {
        return Err(not_found(post_id));
    }
    tx.commit().await?;
    tracing::warn!(post_id, removed_comments, caller = %identity, "post deleted");

    Ok(Redirect::to("/"))
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn not_found(post_id: i64) -> AppError {
    AppError::NotFound(format!("No post with id {post_id}."))
}

async fn load_post(state: &AppState, post_id: i64) -> Result<Post, AppError> {
    posts::get_by_id(&state.db, post_id)
        .await?
        .ok_or_else(|| not_found(post_id))
}

/// The signed-in user a new or edited post is attributed to.
///
/// Anonymous callers can reach the editor under the legacy admin gate but
/// cannot publish.
fn publishing_author(identity: &Identity) -> Result<&User, AppError> {
    identity.user().ok_or_else(|| {
        tracing::warn!("anonymous post submission refused");
        AppError::Unauthorized(LOGIN_TO_PUBLISH.to_string())
    })
}

async fn render_post(
    state: &AppState,
    session: &Session,
    identity: &Identity,
    post: Post,
    form: CommentForm,
    errors: FieldMessages,
) -> Result<Html<String>, AppError> {
    let author = users::get_by_id(&state.db, post.user_id)
        .await?
        .map(|u| u.name)
        .unwrap_or_default();
    let comments = comments::find_comments_by_post(&state.db, post.id)
        .await?
        .into_iter()
        .map(CommentView::from)
        .collect();
    // Anonymous readers get no token; their comments are never stored.
    let page = if identity.is_authenticated() {
        PageContext::for_form(session, identity, &state.config).await?
    } else {
        PageContext::load(session, identity, &state.config).await?
    };
    render(&PostTemplate {
        page,
        header_image: css_url(&post.img_url),
        post,
        author,
        comments,
        form,
        errors,
    })
}

async fn render_editor(
    state: &AppState,
    session: &Session,
    identity: &Identity,
    editing: Option<i64>,
    form: CreatePostForm,
    errors: FieldMessages,
) -> Result<Html<String>, AppError> {
    let page = PageContext::for_form(session, identity, &state.config).await?;
    let action = match editing {
        Some(id) => format!("/edit-post/{id}"),
        None => "/new-post".to_string(),
    };
    render(&MakePostTemplate {
        page,
        is_edit: editing.is_some(),
        action,
        form,
        errors,
    })
}
