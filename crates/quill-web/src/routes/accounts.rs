//! Account handlers: registration, login and logout.

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use quill_core::{Identity, LoginForm, NewUser, RegisterForm, User, Validate};
use tower_sessions::Session;

use crate::auth::{self, CurrentUser};
use crate::db::users;
use crate::error::AppError;
use crate::extractors::extract_form;
use crate::session::{self, CsrfProtected};
use crate::state::AppState;
use crate::templates::{render, FieldMessages, LoginTemplate, PageContext, RegisterTemplate};

/// Flashed when registering with an email that already has an account.
pub const EMAIL_TAKEN: &str = "The email is existed";

/// Flashed when logging in with an email that has no account.
pub const UNKNOWN_EMAIL: &str = "The email does not exist.";

/// Flashed when the password does not match.
pub const WRONG_PASSWORD: &str = "Incorrect Password";

/// GET /register
pub async fn register_form(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
) -> Result<Html<String>, AppError> {
    render_register(
        &state,
        &session,
        &identity,
        RegisterForm::default(),
        FieldMessages::default(),
    )
    .await
}

/// POST /register
///
/// Creates the account and signs it in. The first account ever registered
/// gets id 1 and is therefore the administrator.
pub async fn register(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    form: Result<Form<CsrfProtected<RegisterForm>>, FormRejection>,
) -> Result<Response, AppError> {
    let input = extract_form(form)?
        .verified(&session, &state.config)
        .await?;
    let registration = match input.validate() {
        Ok(registration) => registration,
        Err(errors) => {
            return Ok(
                render_register(&state, &session, &identity, input, errors.into())
                    .await?
                    .into_response(),
            )
        }
    };

    if users::email_exists(&state.db, &registration.email).await? {
        tracing::info!("registration refused: email already registered");
        session::flash(&session, EMAIL_TAKEN).await?;
        return Ok(render_register(
            &state,
            &session,
            &identity,
            input,
            FieldMessages::default(),
        )
        .await?
        .into_response());
    }

    let password_hash = auth::hash_password(state.hasher, registration.password).await?;
    let new_user = NewUser {
        name: registration.name,
        email: registration.email,
        password_hash,
    };
    let mut tx = state.db.begin().await?;
    let id = users::insert(&mut tx, &new_user).await?;
    tx.commit().await?;
    tracing::info!(user_id = id, "user registered");

    let user = User {
        id,
        email: new_user.email,
        password_hash: new_user.password_hash,
        name: new_user.name,
    };
    auth::login(&session, &user).await?;

    Ok(Redirect::to("/").into_response())
}

/// GET /login
pub async fn login_form(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
) -> Result<Html<String>, AppError> {
    render_login(
        &state,
        &session,
        &identity,
        LoginForm::default(),
        FieldMessages::default(),
    )
    .await
}

/// POST /login
///
/// Unknown emails and wrong passwords re-render the form with a flash and
/// leave the session anonymous.
pub async fn login(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    form: Result<Form<CsrfProtected<LoginForm>>, FormRejection>,
) -> Result<Response, AppError> {
    let input = extract_form(form)?
        .verified(&session, &state.config)
        .await?;
    let credentials = match input.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            return Ok(
                render_login(&state, &session, &identity, input, errors.into())
                    .await?
                    .into_response(),
            )
        }
    };

    let Some(user) = users::find_by_email(&state.db, &credentials.email).await? else {
        tracing::info!("login failed: unknown email");
        session::flash(&session, UNKNOWN_EMAIL).await?;
        return Ok(render_login(
            &state,
            &session,
            &identity,
            input,
            FieldMessages::default(),
        )
        .await?
        .into_response());
    };

    if !auth::check_password(user.password_hash.clone(), credentials.password).await? {
        tracing::info!(user_id = user.id, "login failed: wrong password");
        session::flash(&session, WRONG_PASSWORD).await?;
        return Ok(render_login(
            &state,
            &session,
            &identity,
            input,
            FieldMessages::default(),
        )
        .await?
        .into_response());
    }

    auth::login(&session, &user).await?;
    Ok(Redirect::to("/").into_response())
}

/// GET /logout
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    auth::logout(&session).await?;
    Ok(Redirect::to("/"))
}

async fn render_register(
    state: &AppState,
    session: &Session,
    identity: &Identity,
    mut form: RegisterForm,
    errors: FieldMessages,
) -> Result<Html<String>, AppError> {
    form.password.clear();
    form.password2.clear();
    let page = PageContext::for_form(session, identity, &state.config).await?;
    render(&RegisterTemplate { page, form, errors })
}

async fn render_login(
    state: &AppState,
    session: &Session,
    identity: &Identity,
    mut form: LoginForm,
    errors: FieldMessages,
) -> Result<Html<String>, AppError> {
    form.password.clear();
    let page = PageContext::for_form(session, identity, &state.config).await?;
    render(&LoginTemplate { page, form, errors })
}
