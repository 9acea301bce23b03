//! # quill-web — Axum Application for the Quill Blog
//!
//! Server-rendered blog pages backed by a SQL database. Visitors read posts,
//! registered users comment, and the administrator (user id 1) writes,
//! edits and deletes posts.
//!
//! ## Routes
//!
//! | Path                     | Module                 | Access                       |
//! |--------------------------|------------------------|------------------------------|
//! | `/`                      | [`routes::posts`]      | anyone                       |
//! | `/post/{post_id}`        | [`routes::posts`]      | anyone, comments need login  |
//! | `/new-post`              | [`routes::posts`]      | [`auth::admin_gate`]         |
//! | `/edit-post/{post_id}`   | [`routes::posts`]      | [`auth::admin_gate`]         |
//! | `/delete/{post_id}`      | [`routes::posts`]      | anyone (logged at WARN)      |
//! | `/register`, `/login`, `/logout` | [`routes::accounts`] | anyone               |
//! | `/about`, `/contact`     | [`routes::pages`]      | anyone                       |
//! | `/health/*`, `/metrics`  | this module            | anyone, no session           |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → SecurityHeaders → SessionManager → AdminGate → Handler
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod templates;

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::db::sessions::SqlSessionStore;
use crate::error::AppError;
use crate::middleware::metrics::BlogMetrics;
use crate::routes::{accounts, pages, posts};
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health ops and `/metrics` are mounted outside the session layer so
/// scrapers never create sessions.
pub fn app(state: AppState) -> Router {
    let metrics = BlogMetrics::new();
    let metrics_on = state.config.metrics_enabled;

    let sessions = SessionManagerLayer::new(SqlSessionStore::new(state.db.clone()))
        .with_name(session::SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(state.config.secure_cookies)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            state.config.session_idle_hours,
        )))
        .with_signed(session::signing_key(&state.config));

    let admin = Router::new()
        .route(
            "/new-post",
            get(posts::new_post_form).post(posts::create_post),
        )
        .route(
            "/edit-post/{post_id}",
            get(posts::edit_post_form).post(posts::update_post),
        )
        .route_layer(from_fn_with_state(state.clone(), auth::admin_gate));

    let site = Router::new()
        .route("/", get(posts::list_posts))
        .route(
            "/post/{post_id}",
            get(posts::show_post).post(posts::comment_on_post),
        )
        .route("/delete/{post_id}", get(posts::delete_post))
        .route(
            "/register",
            get(accounts::register_form).post(accounts::register),
        )
        .route("/login", get(accounts::login_form).post(accounts::login))
        .route("/logout", get(accounts::logout))
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact))
        .merge(admin)
        .fallback(page_not_found)
        .layer(sessions);

    let mut ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));
    if metrics_on {
        ops = ops.route("/metrics", get(prometheus_metrics));
    }

    let mut router = Router::new()
        .merge(ops)
        .merge(site)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    if metrics_on {
        router = router
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics));
    }

    router
        .layer(middleware::tracing_layer::layer())
        .with_state(state)
}

/// GET /health/liveness — the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// GET /health/readiness — the database answers queries.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match db::ping(&state.db).await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed: database unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}

/// GET /metrics — Prometheus scrape endpoint.
///
/// Refreshes the record gauges from the database on each scrape.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<BlogMetrics>,
) -> impl IntoResponse {
    let counts = tokio::try_join!(
        db::users::count(&state.db),
        db::posts::count(&state.db),
        db::comments::count(&state.db),
    );
    match counts {
        Ok((users, posts, comments)) => metrics.set_record_counts(users, posts, comments),
        Err(e) => tracing::warn!(error = %e, "could not refresh record gauges"),
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => AppError::Internal(e).into_response(),
    }
}

async fn page_not_found() -> AppError {
    AppError::NotFound("That page does not exist.".to_string())
}
