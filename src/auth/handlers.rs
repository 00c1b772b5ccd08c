use axum::{
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use tracing::{debug, instrument};

use crate::{
    auth::{
        dto::{LoginForm, LoginQuery, RegisterForm},
        error::{safe_next, AuthError},
        extractors::{CurrentUser, SessionState},
        services,
    },
    flash::{self, Flash, IncomingFlash},
    sessions::{clear_session_cookie, session_cookie},
    state::AppState,
    views,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
}

pub fn home_routes() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// Render a page, consuming the flash cookie if one was shown.
fn page(flash: Option<Flash>, html: String) -> Response {
    match flash {
        Some(_) => ([(SET_COOKIE, flash::clear_cookie())], Html(html)).into_response(),
        None => Html(html).into_response(),
    }
}

fn redirect_with_flash(target: &str, flash: Flash) -> Response {
    ([(SET_COOKIE, flash.cookie())], Redirect::to(target)).into_response()
}

#[instrument(skip_all, fields(user_id = current.user.id))]
pub async fn index(current: CurrentUser, IncomingFlash(flash): IncomingFlash) -> Response {
    page(flash, views::index_page(&current.user, flash))
}

pub async fn register_form(IncomingFlash(flash): IncomingFlash) -> Response {
    page(flash, views::register_page(flash))
}

#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AuthError> {
    services::register(&state.db, form).await?;
    Ok(redirect_with_flash("/login", Flash::Registered))
}

pub async fn login_form(
    Query(query): Query<LoginQuery>,
    IncomingFlash(flash): IncomingFlash,
) -> Response {
    let next = query.next.as_deref().and_then(safe_next);
    page(flash, views::login_page(next, flash))
}

#[instrument(skip(state, current, form))]
pub async fn login(
    State(state): State<AppState>,
    current: SessionState,
    Form(form): Form<LoginForm>,
) -> Result<Response, AuthError> {
    if current.is_authenticated() {
        debug!("login over a live session, it will be replaced");
    }
    let (_user, session) =
        services::login(&state, &form.email, &form.password, current.token()).await?;

    let cookie = session_cookie(
        &session.token,
        state.config.session_ttl_seconds(),
        state.config.session.cookie_secure,
    )?;
    let target = form
        .next
        .as_deref()
        .and_then(safe_next)
        .unwrap_or("/")
        .to_string();

    Ok((
        AppendHeaders([
            (SET_COOKIE, cookie),
            (SET_COOKIE, Flash::LoggedIn.cookie()),
        ]),
        Redirect::to(&target),
    )
        .into_response())
}

#[instrument(skip_all, fields(user_id = current.user.id))]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AuthError> {
    services::logout(state.sessions.as_ref(), Some(&current.token)).await?;
    Ok((
        AppendHeaders([
            (SET_COOKIE, clear_session_cookie(state.config.session.cookie_secure)),
            (SET_COOKIE, Flash::LoggedOut.cookie()),
        ]),
        Redirect::to("/login"),
    )
        .into_response())
}
