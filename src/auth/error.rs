use axum::{
    http::{header::SET_COOKIE, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::error;

use crate::{flash::Flash, views};

/// Failures surfaced to the user at the request boundary.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("username already taken")]
    DuplicateUsername,
    #[error("email and password are required")]
    MissingFields,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("not authenticated")]
    NotAuthenticated { next: Option<String> },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

impl AuthError {
    /// Message shown after the redirect, if this error is user-facing.
    pub fn flash(&self) -> Option<Flash> {
        match self {
            Self::DuplicateEmail => Some(Flash::EmailTaken),
            Self::DuplicateUsername => Some(Flash::UsernameTaken),
            Self::MissingFields => Some(Flash::MissingFields),
            Self::InvalidCredentials => Some(Flash::InvalidCredentials),
            Self::NotAuthenticated { .. } => Some(Flash::LoginRequired),
            Self::Internal(_) => None,
        }
    }

    /// Page the user is sent back to.
    pub fn redirect_target(&self) -> String {
        match self {
            Self::DuplicateEmail | Self::DuplicateUsername | Self::MissingFields => {
                "/register".into()
            }
            Self::InvalidCredentials | Self::Internal(_) => "/login".into(),
            Self::NotAuthenticated { next } => login_url(next.as_deref()),
        }
    }
}

/// `/login`, carrying a safe `next` path when there is one.
pub fn login_url(next: Option<&str>) -> String {
    match next.and_then(safe_next) {
        Some(path) => format!("/login?next={}", urlencoding::encode(path)),
        None => "/login".into(),
    }
}

/// Accept only local absolute paths as post-login targets.
///
/// The result is written verbatim into a `Location` header: no control bytes,
/// whitespace, backslashes, scheme or authority.
pub fn safe_next(next: &str) -> Option<&str> {
    if next
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || c == '\\')
    {
        return None;
    }
    if !next.starts_with('/') || next.starts_with("//") {
        return None;
    }
    let uri: Uri = next.parse().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }
    Some(next)
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!(error = %err, "request failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(views::error_page("Something went wrong. Please try again.")),
            )
                .into_response();
        }
        let target = self.redirect_target();
        match self.flash() {
            Some(flash) => ([(SET_COOKIE, flash.cookie())], Redirect::to(&target)).into_response(),
            None => Redirect::to(&target).into_response(),
        }
    }
}
