use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use super::{error::AuthError, repo_types::User};
use crate::{
    sessions::{session_token, SessionStore},
    state::AppState,
};

/// Whether the request carries a live session.
#[derive(Debug, Clone)]
pub enum SessionState {
    Anonymous,
    Authenticated { user: User, token: String },
}

impl SessionState {
    pub async fn resolve(state: &AppState, token: Option<String>) -> Result<Self, AuthError> {
        let Some(token) = token else {
            return Ok(Self::Anonymous);
        };
        let Some(session) = state.sessions.lookup(&token).await? else {
            debug!("unknown or expired session cookie");
            return Ok(Self::Anonymous);
        };
        match User::find_by_id(&state.db, session.user_id).await? {
            Some(user) => Ok(Self::Authenticated { user, token }),
            None => {
                // The session outlived its user row.
                state.sessions.delete(&token).await?;
                Ok(Self::Anonymous)
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { token, .. } => Some(token),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionState {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        SessionState::resolve(state, session_token(&parts.headers)).await
    }
}

/// The authenticated user; anonymous requests are sent to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match SessionState::from_request_parts(parts, state).await? {
            SessionState::Authenticated { user, token } => Ok(CurrentUser { user, token }),
            SessionState::Anonymous => {
                debug!(path = %parts.uri.path(), "gated page requested anonymously");
                Err(AuthError::NotAuthenticated {
                    next: Some(parts.uri.path().to_string()),
                })
            }
        }
    }
}
