use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use error::AuthError;
pub use extractors::{CurrentUser, SessionState};
pub use repo_types::User;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::home_routes())
        .merge(handlers::auth_routes())
}
