use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::RegisterForm,
        error::AuthError,
        password::{hash_password, verify_password},
        repo::{unique_violation, UniqueColumn},
        repo_types::{NewUser, User},
    },
    sessions::{now_unix, Session, SessionStore},
    state::AppState,
};

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Create a user account. The email must not be registered yet.
///
/// Email and password are stored as given apart from email normalisation;
/// only blank values are refused.
pub async fn register(db: &SqlitePool, form: RegisterForm) -> Result<User, AuthError> {
    let email = normalize_email(&form.email);

    if email.is_empty() || form.password.is_empty() {
        warn!("registration without email or password");
        return Err(AuthError::MissingFields);
    }

    // Ensure email is not taken
    if User::find_by_email(db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AuthError::DuplicateEmail);
    }

    let password_hash = hash_password(&form.password)?;
    let new_user = NewUser {
        first_name: non_empty(form.first_name),
        last_name: non_empty(form.last_name),
        username: non_empty(form.username),
        email,
        mobile: non_empty(form.mobile),
        password_hash,
    };

    match User::create(db, &new_user, now_unix()).await {
        Ok(user) => {
            info!(user_id = user.id, email = %user.email, "user registered");
            Ok(user)
        }
        Err(e) => match unique_violation(&e) {
            Some(UniqueColumn::Email) => {
                warn!(email = %new_user.email, "email registered concurrently");
                Err(AuthError::DuplicateEmail)
            }
            Some(UniqueColumn::Username) => {
                warn!(username = ?new_user.username, "username already taken");
                Err(AuthError::DuplicateUsername)
            }
            None => {
                error!(error = %e, "create user failed");
                Err(e.into())
            }
        },
    }
}

/// Check credentials and open a session for the user.
///
/// A session token already held by the caller is revoked first.
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    previous_token: Option<&str>,
) -> Result<(User, Session), AuthError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        warn!("login without email or password");
        return Err(AuthError::InvalidCredentials);
    }

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_password(password, &user.password)? {
        warn!(email = %email, user_id = user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    if let Some(token) = previous_token {
        state.sessions.delete(token).await?;
    }
    let session = state
        .sessions
        .create(user.id, state.config.session_ttl_seconds())
        .await?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok((user, session))
}

/// End the session identified by `token`.
pub async fn logout(sessions: &dyn SessionStore, token: Option<&str>) -> Result<(), AuthError> {
    let Some(token) = token else {
        return Err(AuthError::NotAuthenticated { next: None });
    };
    if !sessions.delete(token).await? {
        return Err(AuthError::NotAuthenticated { next: None });
    }
    info!("user logged out");
    Ok(())
}
