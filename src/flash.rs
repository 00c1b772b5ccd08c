//! One-shot messages carried across a redirect in a cookie.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderValue},
};

use crate::sessions::cookie_value;

pub const FLASH_COOKIE_NAME: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashCategory {
    Success,
    Error,
    Info,
}

impl FlashCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Registered,
    EmailTaken,
    UsernameTaken,
    MissingFields,
    InvalidCredentials,
    LoggedIn,
    LoggedOut,
    LoginRequired,
}

const ALL: [Flash; 8] = [
    Flash::Registered,
    Flash::EmailTaken,
    Flash::UsernameTaken,
    Flash::MissingFields,
    Flash::InvalidCredentials,
    Flash::LoggedIn,
    Flash::LoggedOut,
    Flash::LoginRequired,
];

impl Flash {
    pub fn code(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::EmailTaken => "email_taken",
            Self::UsernameTaken => "username_taken",
            Self::MissingFields => "missing_fields",
            Self::InvalidCredentials => "invalid_credentials",
            Self::LoggedIn => "logged_in",
            Self::LoggedOut => "logged_out",
            Self::LoginRequired => "login_required",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        ALL.into_iter().find(|f| f.code() == code)
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Registered => "Registration successful! Login now.",
            Self::EmailTaken => "Email already registered",
            Self::UsernameTaken => "Username already taken",
            Self::MissingFields => "Email and password are required",
            Self::InvalidCredentials => "Invalid login details",
            Self::LoggedIn => "Login successful!",
            Self::LoggedOut => "Logged out successfully",
            Self::LoginRequired => "Please log in to access this page.",
        }
    }

    pub fn category(self) -> FlashCategory {
        match self {
            Self::Registered | Self::LoggedIn | Self::LoggedOut => FlashCategory::Success,
            Self::LoginRequired => FlashCategory::Info,
            _ => FlashCategory::Error,
        }
    }

    /// `Set-Cookie` value that stores this message until the next page render.
    pub fn cookie(self) -> HeaderValue {
        // Codes are static ASCII identifiers.
        HeaderValue::from_str(&format!(
            "{FLASH_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax",
            self.code()
        ))
        .unwrap_or_else(|_| clear_cookie())
    }
}

pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// The flash message sent with this request, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncomingFlash(pub Option<Flash>);

#[async_trait]
impl<S> FromRequestParts<S> for IncomingFlash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let flash = cookie_value(&parts.headers, FLASH_COOKIE_NAME)
            .and_then(|code| Flash::from_code(&code));
        Ok(IncomingFlash(flash))
    }
}
