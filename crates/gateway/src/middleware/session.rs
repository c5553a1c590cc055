//! Session cookie handling

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use campusdesk_common::{
    auth::{require_role, Role, Session},
    config::AuthConfig,
    errors::{AppError, Result},
};

use crate::AppState;

/// The session resolved from the request cookie, if any
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    /// Cookie value as sent by the browser
    pub id: Option<String>,
    pub session: Option<Session>,
}

impl CurrentSession {
    pub fn require(&self, role: Role) -> Result<&Session> {
        require_role(self.session.as_ref(), role)
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let id = session_cookie(&parts.headers, &state.config.auth.cookie_name);

        let session = match &id {
            Some(id) => state.sessions.load(id).await?,
            None => None,
        };

        Ok(Self { id, session })
    }
}

/// Read a cookie value from every `Cookie` header
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn cookie_header(config: &AuthConfig, value: &str, max_age: i64) -> Result<HeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name, value, max_age
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal {
        message: format!("Invalid session cookie: {}", e),
    })
}

/// `Set-Cookie` value for a new session
pub fn set_cookie(config: &AuthConfig, id: &str, max_age: i64) -> Result<HeaderValue> {
    cookie_header(config, id, max_age)
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_cookie(config: &AuthConfig) -> Result<HeaderValue> {
    cookie_header(config, "", 0)
}
