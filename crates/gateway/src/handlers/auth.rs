//! Login and logout handlers

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::home_for;
use crate::middleware::{clear_cookie, set_cookie, CurrentSession};
use crate::pages::{self, Flash};
use crate::AppState;
use campusdesk_common::{
    auth::Session,
    errors::{AppError, Result},
    metrics,
};

/// Login form; which fields are used depends on `login_type`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LoginForm {
    pub login_type: Option<String>,

    #[validate(length(max = 32))]
    pub serial_no: Option<String>,

    #[validate(length(max = 64))]
    pub roll_no: Option<String>,

    #[validate(length(max = 254))]
    pub email: Option<String>,

    #[validate(length(max = 1024))]
    pub password: Option<String>,
}

/// `GET /`
pub async fn index() -> Redirect {
    Redirect::to("/login")
}

/// `GET /login`
pub async fn login_page(current: CurrentSession) -> Response {
    match &current.session {
        Some(session) => Redirect::to(home_for(session.role)).into_response(),
        None => Html(pages::login_page(None)).into_response(),
    }
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    current: CurrentSession,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let login_type = match form.login_type.as_deref() {
        Some(kind @ ("student" | "admin")) => kind,
        _ => "unknown",
    };

    match authenticate(&state, &form).await {
        Ok(session) => {
            // A fresh login never reuses the previous session id
            state.sessions.destroy(current.id.as_deref()).await?;
            let id = state.sessions.create(&session).await?;
            let cookie = set_cookie(&state.config.auth, &id, state.sessions.ttl_secs())?;

            metrics::record_login(session.role.as_str(), true);
            info!(role = session.role.as_str(), user_id = session.user_id, "Login successful");

            Ok((
                [(header::SET_COOKIE, cookie)],
                Redirect::to(home_for(session.role)),
            )
                .into_response())
        }
        Err(err) if err.is_client_error() => {
            err.log();
            metrics::record_login(login_type, false);

            let flash = Flash::error(err.public_message());
            Ok((err.status_code(), Html(pages::login_page(Some(&flash)))).into_response())
        }
        Err(err) => Err(err),
    }
}

async fn authenticate(state: &AppState, form: &LoginForm) -> Result<Session> {
    form.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let field = |value: &Option<String>| value.clone().unwrap_or_default();

    match form.login_type.as_deref() {
        Some("student") => {
            state
                .gate
                .authenticate_student(&field(&form.serial_no), &field(&form.roll_no))
                .await
        }
        Some("admin") => {
            state
                .gate
                .authenticate_admin(&field(&form.email), &field(&form.password))
                .await
        }
        _ => Err(AppError::validation("login_type", "Invalid login type")),
    }
}

/// `GET /logout`
pub async fn logout(State(state): State<AppState>, current: CurrentSession) -> Result<Response> {
    state.sessions.destroy(current.id.as_deref()).await?;

    if let Some(session) = &current.session {
        info!(role = session.role.as_str(), user_id = session.user_id, "Logged out");
    }

    let cookie = clear_cookie(&state.config.auth)?;
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/login")).into_response())
}
