//! HTTP handlers module

pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;

use axum::response::{IntoResponse, Redirect, Response};
use campusdesk_common::{
    auth::{Role, Session},
    errors::AppError,
};

use crate::middleware::CurrentSession;

/// Failure of a server-rendered page
///
/// Pages send visitors without the right session back to the login form;
/// anything else renders as the JSON error body.
#[derive(Debug)]
pub enum PageError {
    Login,
    App(AppError),
}

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Unauthorized { .. } => PageError::Login,
            other => PageError::App(other),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Login => Redirect::to("/login").into_response(),
            PageError::App(err) => err.into_response(),
        }
    }
}

/// Landing page for a role after login
pub fn home_for(role: Role) -> &'static str {
    match role {
        Role::Student => "/chat",
        Role::Admin => "/admin/dashboard",
    }
}

pub(crate) fn require_page(current: &CurrentSession, role: Role) -> Result<&Session, PageError> {
    current.require(role).map_err(PageError::from)
}
