use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};

use crate::{App, error::AppError};

/// Username of the caller as forwarded by the gateway. Authentication happens
/// upstream; this only requires the header to be present and non-empty.
pub struct AuthUser(pub String);

impl FromRequestParts<App> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let header = state.config.identity_header.as_str();

        let username = parts
            .headers
            .get(header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|username| !username.is_empty());

        match username {
            Some(username) => Ok(AuthUser(username.to_owned())),
            None => {
                tracing::debug!(header, "Rejected request without identity");
                Err(AppError::Client {
                    status: StatusCode::UNAUTHORIZED,
                    code: "UNAUTHORIZED",
                    msg: format!("Missing `{header}` header"),
                })
            }
        }
    }
}
