//! Authentication Middleware
//! Protects API endpoints with bearer-token validation

use crate::api::error::detail_response;
use crate::auth::jwt::JwtHandler;
use crate::middleware::RequestUser;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

/// Validates the `Authorization: Bearer` header and stores the claims in the
/// request extensions for handlers to pick up with `Extension<Claims>`.
/// The username is echoed onto the response for the access log.
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?;

    let claims = jwt_handler.validate_token(token).map_err(|e| {
        debug!("Rejected token: {:#}", e);
        AuthError::InvalidToken
    })?;

    let user = RequestUser(claims.sub.clone());
    req.extensions_mut().insert(claims);

    let mut response = next.run(req).await;
    response.extensions_mut().insert(user);
    Ok(response)
}

/// Auth error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidFormat,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Not authenticated",
            AuthError::InvalidFormat => "Invalid authorization format. Use: Bearer {token}",
            AuthError::InvalidToken => "Invalid token",
        };

        let mut response = detail_response(StatusCode::UNAUTHORIZED, message);
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            header::HeaderValue::from_static("Bearer"),
        );
        response
    }
}
