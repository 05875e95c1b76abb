//! Authentication API Endpoints
//! Registration, token issuance and the current-user lookup

use crate::api::error::detail_response;
use crate::auth::{
    jwt::JwtHandler,
    models::{Claims, CredentialsForm, MeResponse, TokenResponse},
};
use crate::models::MessageResponse;
use crate::store::{Store, StoreError};
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub store: Arc<Store>,
    pub jwt_handler: Arc<JwtHandler>,
}

fn check_credential_lengths(form: &CredentialsForm) -> Result<(), AuthApiError> {
    if form.username.chars().count() < MIN_USERNAME_LEN {
        return Err(AuthApiError::UsernameTooShort);
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthApiError::PasswordTooShort);
    }
    Ok(())
}

/// Register endpoint - POST /register
pub async fn register(
    State(state): State<AuthState>,
    payload: Result<Form<CredentialsForm>, FormRejection>,
) -> Result<Json<MessageResponse>, AuthApiError> {
    let Form(form) = payload?;
    if state.store.get_user_by_username(&form.username)?.is_some() {
        return Err(AuthApiError::UserAlreadyExists);
    }
    check_credential_lengths(&form)?;

    state.store.create_user(&form.username, &form.password)?;
    info!("Registered user {}", form.username);

    Ok(Json(MessageResponse::new("User registered successfully!")))
}

/// Login endpoint - POST /token
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Form<CredentialsForm>, FormRejection>,
) -> Result<Json<TokenResponse>, AuthApiError> {
    let Form(form) = payload?;
    check_credential_lengths(&form)?;

    let Some(user) = state.store.authenticate(&form.username, &form.password)? else {
        warn!("Failed login attempt: {}", form.username);
        return Err(AuthApiError::InvalidCredentials);
    };

    let token = state
        .jwt_handler
        .generate_token(&user.username)
        .map_err(|e| {
            error!("Failed to issue token: {:#}", e);
            AuthApiError::InternalError
        })?;

    info!("Login successful: {}", user.username);
    Ok(Json(TokenResponse::bearer(token)))
}

/// Current user - GET /me (token only, no database lookup)
pub async fn me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    Json(MeResponse {
        username: claims.sub,
    })
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    MalformedForm(String),
    InvalidCredentials,
    UserAlreadyExists,
    UsernameTooShort,
    PasswordTooShort,
    InternalError,
}

impl From<StoreError> for AuthApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UserAlreadyExists(_) => AuthApiError::UserAlreadyExists,
            other => {
                error!("Auth store error: {}", other);
                AuthApiError::InternalError
            }
        }
    }
}

impl From<FormRejection> for AuthApiError {
    fn from(rejection: FormRejection) -> Self {
        AuthApiError::MalformedForm(rejection.body_text())
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::MalformedForm(msg) => {
                return detail_response(StatusCode::UNPROCESSABLE_ENTITY, msg);
            }
            AuthApiError::InvalidCredentials => (StatusCode::BAD_REQUEST, "Invalid credentials!"),
            AuthApiError::UserAlreadyExists => (
                StatusCode::BAD_REQUEST,
                "User already exists with this username!",
            ),
            AuthApiError::UsernameTooShort => (
                StatusCode::BAD_REQUEST,
                "Username must be at least 3 characters long!",
            ),
            AuthApiError::PasswordTooShort => (
                StatusCode::BAD_REQUEST,
                "Password must be at least 6 characters long!",
            ),
            AuthApiError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        detail_response(status, message)
    }
}
