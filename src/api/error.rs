use crate::settlement::SettlementError;
use crate::store::StoreError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

/// JSON error body: `{"detail": "<message>"}`.
pub fn detail_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(json!({ "detail": message.into() }));
    (status, body).into_response()
}

#[derive(Debug)]
pub enum ApiError {
    /// Body could not be parsed into the expected request type.
    MalformedBody(String),
    Validation(SettlementError),
    UserNotFound,
    GameNotFound,
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Settlement(e) => ApiError::Validation(e),
            StoreError::UserNotFound => ApiError::UserNotFound,
            StoreError::GameNotFound(_) => ApiError::GameNotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MalformedBody(msg) => {
                detail_response(StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            ApiError::Validation(e) => detail_response(StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::UserNotFound => detail_response(StatusCode::NOT_FOUND, "User not found"),
            ApiError::GameNotFound => detail_response(StatusCode::NOT_FOUND, "Game not found"),
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {}", err);
                detail_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}
