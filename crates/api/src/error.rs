use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pushgate_services::auth::AuthError;
use pushgate_services::gateway::GatewayError;
use pushgate_services::store::StoreError;
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            // The HTTP contract promises 400 on malformed subscribe bodies.
            GatewayError::Validation(msg) => ApiError::BadRequest(msg),
            GatewayError::UnknownSubject(subject) => {
                ApiError::BadRequest(format!("Unknown subject: {subject}"))
            }
            GatewayError::Store(StoreError::Validation(msg)) => ApiError::BadRequest(msg),
            GatewayError::Store(e) => ApiError::Internal(e.to_string()),
            GatewayError::Delivery(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}
