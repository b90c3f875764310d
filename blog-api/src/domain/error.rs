use std::time::Duration;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("post not found: {0}")]
    PostNotFound(i32),
    #[error("user not found: {0}")]
    UserNotFound(i32),
    #[error("route not found: {0}")]
    RouteNotFound(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            DomainError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DomainError::PostNotFound(_)
            | DomainError::UserNotFound(_)
            | DomainError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            DomainError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            // A constraint violation is a store failure like any other.
            DomainError::EmailTaken(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            DomainError::Internal(cause) => {
                error!(error = %cause, "internal error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };
        let details = match self {
            DomainError::PostNotFound(id) => Some(json!({ "resource": "post", "id": id })),
            DomainError::UserNotFound(id) => Some(json!({ "resource": "user", "id": id })),
            DomainError::EmailTaken(email) => Some(json!({ "email": email })),
            _ => None,
        };
        let body = ErrorBody {
            error: message.as_str(),
            details,
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Internal(format!("database error: {}", err))
    }
}
