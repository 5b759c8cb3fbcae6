use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum TodoApiError {
    #[error("Authentication required")]
    Authentication,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal(String),
}

impl From<mongodb::error::Error> for TodoApiError {
    fn from(err: mongodb::error::Error) -> Self {
        TodoApiError::Persistence(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl ResponseError for TodoApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            TodoApiError::Authentication => StatusCode::UNAUTHORIZED,
            TodoApiError::Validation(_) => StatusCode::BAD_REQUEST,
            TodoApiError::NotFound => StatusCode::NOT_FOUND,
            TodoApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TodoApiError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TodoApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TodoApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_response = ErrorResponse {
            success: false,
            error: self.to_string(),
        };

        HttpResponse::build(status).json(error_response)
    }
}

pub type Result<T> = std::result::Result<T, TodoApiError>;
