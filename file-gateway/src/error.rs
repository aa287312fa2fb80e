use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::storage::StorageError;

/// Failure of a single request, converted to a response at the handler boundary
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        message: String,
        error: Option<String>,
    },

    #[error("{message}: {source}")]
    Storage {
        message: String,
        #[source]
        source: StorageError,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            error: None,
        }
    }

    pub fn storage(message: impl Into<String>, source: StorageError) -> Self {
        ApiError::Storage {
            message: message.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::BadRequest { message, error } => ErrorResponse { message, error },
            // Store errors are relayed verbatim
            ApiError::Storage { message, source } => ErrorResponse {
                message,
                error: Some(source.to_string()),
            },
        };

        (status, Json(body)).into_response()
    }
}
