use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use macrocoach_db::StoreError;
use macrocoach_model::profile::ValidationError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("sign in required")]
    Unauthorized,
    #[error("admin access required")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::Store(StoreError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Store(StoreError::InvalidTransition { .. } | StoreError::Duplicate(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = match self {
            // Internal details stay in the log
            ApiError::Store(StoreError::Database(_) | StoreError::Corrupt(_) | StoreError::MissingUrl) => {
                ErrorBody {
                    error: "internal server error".to_owned(),
                    field: None,
                }
            }
            ApiError::Validation(e) => ErrorBody {
                error: e.to_string(),
                field: Some(e.field()),
            },
            _ => ErrorBody {
                error: self.to_string(),
                field: None,
            },
        };
        HttpResponse::build(status).json(body)
    }
}
