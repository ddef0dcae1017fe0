use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use openrouter_client::ClientError;
use serde::Serialize;
use summary_engine::EngineError;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("no recorded comparisons yet")]
    NoData,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Serialize)]
struct JsonError {
    message: String,
    r#type: String,
}

#[derive(Serialize)]
struct JsonErrorWrapper {
    error: JsonError,
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NoData => "no_data",
            AppError::Engine(EngineError::InvalidMetric(_)) => "invalid_metric",
            AppError::Engine(EngineError::Overflow(_)) => "overflow",
            AppError::Engine(_) => "storage_error",
            AppError::Client(_) => "upstream_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NoData => StatusCode::NOT_FOUND,
            AppError::Engine(EngineError::InvalidMetric(_)) => StatusCode::BAD_REQUEST,
            AppError::Engine(EngineError::Overflow(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            // Storage failures must read as retryable: the event was applied
            // all-or-nothing, so the caller can simply try again.
            AppError::Engine(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Client(ClientError::UnsupportedModel(_)) => StatusCode::BAD_REQUEST,
            AppError::Client(ClientError::Auth(_)) => StatusCode::BAD_REQUEST,
            AppError::Client(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_response = JsonErrorWrapper {
            error: JsonError {
                message: self.to_string(),
                r#type: self.kind().to_string(),
            },
        };
        HttpResponse::build(self.status_code()).json(error_response)
    }
}
