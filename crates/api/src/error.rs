//! API error handling and response types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use momenarr_core::MomenarrError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("core error: {0}")]
    Core(#[from] MomenarrError),

    #[error("bad request: {message}")]
    BadRequest { message: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Core(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::BadRequest { message } => (StatusCode::BAD_REQUEST, message.clone()),
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "code": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}
