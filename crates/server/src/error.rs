use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    NotFound(String),

    #[error("You are not permitted to access this resource")]
    Unauthorized,

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = core::result::Result<T, ChatError>;

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::Unauthorized => StatusCode::FORBIDDEN,
            ChatError::AlreadyExists(_) => StatusCode::CONFLICT,
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::Store(_) | ChatError::Json(_) | ChatError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}
