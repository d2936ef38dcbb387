use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unsupported chain")]
    UnsupportedChain(String),

    #[error("No healthy RPC endpoint for chain {0}")]
    NoHealthyEndpoint(String),

    #[error("Transaction not found")]
    TransactionNotFound,

    #[error("{0}")]
    MissingInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Blockchain RPC error: {0}")]
    BlockchainRPC(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::UnsupportedChain(ref chain) => (
                StatusCode::BAD_REQUEST,
                format!("Unsupported chain: {}", chain),
            ),
            AppError::NoHealthyEndpoint(ref chain) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("No healthy RPC endpoint for chain {}", chain),
            ),
            // The diagnose handler turns this into a data result before it can
            // reach here; any other pipeline leaking it reports plainly.
            AppError::TransactionNotFound => {
                (StatusCode::NOT_FOUND, "Transaction not found".to_string())
            }
            AppError::MissingInput(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BlockchainRPC(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
