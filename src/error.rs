use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use zion_sdk::ErrorKind;

use crate::config::ConfigError;

/// Errors that stop the daemon from starting or serving.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("wallet error: {0}")]
    Wallet(#[from] zion_sdk::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// An HTTP error reply: `{"error": "...", "kind": "..."}`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: ErrorKind,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    /// The request body could not be turned into engine types.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidRequest, message)
    }
}

impl From<zion_sdk::Error> for ApiError {
    fn from(err: zion_sdk::Error) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::InvalidMarket
            | ErrorKind::AssetNotInMarket
            | ErrorKind::TradeTypeMismatch
            | ErrorKind::BadPricing
            | ErrorKind::MissingBlindingKey
            | ErrorKind::MalformedTransaction
            | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::InsufficientFunds | ErrorKind::Aborted => StatusCode::CONFLICT,
            ErrorKind::BroadcastFailed => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self::new(status, kind, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            kind: self.kind,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn engine_errors_map_to_status() {
        let bad = ApiError::from(zion_sdk::Error::BadPricing("off by one".into()));
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.kind, ErrorKind::BadPricing);

        let funds = ApiError::from(zion_sdk::Error::InsufficientFunds("empty".into()));
        assert_eq!(funds.status, StatusCode::CONFLICT);

        let gateway = ApiError::from(zion_sdk::Error::BroadcastFailed("rejected".into()));
        assert_eq!(gateway.status, StatusCode::BAD_GATEWAY);
        assert_eq!(gateway.message, "broadcast failed: rejected");

        let internal = ApiError::from(zion_sdk::Error::MutexPoisoned);
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.kind, ErrorKind::Internal);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::invalid_request("bad hex").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad hex","kind":"invalid_request"}"#);
    }
}
