use crate::beneficiaries::BeneficiaryError;
use crate::config::ConfigError;
use crate::contracts::ContractError;
use crate::receipts::{ImportError, ReceiptError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error enumeration shared by every repository implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Top-level failure surfaced by the binary and the offline commands.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("import error: {0}")]
    Import(#[from] ImportError),
    #[error("beneficiary error: {0}")]
    Beneficiary(#[from] BeneficiaryError),
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
    #[error("receipt error: {0}")]
    Receipt(#[from] ReceiptError),
    #[error("invalid input: {0}")]
    Input(#[from] serde_json::Error),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Import(_) | AppError::Input(_) => StatusCode::BAD_REQUEST,
            AppError::Beneficiary(ref err) => err.status(),
            AppError::Contract(ref err) => err.status(),
            AppError::Receipt(ref err) => err.status(),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_errors_keep_their_status() {
        let conflict = AppError::from(ReceiptError::AlreadyVoided(4)).into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing = AppError::from(ContractError::NotFound).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let config = AppError::from(ConfigError::InvalidPort).into_response();
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
