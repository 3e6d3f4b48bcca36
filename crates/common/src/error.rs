//! Error types for routewatch

use thiserror::Error;

use crate::verify::ContractReport;

/// Result type alias using routewatch Error
pub type Result<T> = std::result::Result<T, Error>;

/// routewatch error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed discovery payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Malformed ping payload: {0}")]
    MalformedPing(String),

    #[error("Endpoint contract violated:\n{0}")]
    ContractViolation(Box<ContractReport>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
