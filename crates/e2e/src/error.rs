//! Error types for contract runs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Request to {url} returned HTTP {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Request to {url} returned content type '{content_type}', expected application/json")]
    UnexpectedContentType { url: String, content_type: String },

    #[error("Defect tracker error: {0}")]
    Tracker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Contract file {path}: {reason}")]
    ContractFile { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Common(#[from] routewatch_common::Error),
}

impl E2eError {
    /// True when the server could not be reached or answered with something
    /// other than the expected document. Such runs say nothing about the
    /// contract itself.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            E2eError::Http(_)
                | E2eError::UnexpectedStatus { .. }
                | E2eError::UnexpectedContentType { .. }
        )
    }

    /// True for 401/403 answers
    pub fn is_auth_failure(&self) -> bool {
        match self {
            E2eError::UnexpectedStatus { status, .. } => *status == 401 || *status == 403,
            E2eError::Http(e) => e
                .status()
                .map(|s| s.as_u16() == 401 || s.as_u16() == 403)
                .unwrap_or(false),
            _ => false,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
