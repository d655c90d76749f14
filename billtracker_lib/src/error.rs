//! Error types for the library layer.

use std::fmt;

use crate::db::DbError;

/// Errors produced by the library layer, wrapping upstream API errors
/// and adding serialization, storage, and input validation failures.
#[derive(Debug)]
pub enum BillTrackerError {
    /// An error from the underlying LegiScan client.
    Api(legiscan_api::Error),
    /// JSON serialization or deserialization failed.
    Serialization(serde_json::Error),
    /// A storage operation failed.
    Storage(DbError),
    /// User-provided input failed validation.
    InvalidInput(String),
    /// Required configuration is missing or malformed.
    Config(String),
}

impl fmt::Display for BillTrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "API error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for BillTrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<legiscan_api::Error> for BillTrackerError {
    fn from(e: legiscan_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<serde_json::Error> for BillTrackerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<DbError> for BillTrackerError {
    fn from(e: DbError) -> Self {
        Self::Storage(e)
    }
}
