//! Error types for the API client.

/// Errors that can occur when making LegiScan API requests.
///
/// Transport failures, non-2xx statuses, and application-level errors
/// declared inside a 2xx envelope are kept distinct so callers can tell
/// "no data" apart from "request failed".
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request never produced a response (connect failure, timeout, body read).
    #[error("request failed: {0}")]
    Transport(String),
    /// The API returned a non-success HTTP status with a body snippet.
    #[error("request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The envelope carried `"status": "ERROR"`.
    #[error("LegiScan API error: {message}")]
    Api { message: String },
    /// A success response whose body did not match the expected shape.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl Error {
    /// HTTP status code, when the failure was a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
