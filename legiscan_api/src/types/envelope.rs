use serde::{Deserialize, Serialize};

/// Body-level error message attached to `"status": "ERROR"` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub message: Option<String>,
}

/// Outer shape shared by every LegiScan response.
///
/// The operation payload lives under an operation-specific key
/// (`sessions`, `masterlist`, `bill`, `text`) next to `status`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub status: String,
    #[serde(default)]
    pub alert: Option<Alert>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Envelope {
    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("ERROR")
    }

    /// Message from the alert block, if the API sent one.
    pub fn error_message(&self) -> String {
        self.alert
            .as_ref()
            .and_then(|a| a.message.clone())
            .unwrap_or_else(|| "API error".to_string())
    }
}
