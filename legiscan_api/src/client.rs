//! HTTP client for the LegiScan pull API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    types::{BillDetail, BillText, Envelope, MasterListEntry, Session},
    Error,
};

/// Production LegiScan endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.legiscan.com";

/// Per-request timeout used unless the caller picks another.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream operations consumed by this crate. Each maps to one `op` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetSessionList,
    GetMasterListRaw,
    GetBill,
    GetBillText,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetSessionList => "getSessionList",
            Self::GetMasterListRaw => "getMasterListRaw",
            Self::GetBill => "getBill",
            Self::GetBillText => "getBillText",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP client for the LegiScan API.
///
/// Every request is a GET against a single endpoint with the operation in
/// the `op` query parameter and the API key in `key`. The client performs
/// no caching and no pacing; see the library layer for both.
pub struct Client {
    /// Base URL for the API. Defaults to `https://api.legiscan.com`.
    base_api_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl Client {
    /// Creates a client pointing at the production endpoint.
    pub fn new(api_key: &str) -> Result<Self, Error> {
        Self::with_options(DEFAULT_BASE_URL, api_key, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self, Error> {
        Self::with_options(base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_options(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::Transport(e.to_string())
            })?;
        Ok(Self {
            base_api_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    fn get_url(&self, op: Operation, params: &[(&str, String)]) -> Result<Url, Error> {
        let mut url = Url::parse(format!("{}/", &self.base_api_url).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::Transport(format!("invalid base url: {}", e))
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.api_key);
            pairs.append_pair("op", op.as_str());
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    /// Sends one operation and returns the unwrapped envelope.
    async fn call(&self, op: Operation, params: &[(&str, String)]) -> Result<Envelope, Error> {
        let url = self.get_url(op, params)?;
        let resp = self
            .http
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("{} request failed: {}", op, e);
                Error::Transport(e.without_url().to_string())
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read {} response body: {}", op, e);
            Error::Transport(e.without_url().to_string())
        })?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("{} failed with status {}: {}", op, status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        let envelope = serde_json::from_str::<Envelope>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse {} envelope: {} | body: {}", op, e, snippet);
            Error::Parse(e.to_string())
        })?;

        if envelope.is_error() {
            let message = envelope.error_message();
            tracing::error!("{} returned an API error: {}", op, message);
            return Err(Error::Api { message });
        }

        Ok(envelope)
    }

    /// Lists every session LegiScan knows for a state, in upstream order.
    pub async fn get_session_list(&self, state: &str) -> Result<Vec<Session>, Error> {
        let envelope = self
            .call(Operation::GetSessionList, &[("state", state.to_string())])
            .await?;
        match envelope.payload.get("sessions") {
            Some(value) => decode(Operation::GetSessionList, value.clone()),
            None => Ok(Vec::new()),
        }
    }

    /// Fetches the raw master list (ids and change hashes) for a session.
    pub async fn get_master_list_raw(
        &self,
        session_id: i64,
    ) -> Result<Vec<MasterListEntry>, Error> {
        let envelope = self
            .call(Operation::GetMasterListRaw, &[("id", session_id.to_string())])
            .await?;
        match envelope.payload.get("masterlist") {
            Some(value) => master_list_entries(value),
            None => Ok(Vec::new()),
        }
    }

    /// Fetches a single bill. `Ok(None)` means the envelope had no `bill` member.
    pub async fn get_bill(&self, bill_id: i64) -> Result<Option<BillDetail>, Error> {
        let envelope = self
            .call(Operation::GetBill, &[("id", bill_id.to_string())])
            .await?;
        match envelope.payload.get("bill") {
            Some(serde_json::Value::Null) | None => Ok(None),
            Some(value) => decode(Operation::GetBill, value.clone()).map(Some),
        }
    }

    /// Fetches one text document.
    pub async fn get_bill_text(&self, doc_id: i64) -> Result<BillText, Error> {
        let envelope = self
            .call(Operation::GetBillText, &[("id", doc_id.to_string())])
            .await?;
        match envelope.payload.get("text") {
            Some(value) => decode(Operation::GetBillText, value.clone()),
            None => Err(Error::Parse(format!(
                "getBillText response for doc {} has no text member",
                doc_id
            ))),
        }
    }
}

fn decode<T: DeserializeOwned>(op: Operation, value: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(value).map_err(|e| {
        tracing::error!("Failed to parse {} payload: {}", op, e);
        Error::Parse(e.to_string())
    })
}

/// The master list arrives either as an array or as an object keyed by
/// position with a `session` member describing the session itself.
fn master_list_entries(value: &serde_json::Value) -> Result<Vec<MasterListEntry>, Error> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| decode(Operation::GetMasterListRaw, item.clone()))
            .collect(),
        serde_json::Value::Object(map) => {
            let mut keyed: Vec<(&String, &serde_json::Value)> =
                map.iter().filter(|(k, _)| k.as_str() != "session").collect();
            keyed.sort_by_key(|(k, _)| k.parse::<u64>().unwrap_or(u64::MAX));
            keyed
                .into_iter()
                .map(|(_, item)| decode(Operation::GetMasterListRaw, item.clone()))
                .collect()
        }
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(Error::Parse(format!(
            "unexpected masterlist shape: {}",
            truncate_body(&other.to_string())
        ))),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
