//! Legislative session types returned by `getSessionList`.

use serde::{Deserialize, Serialize};

/// Numeric LegiScan session identifier.
pub type SessionID = i64;

/// One legislative session for a jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionID,

    #[serde(default)]
    pub year_start: i32,

    #[serde(default)]
    pub year_end: i32,

    /// Display name (e.g. "2025-2026 Regular Session").
    #[serde(default)]
    pub session_name: String,

    /// Session has ended.
    #[serde(default, deserialize_with = "super::flag")]
    pub prior: bool,

    /// Special (extraordinary) session rather than a regular one.
    #[serde(default, deserialize_with = "super::flag")]
    pub special: bool,
}
