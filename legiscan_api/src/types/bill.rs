//! Bill types returned by `getMasterListRaw` and `getBill`.

use serde::{Deserialize, Serialize};

/// Numeric LegiScan bill identifier.
pub type BillID = i64;

/// Lightweight per-bill descriptor from the session master list.
///
/// `change_hash` changes whenever any tracked attribute of the bill
/// changes upstream; two entries with the same hash describe the same bill state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterListEntry {
    pub bill_id: BillID,

    /// Human bill number (e.g. "AB 123"). `getMasterListRaw` calls this `number`.
    #[serde(alias = "bill_number", default, deserialize_with = "super::nullable")]
    pub number: String,

    #[serde(default, deserialize_with = "super::nullable")]
    pub title: String,

    /// Numeric progress code (1 = Introduced ... 6 = Failed).
    #[serde(default)]
    pub status: i64,

    #[serde(default)]
    pub status_date: Option<String>,

    #[serde(default, deserialize_with = "super::nullable")]
    pub url: String,

    #[serde(default)]
    pub last_action_date: Option<String>,

    #[serde(default)]
    pub last_action: Option<String>,

    pub change_hash: String,
}

/// Legislator attached to a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sponsor {
    pub people_id: i64,

    #[serde(deserialize_with = "super::nullable")]
    pub name: String,

    /// Role label. Either `"Primary"` or a chamber title such as `"Sen"`.
    #[serde(default, deserialize_with = "super::nullable")]
    pub role: String,

    /// `1` marks the primary sponsor when the role is a chamber title.
    #[serde(default)]
    pub sponsor_type_id: Option<i64>,
}

impl Sponsor {
    pub fn is_primary(&self) -> bool {
        self.role.eq_ignore_ascii_case("Primary") || self.sponsor_type_id == Some(1)
    }
}

/// Reference to one text document of a bill (fetched with `getBillText`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRef {
    pub doc_id: i64,

    /// Version label (e.g. "Introduced", "Amended").
    #[serde(rename = "type", default, deserialize_with = "super::nullable")]
    pub doc_type: String,

    #[serde(default, deserialize_with = "super::nullable")]
    pub url: String,

    #[serde(default)]
    pub date: Option<String>,
}

/// Dated legislative action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryAction {
    #[serde(default)]
    pub date: Option<String>,

    #[serde(default, deserialize_with = "super::nullable")]
    pub action: String,

    #[serde(default)]
    pub chamber: Option<String>,
}

/// Full bill record from `getBill`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillDetail {
    pub bill_id: BillID,

    #[serde(alias = "number", default, deserialize_with = "super::nullable")]
    pub bill_number: String,

    #[serde(default, deserialize_with = "super::nullable")]
    pub title: String,

    #[serde(default, deserialize_with = "super::nullable")]
    pub description: String,

    #[serde(default)]
    pub status: i64,

    #[serde(default)]
    pub status_date: Option<String>,

    #[serde(default, deserialize_with = "super::nullable")]
    pub url: String,

    #[serde(default)]
    pub state_link: Option<String>,

    #[serde(default)]
    pub last_action_date: Option<String>,

    #[serde(default)]
    pub last_action: Option<String>,

    #[serde(default, deserialize_with = "super::nullable")]
    pub change_hash: String,

    #[serde(default)]
    pub sponsors: Vec<Sponsor>,

    /// Text documents, most recent first.
    #[serde(default)]
    pub texts: Vec<TextRef>,

    #[serde(default)]
    pub history: Vec<HistoryAction>,
}

impl BillDetail {
    /// Primary sponsor name, falling back to the first listed sponsor.
    pub fn primary_sponsor(&self) -> Option<&str> {
        self.sponsors
            .iter()
            .find(|s| s.is_primary())
            .or_else(|| self.sponsors.first())
            .map(|s| s.name.as_str())
    }

    /// Latest action, preferring the explicit fields and falling back to the
    /// last history row (`getBill` does not always send `last_action`).
    pub fn latest_action(&self) -> (Option<&str>, Option<&str>) {
        if self.last_action.is_some() || self.last_action_date.is_some() {
            return (self.last_action_date.as_deref(), self.last_action.as_deref());
        }
        match self.history.last() {
            Some(h) => (h.date.as_deref(), Some(h.action.as_str())),
            None => (None, None),
        }
    }
}
