//! Bill text payload returned by `getBillText`.

use serde::{Deserialize, Serialize};

/// Numeric LegiScan document identifier.
pub type DocID = i64;

/// Document payload for one text id.
///
/// The content arrives in at most one of several shapes; which field is
/// populated depends on the state and the document's MIME type. Resolution
/// into a single string happens in the library layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillText {
    pub doc_id: DocID,

    #[serde(default)]
    pub bill_id: i64,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(rename = "type", default, deserialize_with = "super::nullable")]
    pub doc_type: String,

    #[serde(default)]
    pub mime: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub state_link: Option<String>,

    /// Plain text, or base64 text when the string has no whitespace.
    #[serde(default)]
    pub text: Option<String>,

    /// Alternate text rendering; plain, or base64 when the string has no whitespace.
    #[serde(default)]
    pub alt_bill_text: Option<String>,

    /// Base64-encoded primary document.
    #[serde(default)]
    pub doc: Option<String>,

    /// Base64-encoded alternate document.
    #[serde(default)]
    pub alt_doc: Option<String>,
}
