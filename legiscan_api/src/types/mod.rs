mod envelope;
pub use self::envelope::{Alert, Envelope};

mod session;
pub use self::session::{Session, SessionID};

mod bill;
pub use self::bill::{BillDetail, BillID, HistoryAction, MasterListEntry, Sponsor, TextRef};

mod text;
pub use self::text::{BillText, DocID};

use serde::{Deserialize, Deserializer};

/// LegiScan encodes boolean flags as `0`/`1`; accept those as well as JSON booleans
/// so values round-trip through our own serialized cache payloads.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n != 0,
        Some(Flag::Str(s)) => matches!(s.trim(), "1" | "true"),
        None => false,
    })
}

/// String field that LegiScan sometimes sends as an explicit `null`.
pub(crate) fn nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
