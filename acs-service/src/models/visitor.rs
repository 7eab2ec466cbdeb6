use serde::{Deserialize, Serialize};
use validator::Validate;

/// Visitor identity as passed in by the caller. Never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct VisitorData {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub civ_piv_card_info: Option<CivPivCardInfo>,
}

impl VisitorData {
    /// EDIPI from the visitor's CIV/PIV card, if one was read.
    pub fn edipi(&self) -> Option<&str> {
        self.civ_piv_card_info
            .as_ref()
            .and_then(|card| card.edipi.as_deref())
            .filter(|edipi| !edipi.trim().is_empty())
    }
}

/// Card payload captured by the CIV/PIV reader.
///
/// Only the identifiers enrollment needs are typed; anything else the reader
/// produced is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CivPivCardInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edipi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fasc_n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
