//! Client for the HAL open-archive reference API.
//!
//! The filter pipeline depends only on [`CandidateRecord`]; everything
//! provider-specific (query grammar, envelope shape, retries) stays here.

use serde::{Deserialize, Deserializer, Serialize};

mod client;
mod query;

pub use client::{DirectoryClient, HalClient};
pub use query::{RefQuery, Validity};

/// Solr fields requested for every structure search.
pub const RETURN_FIELDS: &str =
    "docid,label_s,address_s,country_s,parentName_s,parentDocid_i,parentValid_s";

/// One structure row returned by the HAL `ref/structure` search. The parent
/// fields are parallel arrays of equal length when present; their absence is
/// not an error, it just widens what the filters let through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateRecord {
    #[serde(rename = "docid", deserialize_with = "string_or_number")]
    pub docid: String,
    #[serde(rename = "label_s")]
    pub label: String,
    #[serde(rename = "address_s", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "country_s", default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "parentName_s", default, skip_serializing_if = "Option::is_none")]
    pub parent_names: Option<Vec<String>>,
    #[serde(rename = "parentDocid_i", default, skip_serializing_if = "Option::is_none")]
    pub parent_ids: Option<Vec<String>>,
    #[serde(rename = "parentValid_s", default, skip_serializing_if = "Option::is_none")]
    pub parent_valid: Option<Vec<String>>,
}

impl CandidateRecord {
    pub fn parent_id_slice(&self) -> &[String] {
        self.parent_ids.as_deref().unwrap_or(&[])
    }

    /// Parent ids flagged VALID, paired with their labels when present.
    pub fn valid_parents(&self) -> Vec<(String, Option<String>)> {
        let ids = self.parent_ids.as_deref().unwrap_or(&[]);
        let flags = self.parent_valid.as_deref().unwrap_or(&[]);
        let names = self.parent_names.as_deref().unwrap_or(&[]);

        let mut out = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            if flags.get(i).map(String::as_str) == Some("VALID") {
                out.push((id.clone(), names.get(i).cloned()));
            }
        }
        out
    }
}

/// HAL serves `docid` as a number in some views and a string in others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "docid must be a string or number, got {other}"
        ))),
    }
}
