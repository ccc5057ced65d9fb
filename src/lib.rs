use serde::{Deserialize, Serialize};
use std::fmt;

pub mod cache;
pub mod country;
pub mod error;
pub mod hal;
pub mod normalize;
pub mod pipeline;
pub mod resolve;

/// One raw affiliation as supplied by the source metadata record. The name is
/// never mutated; normalization produces derived strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Affiliation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorName {
    pub forename: String,
    pub surname: String,
}

impl AuthorName {
    pub fn full(&self) -> String {
        format!("{} {}", self.forename, self.surname)
    }
}

/// Terminal state of one affiliation string after a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffilStatus {
    Valid,
    Invalid,
    #[serde(rename = "Not in HAL")]
    NotFound,
}

impl fmt::Display for AffilStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AffilStatus::Valid => "Valid",
            AffilStatus::Invalid => "Invalid",
            AffilStatus::NotFound => "Not in HAL",
        };
        f.write_str(s)
    }
}

/// Outcome of resolving one affiliation string. `Valid` carries validated
/// structure ids (possibly several: lab plus parent university), `Invalid`
/// carries ids of entries that exist in HAL but are not vetted.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    Valid { ids: Vec<String>, labels: Vec<String> },
    Invalid { ids: Vec<String>, labels: Vec<String> },
    NotFound { name: String },
}

impl ResolutionOutcome {
    pub fn status(&self) -> AffilStatus {
        match self {
            ResolutionOutcome::Valid { .. } => AffilStatus::Valid,
            ResolutionOutcome::Invalid { .. } => AffilStatus::Invalid,
            ResolutionOutcome::NotFound { .. } => AffilStatus::NotFound,
        }
    }
}

/// Per-author resolution state for one document. Mutated only by the
/// resolver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorRecord {
    pub forename: String,
    pub surname: String,
    #[serde(default)]
    pub affiliations: Vec<Affiliation>,
    /// Canonical structure ids resolved to validated entries.
    #[serde(default)]
    pub affil_ids: Vec<String>,
    /// Ids of entries present in the directory but not vetted.
    #[serde(default)]
    pub affil_ids_invalid: Vec<String>,
    /// One status per raw affiliation string, in source order.
    #[serde(default)]
    pub affil_status: Vec<AffilStatus>,
    /// Original names of affiliations that could not be resolved.
    #[serde(default)]
    pub affil_not_found: Vec<String>,
}

impl AuthorRecord {
    pub fn name(&self) -> AuthorName {
        AuthorName {
            forename: self.forename.clone(),
            surname: self.surname.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub authors: Vec<AuthorRecord>,
}

pub(crate) fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
