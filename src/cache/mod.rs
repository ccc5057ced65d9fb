//! Append-only memo of prior affiliation resolutions.
//!
//! Keyed on the original (pre-normalization) affiliation name plus
//! disambiguators. Entries are never mutated or removed; repeated runs
//! accumulate history, and the most specific entry wins at lookup time.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::{AffilStatus, AuthorName, ResolutionOutcome};

/// One persisted resolution outcome. Id and label cells are `", "`-joined
/// lists in the CSV form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub affil_name: String,
    pub status: AffilStatus,
    #[serde(serialize_with = "join_list", deserialize_with = "split_list")]
    pub valid_ids: Vec<String>,
    #[serde(serialize_with = "join_list", deserialize_with = "split_list")]
    pub affil_names_valid: Vec<String>,
    #[serde(serialize_with = "join_list", deserialize_with = "split_list")]
    pub invalid_ids: Vec<String>,
    #[serde(serialize_with = "join_list", deserialize_with = "split_list")]
    pub affil_names_invalid: Vec<String>,
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub author: String,
    pub affil_city: String,
}

impl CacheEntry {
    pub fn from_outcome(
        outcome: &ResolutionOutcome,
        affil_name: &str,
        document_id: &str,
        author: &AuthorName,
        city: Option<&str>,
    ) -> Self {
        let mut entry = CacheEntry {
            affil_name: affil_name.to_string(),
            status: outcome.status(),
            valid_ids: Vec::new(),
            affil_names_valid: Vec::new(),
            invalid_ids: Vec::new(),
            affil_names_invalid: Vec::new(),
            document_id: document_id.to_string(),
            author: author.full(),
            affil_city: city.unwrap_or_default().to_string(),
        };
        match outcome {
            ResolutionOutcome::Valid { ids, labels } => {
                entry.valid_ids = ids.clone();
                entry.affil_names_valid = labels.clone();
            }
            ResolutionOutcome::Invalid { ids, labels } => {
                entry.invalid_ids = ids.clone();
                entry.affil_names_invalid = labels.clone();
            }
            ResolutionOutcome::NotFound { .. } => {}
        }
        entry
    }

    pub fn outcome(&self) -> ResolutionOutcome {
        match self.status {
            AffilStatus::Valid => ResolutionOutcome::Valid {
                ids: self.valid_ids.clone(),
                labels: self.affil_names_valid.clone(),
            },
            AffilStatus::Invalid => ResolutionOutcome::Invalid {
                ids: self.invalid_ids.clone(),
                labels: self.affil_names_invalid.clone(),
            },
            AffilStatus::NotFound => ResolutionOutcome::NotFound {
                name: self.affil_name.clone(),
            },
        }
    }
}

fn join_list<S: Serializer>(list: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&list.join(", "))
}

fn split_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

/// In-memory view of the persisted cache table. Single-writer: lookups never
/// lock because entries are immutable once recorded.
pub struct ResolutionCache {
    path: PathBuf,
    entries: Vec<CacheEntry>,
}

impl ResolutionCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: Vec::new(),
        }
    }

    /// Load the table from disk. A missing file is an empty cache.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries = Vec::new();

        if path.exists() {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open cache {}", path.display()))?;
            let mut reader = csv::Reader::from_reader(file);
            for record in reader.deserialize() {
                let entry: CacheEntry = record.context("Failed to parse cache row")?;
                entries.push(entry);
            }
        }

        Ok(Self { path, entries })
    }

    /// Most-specific-wins lookup: same name and author, then same name and
    /// document, then same name and city. Within a tier the latest entry
    /// supersedes earlier ones.
    pub fn lookup(
        &self,
        affil_name: &str,
        author: &str,
        document_id: &str,
        city: Option<&str>,
    ) -> Option<&CacheEntry> {
        let by_name = |e: &&CacheEntry| e.affil_name == affil_name;

        if let Some(entry) = self
            .entries
            .iter()
            .rev()
            .filter(by_name)
            .find(|e| e.author == author)
        {
            return Some(entry);
        }
        if let Some(entry) = self
            .entries
            .iter()
            .rev()
            .filter(by_name)
            .find(|e| e.document_id == document_id)
        {
            return Some(entry);
        }
        let city = city.unwrap_or_default();
        if city.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .rev()
            .filter(by_name)
            .find(|e| e.affil_city.eq_ignore_ascii_case(city))
    }

    /// Append one entry. Existing entries are never updated.
    pub fn record(&mut self, entry: CacheEntry) {
        self.entries.push(entry);
    }

    /// Re-serialize the full accumulated table.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create cache {}", self.path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
