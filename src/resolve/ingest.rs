use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use glob::glob;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::{Affiliation, AuthorRecord, DocumentRecord};

/// Read document records from a `.jsonl`/`.jsonl.gz` file, or from every
/// such file under a directory. Unparseable lines are skipped with a
/// warning; they never abort the batch.
pub fn read_documents<P: AsRef<Path>>(input: P) -> Result<Vec<DocumentRecord>> {
    let input = input.as_ref();
    let files = if input.is_dir() {
        find_jsonl_files(input)?
    } else {
        vec![input.to_path_buf()]
    };

    let mut documents = Vec::new();
    for filepath in files {
        read_file(&filepath, &mut documents)
            .with_context(|| format!("Failed to read {}", filepath.display()))?;
    }
    Ok(documents)
}

fn find_jsonl_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in ["**/*.jsonl", "**/*.jsonl.gz"] {
        let pattern = directory.join(pattern);
        files.extend(glob(&pattern.to_string_lossy())?.filter_map(Result::ok));
    }
    files.sort();
    Ok(files)
}

fn read_file(filepath: &Path, documents: &mut Vec<DocumentRecord>) -> Result<()> {
    let file = File::open(filepath)?;
    let reader: Box<dyn Read> = if filepath.extension().is_some_and(|e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    for (lineno, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(value) => {
                if let Some(document) = parse_document(&value) {
                    documents.push(document);
                }
            }
            Err(e) => {
                warn!("Skipping malformed line {} of {}: {}", lineno + 1, filepath.display(), e);
            }
        }
    }
    Ok(())
}

/// Tolerant document parser. Id comes from `doi`, `eid` or `id`; authors and
/// affiliations accept both object and plain-string shapes.
pub fn parse_document(value: &Value) -> Option<DocumentRecord> {
    let document_id = ["doi", "eid", "id"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(String::from)?;

    let authors = match value.get("authors") {
        Some(Value::Array(arr)) => arr.iter().filter_map(parse_author).collect(),
        _ => Vec::new(),
    };

    Some(DocumentRecord {
        document_id,
        authors,
    })
}

fn parse_author(value: &Value) -> Option<AuthorRecord> {
    let forename = ["forename", "given_name", "givenName"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();
    let surname = ["surname", "family_name", "familyName"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))?
        .to_string();

    let affiliations = match value.get("affiliations").or_else(|| value.get("affiliation")) {
        Some(Value::Array(arr)) => arr.iter().filter_map(parse_affiliation).collect(),
        _ => Vec::new(),
    };

    // Ids already supplied by a trusted local directory; the resolver skips
    // these authors entirely.
    let affil_ids = match value.get("affil_id") {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    };

    Some(AuthorRecord {
        forename,
        surname,
        affiliations,
        affil_ids,
        affil_ids_invalid: Vec::new(),
        affil_status: Vec::new(),
        affil_not_found: Vec::new(),
    })
}

/// Handles both object format `{"name": "..."}` and plain string format.
fn parse_affiliation(value: &Value) -> Option<Affiliation> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(Affiliation {
            name: s.clone(),
            city: None,
            country: None,
        }),
        Value::Object(_) => {
            let name = value.get("name").and_then(Value::as_str)?;
            if name.trim().is_empty() {
                return None;
            }
            Some(Affiliation {
                name: name.to_string(),
                city: value
                    .get("city")
                    .and_then(Value::as_str)
                    .map(String::from),
                country: value
                    .get("country")
                    .and_then(Value::as_str)
                    .map(String::from),
            })
        }
        _ => None,
    }
}
