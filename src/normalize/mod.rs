//! Affiliation name normalization and segmentation.
//!
//! Every function here is a pure transform: same input and country always
//! produce the same output, and the raw string from the source record is
//! never modified in place.

use deunicode::deunicode;

/// Ordered literal substring replacements applied after folding. These cover
/// institution-name synonyms the directory indexes under a different form.
const SYNONYMS: &[(&str, &str)] = &[
    ("electricite de france", "edf"),
    ("mines paristech", "mines paris - psl"),
    ("ecole ", ""),
    ("randd", "r d"),
];

/// Past this many comma-separated units the string is almost certainly
/// author-supplied free text ("Department of Law, Order, and ..."), and only
/// the final (parent-most) unit is kept for searching.
const MAX_UNITS: usize = 6;

/// Full preprocessing of a raw affiliation string: cleanup, synonym folding,
/// acronym extraction and French-variant enrichment. Enrichment appends new
/// comma-separated segments; it never replaces the searchable name.
pub fn preprocess(raw: &str, country: Option<&str>) -> String {
    let mut name = cleanup(raw);

    if let Some((stripped, acronym)) = extract_acronym(&name) {
        name = format!("{}, {}", stripped, acronym);
    }

    let french_or_unknown = match country {
        None | Some("") | Some("fr") => true,
        _ => false,
    };
    if french_or_unknown {
        if let Some(variant) = french_variant(&name) {
            name = format!("{}, {}", name, variant);
        }
    }

    name
}

/// Deterministic text cleanup: trailing separator artifacts, ASCII folding,
/// lowercasing, synonym table, standalone of/de removal, `&`/`-` collapse
/// and whitespace collapse.
pub fn cleanup(raw: &str) -> String {
    let mut s = raw.trim().to_string();
    while s.ends_with(';') || s.ends_with(',') {
        s.pop();
        s = s.trim_end().to_string();
    }

    let mut s = deunicode(&s).to_lowercase();
    for (old, new) in SYNONYMS {
        s = s.replace(old, new);
    }

    let s = s.replace('&', " ").replace('-', " ");

    s.split_whitespace()
        .filter(|word| *word != "of" && *word != "de")
        .collect::<Vec<_>>()
        .join(" ")
}

/// If the string carries a parenthetical acronym `(XXX)`, return the string
/// with the group removed plus the acronym, so both become searchable.
fn extract_acronym(s: &str) -> Option<(String, String)> {
    let open = s.find('(')?;
    let close = open + s[open..].find(')')?;
    let inner = s[open + 1..close].trim();
    if inner.is_empty() || !inner.chars().all(|c| c.is_alphanumeric()) {
        return None;
    }

    let stripped = format!("{}{}", s[..open].trim_end(), &s[close + 1..]);
    let stripped = stripped
        .trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .to_string();
    Some((stripped, inner.to_string()))
}

/// Derive the French phrasing of the comma-bounded segment containing
/// "university". Only that segment is transformed so the rest of the name is
/// not corrupted.
fn french_variant(s: &str) -> Option<String> {
    let idx = s.find("university")?;
    let start = s[..idx].rfind(',').map(|i| i + 1).unwrap_or(0);
    let end = s[idx..].find(',').map(|i| idx + i).unwrap_or(s.len());
    let segment = s[start..end].trim();

    let variant = segment
        .split_whitespace()
        .filter(|w| *w != "of")
        .map(|w| match w {
            "university" => "universite",
            "technology" => "technologie",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(" ");

    if variant.is_empty() || s.contains(&variant) {
        None
    } else {
        Some(variant)
    }
}

/// Split a preprocessed affiliation into ordered search units. Parent-like
/// units (university/universite) move to the end of the list; the resolver
/// iterates in reverse, so they are searched first.
pub fn segment(prepared: &str) -> Vec<String> {
    let (others, parents): (Vec<String>, Vec<String>) = prepared
        .split(", ")
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from)
        .partition(|u| !is_parent_unit(u));

    let mut units = others;
    units.extend(parents);

    // Free-text guard: past the threshold, keep only the parent-most unit.
    if units.len() >= MAX_UNITS {
        units = units.split_off(units.len() - 1);
    }

    units
}

fn is_parent_unit(unit: &str) -> bool {
    let lower = unit.to_lowercase();
    lower.contains("university") || lower.contains("universite")
}
