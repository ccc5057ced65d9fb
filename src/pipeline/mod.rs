//! Candidate filter pipeline: narrows a raw directory result set down to at
//! most one confident match through an ordered, short-circuiting sequence of
//! filters. Every filter is a pure function over the surviving candidate set;
//! only the prior-publication check talks to the directory.

use deunicode::deunicode;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::hal::{CandidateRecord, DirectoryClient};
use crate::AuthorName;

/// Hard cap on the candidate set considered for one unit.
const CANDIDATE_CAP: usize = 40;
/// Names of at most this many words are treated as generic short queries.
const SHORT_QUERY_WORDS: usize = 2;
/// More than this many survivors after full filtering is too ambiguous to
/// pick from; the outcome is not-found.
const MAX_AMBIGUOUS: usize = 3;

/// Everything a pipeline invocation needs beyond the candidates themselves.
/// Built fresh for each unit, so filter stages stay referentially
/// transparent.
#[derive(Debug)]
pub struct ResolutionContext<'a> {
    /// Normalized affiliation unit being resolved.
    pub name: &'a str,
    /// Two-letter country code when known; `None` relaxes the country filter.
    pub country: Option<&'a str>,
    pub city: Option<&'a str>,
    pub author: &'a AuthorName,
    /// Structure ids accumulated from previously resolved units of the same
    /// affiliation string. Grows monotonically within one resolution call.
    pub parent_ids: &'a HashSet<String>,
    /// Exact-match-only mode, used to probe for unvalidated entries.
    pub invalid_search: bool,
}

/// Run the full filter sequence. Returns the best-matching candidate, or
/// `None` when nothing can be picked confidently.
pub async fn resolve<C: DirectoryClient>(
    candidates: Vec<CandidateRecord>,
    ctx: &ResolutionContext<'_>,
    directory: &C,
) -> Option<CandidateRecord> {
    if candidates.is_empty() {
        return None;
    }

    let name_words = ctx.name.split_whitespace().count();

    // An implausibly large result for a short generic query means the query
    // itself was mis-parsed; guessing here produces false positives.
    if candidates.len() > CANDIDATE_CAP && name_words <= SHORT_QUERY_WORDS {
        debug!(
            name = ctx.name,
            count = candidates.len(),
            "short query over candidate cap, treating as not found"
        );
        return None;
    }

    let exact: Vec<CandidateRecord> = candidates
        .iter()
        .filter(|c| is_exact_match(c, ctx))
        .cloned()
        .collect();

    if exact.len() == 1 {
        return exact.into_iter().next();
    }

    if ctx.invalid_search {
        // Unvalidated entries are only ever accepted on an exact label match.
        return exact.into_iter().next();
    }

    let mut survivors = if exact.is_empty() { candidates } else { exact };

    survivors = filter_by_parent(survivors, ctx.parent_ids);
    if survivors.is_empty() {
        return None;
    }

    sort_by_specificity(&mut survivors);
    if survivors.len() > CANDIDATE_CAP {
        survivors.truncate(CANDIDATE_CAP);
    }

    if name_words == 1 {
        survivors = filter_acronym(survivors, ctx.name);
    }

    survivors = filter_university_group(survivors);

    if let Some(best) = filter_published_before(&survivors, ctx, directory).await {
        return Some(best);
    }

    if let Some(country) = ctx.country {
        survivors = filter_country(survivors, country);
    }
    survivors = filter_city(survivors, ctx.city);
    if survivors.is_empty() {
        return None;
    }

    // Ties broken by the filters may have left a single exact match standing.
    let exact: Vec<&CandidateRecord> = survivors
        .iter()
        .filter(|c| is_exact_match(c, ctx))
        .collect();
    if exact.len() == 1 {
        return Some(exact[0].clone());
    }

    if survivors.len() > MAX_AMBIGUOUS {
        debug!(
            name = ctx.name,
            count = survivors.len(),
            "still ambiguous after filtering, treating as not found"
        );
        return None;
    }

    pick_among_finalists(survivors, ctx, name_words)
}

/// Case-insensitive, diacritic-folded label equality, also accepting the
/// `<name> [<qualifier>]` bracket notation the directory uses.
fn is_exact_match(candidate: &CandidateRecord, ctx: &ResolutionContext<'_>) -> bool {
    let label = fold(&candidate.label);
    let name = fold(ctx.name);

    if label == name {
        return true;
    }
    if let Some(city) = ctx.city {
        if label == format!("{} [{}]", name, fold(city)) {
            return true;
        }
    }
    label.starts_with(&format!("{} [", name)) && label.ends_with(']')
}

/// Filter (1): with a non-empty accumulator, drop candidates whose parent
/// ids are disjoint from it. Candidates without parent metadata always
/// survive.
fn filter_by_parent(
    candidates: Vec<CandidateRecord>,
    parent_ids: &HashSet<String>,
) -> Vec<CandidateRecord> {
    if parent_ids.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| {
            let ids = c.parent_id_slice();
            ids.is_empty() || ids.iter().any(|id| parent_ids.contains(id))
        })
        .collect()
}

/// Filter (3): shorter labels first. Generic names sort ahead so the
/// last-resort pick below prefers the least decorated survivor.
fn sort_by_specificity(candidates: &mut [CandidateRecord]) {
    candidates.sort_by_key(|c| c.label.split_whitespace().count());
}

/// Filter (4): a single-token name is probably an acronym; when any label
/// carries it as a `[ACR]` annotation (or equals it outright), restrict to
/// those. With no bracket hit the set is left alone, otherwise every plain
/// single-word name would resolve to nothing.
fn filter_acronym(candidates: Vec<CandidateRecord>, name: &str) -> Vec<CandidateRecord> {
    let name = fold(name);
    let tag = format!("[{}]", name);
    let matched: Vec<CandidateRecord> = candidates
        .iter()
        .filter(|c| {
            let label = fold(&c.label);
            label.contains(&tag) || label == name
        })
        .cloned()
        .collect();

    if matched.is_empty() {
        candidates
    } else {
        matched
    }
}

/// Filter (5): when both a structure and its parent survive, the child is
/// the more specific match; drop the parent.
fn filter_university_group(candidates: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let referenced_parents: HashSet<String> = candidates
        .iter()
        .flat_map(|c| c.parent_id_slice().iter().cloned())
        .collect();

    candidates
        .into_iter()
        .filter(|c| !referenced_parents.contains(&c.docid))
        .collect()
}

/// Filter (6): if the author already published under one of the surviving
/// structures, that is a confident match. Lookup failures count as no hit.
async fn filter_published_before<C: DirectoryClient>(
    candidates: &[CandidateRecord],
    ctx: &ResolutionContext<'_>,
    directory: &C,
) -> Option<CandidateRecord> {
    for candidate in candidates {
        match directory.author_published_at(&candidate.docid, ctx.author).await {
            Ok(count) if count > 0 => return Some(candidate.clone()),
            Ok(_) => {}
            Err(e) => {
                warn!(
                    structure = %candidate.docid,
                    "prior-publication lookup failed, counting as no hit: {e}"
                );
            }
        }
    }
    None
}

/// Filter (7): a stated candidate country must match; absent country fields
/// pass through.
fn filter_country(candidates: Vec<CandidateRecord>, country: &str) -> Vec<CandidateRecord> {
    candidates
        .into_iter()
        .filter(|c| {
            c.country
                .as_deref()
                .map_or(true, |cc| cc.eq_ignore_ascii_case(country))
        })
        .collect()
}

/// Filter (8): keep candidates whose address contains the city, whose label
/// carries a `[City]` annotation, or who have no address at all.
fn filter_city(candidates: Vec<CandidateRecord>, city: Option<&str>) -> Vec<CandidateRecord> {
    let city = match city {
        Some(c) if !c.trim().is_empty() => clean_address(c),
        _ => return candidates,
    };
    let tag = format!("[{}]", city);

    candidates
        .into_iter()
        .filter(|c| match &c.address {
            Some(address) => {
                clean_address(address).contains(&city) || clean_address(&c.label).contains(&tag)
            }
            None => true,
        })
        .collect()
}

/// Final tie-break over at most [`MAX_AMBIGUOUS`] survivors.
fn pick_among_finalists(
    mut survivors: Vec<CandidateRecord>,
    ctx: &ResolutionContext<'_>,
    name_words: usize,
) -> Option<CandidateRecord> {
    let name = fold(ctx.name);

    if let Some(city) = ctx.city {
        let want = format!("{} [{}]", name, fold(city));
        if let Some(hit) = survivors.iter().find(|c| fold(&c.label) == want) {
            return Some(hit.clone());
        }
    }

    // A multi-word name showing up only inside another institution's bracket
    // annotation is that institution's parent tag, not the entity itself.
    // Single-token names are skipped: there the bracket is the acronym.
    if name_words > 1 {
        survivors.retain(|c| !nested_in_brackets(&c.label, &name));
    }

    survivors
        .iter()
        .find(|c| !c.parent_id_slice().is_empty())
        .or_else(|| survivors.first())
        .cloned()
}

/// True when every word of `name` appears, in order, inside the bracketed
/// part of `label` while the unbracketed head names something else.
fn nested_in_brackets(label: &str, name: &str) -> bool {
    let label = fold(label);
    let open = match label.find('[') {
        Some(i) => i,
        None => return false,
    };
    let close = match label.rfind(']') {
        Some(i) if i > open => i,
        _ => return false,
    };

    if label[..open].trim() == name {
        return false;
    }

    let mut bracket_words = label[open + 1..close].split_whitespace();
    name.split_whitespace()
        .all(|word| bracket_words.any(|bw| bw == word))
}

fn fold(s: &str) -> String {
    deunicode(s).to_lowercase()
}

/// Keep letters, digits and spaces only; used for address/city containment.
fn clean_address(s: &str) -> String {
    deunicode(s)
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ' ' || c == '[' || c == ']' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
