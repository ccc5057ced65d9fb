use scopus_hal::cache::{CacheEntry, ResolutionCache};
use scopus_hal::{AffilStatus, AuthorName, ResolutionOutcome};
use tempfile::TempDir;

fn author() -> AuthorName {
    AuthorName {
        forename: "Jane".to_string(),
        surname: "Doe".to_string(),
    }
}

fn valid_entry(affil_name: &str, document_id: &str, author_name: &str) -> CacheEntry {
    CacheEntry {
        affil_name: affil_name.to_string(),
        status: AffilStatus::Valid,
        valid_ids: vec!["200006".to_string()],
        affil_names_valid: vec!["CentraleSupelec".to_string()],
        invalid_ids: Vec::new(),
        affil_names_invalid: Vec::new(),
        document_id: document_id.to_string(),
        author: author_name.to_string(),
        affil_city: "Gif-sur-Yvette".to_string(),
    }
}

#[test]
fn test_load_missing_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let cache = ResolutionCache::load(temp_dir.path().join("none.csv")).unwrap();
    assert!(cache.is_empty());
}

#[test]
fn test_save_and_load_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("resolution_cache.csv");

    let mut cache = ResolutionCache::new(&path);
    cache.record(valid_entry("CentraleSupelec", "10.1/a", "Jane Doe"));
    cache.record(CacheEntry::from_outcome(
        &ResolutionOutcome::NotFound {
            name: "Obscure Institute".to_string(),
        },
        "Obscure Institute",
        "10.1/a",
        &author(),
        None,
    ));
    cache.save().unwrap();

    // The historical status string is preserved on disk.
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("Not in HAL"));

    let loaded = ResolutionCache::load(&path).unwrap();
    assert_eq!(loaded.len(), 2);

    let hit = loaded
        .lookup("CentraleSupelec", "Jane Doe", "10.1/a", None)
        .unwrap();
    assert_eq!(hit.status, AffilStatus::Valid);
    assert_eq!(hit.valid_ids, vec!["200006".to_string()]);
    assert_eq!(hit.affil_names_valid, vec!["CentraleSupelec".to_string()]);

    let miss = loaded
        .lookup("Obscure Institute", "Jane Doe", "other-doc", None)
        .unwrap();
    assert_eq!(miss.status, AffilStatus::NotFound);
    assert!(miss.valid_ids.is_empty());
}

#[test]
fn test_lookup_precedence_author_then_document_then_city() {
    let mut cache = ResolutionCache::new("unused.csv");

    let mut by_city = valid_entry("Lab X", "doc-1", "Someone Else");
    by_city.valid_ids = vec!["city-match".to_string()];
    by_city.affil_city = "Lyon".to_string();
    cache.record(by_city);

    let mut by_doc = valid_entry("Lab X", "doc-2", "Another Person");
    by_doc.valid_ids = vec!["doc-match".to_string()];
    cache.record(by_doc);

    let mut by_author = valid_entry("Lab X", "doc-3", "Jane Doe");
    by_author.valid_ids = vec!["author-match".to_string()];
    cache.record(by_author);

    let hit = cache.lookup("Lab X", "Jane Doe", "doc-2", Some("Lyon")).unwrap();
    assert_eq!(hit.valid_ids, vec!["author-match".to_string()]);

    let hit = cache.lookup("Lab X", "Nobody", "doc-2", Some("Lyon")).unwrap();
    assert_eq!(hit.valid_ids, vec!["doc-match".to_string()]);

    let hit = cache.lookup("Lab X", "Nobody", "doc-9", Some("Lyon")).unwrap();
    assert_eq!(hit.valid_ids, vec!["city-match".to_string()]);

    assert!(cache.lookup("Lab X", "Nobody", "doc-9", None).is_none());
    assert!(cache.lookup("Lab Y", "Jane Doe", "doc-2", Some("Lyon")).is_none());
}

#[test]
fn test_latest_entry_wins_within_a_tier() {
    let mut cache = ResolutionCache::new("unused.csv");

    let first = valid_entry("Lab X", "doc-1", "Jane Doe");
    cache.record(first);

    let mut superseding = valid_entry("Lab X", "doc-1", "Jane Doe");
    superseding.valid_ids = vec!["newer".to_string()];
    cache.record(superseding);

    let hit = cache.lookup("Lab X", "Jane Doe", "doc-1", None).unwrap();
    assert_eq!(hit.valid_ids, vec!["newer".to_string()]);
    // Append-only: the superseded entry is still there.
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_reload_then_record_accumulates_history() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("resolution_cache.csv");

    let mut cache = ResolutionCache::new(&path);
    cache.record(valid_entry("Lab X", "doc-1", "Jane Doe"));
    cache.save().unwrap();

    let mut cache = ResolutionCache::load(&path).unwrap();
    cache.record(valid_entry("Lab Y", "doc-2", "Jane Doe"));
    cache.save().unwrap();

    let reloaded = ResolutionCache::load(&path).unwrap();
    assert_eq!(reloaded.len(), 2);
}

#[test]
fn test_list_cells_roundtrip_as_joined_strings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("resolution_cache.csv");

    let mut entry = valid_entry("Stacked Lab", "doc-1", "Jane Doe");
    entry.valid_ids = vec!["1039632".to_string(), "200006".to_string(), "300009".to_string()];
    entry.affil_names_valid = vec![
        "Laboratoire Genie Industriel".to_string(),
        "CentraleSupelec".to_string(),
    ];

    let mut cache = ResolutionCache::new(&path);
    cache.record(entry);
    cache.save().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("1039632, 200006, 300009"));

    let loaded = ResolutionCache::load(&path).unwrap();
    let hit = loaded.lookup("Stacked Lab", "Jane Doe", "doc-1", None).unwrap();
    assert_eq!(hit.valid_ids.len(), 3);
    assert_eq!(hit.affil_names_valid.len(), 2);
}
