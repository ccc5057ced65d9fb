use scopus_hal::normalize::{cleanup, preprocess, segment};

#[test]
fn test_cleanup_folds_diacritics_and_case() {
    assert_eq!(cleanup("Université Paris-Saclay"), "universite paris saclay");
}

#[test]
fn test_cleanup_removes_standalone_of_and_de() {
    assert_eq!(cleanup("Department of Physics"), "department physics");
    assert_eq!(cleanup("Institut de Soudure"), "institut soudure");
}

#[test]
fn test_cleanup_applies_synonym_table() {
    assert_eq!(cleanup("Electricité de France"), "edf");
    assert_eq!(cleanup("Mines ParisTech"), "mines paris psl");
}

#[test]
fn test_cleanup_strips_trailing_separators() {
    assert_eq!(cleanup("CentraleSupelec; "), "centralesupelec");
    assert_eq!(cleanup("CentraleSupelec,"), "centralesupelec");
}

#[test]
fn test_cleanup_collapses_ampersand_and_whitespace() {
    assert_eq!(cleanup("Science &  Technology Unit"), "science technology unit");
}

#[test]
fn test_acronym_becomes_extra_segment() {
    let prepared = preprocess("Laboratoire Genie Industriel (LGI), CentraleSupelec", None);
    assert_eq!(
        prepared,
        "laboratoire genie industriel, centralesupelec, lgi"
    );
}

#[test]
fn test_french_variant_added_for_unknown_country() {
    let prepared = preprocess("University of Technology of Troyes", None);
    assert_eq!(
        prepared,
        "university technology troyes, universite technologie troyes"
    );
}

#[test]
fn test_french_variant_only_transforms_own_segment() {
    let prepared = preprocess("Dept X, University of Paris, France", Some("fr"));
    assert!(prepared.starts_with("dept x, university paris, france"));
    assert!(prepared.ends_with(", universite paris"));
}

#[test]
fn test_no_french_variant_for_foreign_country() {
    let prepared = preprocess("University of Cambridge", Some("gb"));
    assert_eq!(prepared, "university cambridge");
}

#[test]
fn test_preprocess_is_pure() {
    let a = preprocess("Laboratoire Genie Industriel (LGI), CentraleSupelec", Some("fr"));
    let b = preprocess("Laboratoire Genie Industriel (LGI), CentraleSupelec", Some("fr"));
    assert_eq!(a, b);
}

#[test]
fn test_segment_moves_university_last() {
    let units = segment("laboratoire genie industriel, universite paris saclay, centralesupelec");
    assert_eq!(
        units,
        vec![
            "laboratoire genie industriel",
            "centralesupelec",
            "universite paris saclay",
        ]
    );
}

#[test]
fn test_segment_keeps_short_lists_intact() {
    let units = segment("lgi, centralesupelec");
    assert_eq!(units, vec!["lgi", "centralesupelec"]);
}

#[test]
fn test_segment_truncates_free_text_explosions() {
    // Author-supplied free text with many commas collapses to the
    // parent-most unit, deterministically.
    let units = segment("department law, order, ethics, justice, philosophy, university x");
    assert_eq!(units, vec!["university x"]);

    let same = segment("department law, order, ethics, justice, philosophy, university x");
    assert_eq!(units, same);
}

#[test]
fn test_segment_drops_empty_units() {
    let units = segment("lgi, , centralesupelec");
    assert_eq!(units, vec!["lgi", "centralesupelec"]);
}
