use crate::normalize::*;
use regex::Regex;

#[test]
fn test_normalize_basic() {
    assert_eq!(normalize("hello   WORLD"), "Hello World");
    assert_eq!(normalize("  the   kids  "), "The Kids");
    assert_eq!(normalize(""), "");
    assert_eq!(normalize("!!!"), "");
}

#[test]
fn test_normalize_drops_punctuation() {
    assert_eq!(normalize("AC/DC: Back in Black!"), "Acdc Back In Black");
    assert_eq!(normalize("Rock'n'Roll"), "Rocknroll");
}

#[test]
fn test_normalize_strips_fillers() {
    assert_eq!(normalize("Various Artists - Best Of"), "Best Of");
    assert_eq!(normalize("VARIOUS hits"), "Hits");
    assert_eq!(normalize("various artists"), "");
}

#[test]
fn test_normalize_strips_noise() {
    assert_eq!(normalize("Best Of CD 2 (Deutsch)"), "Best Of");
    assert_eq!(normalize("Die drei ??? Folge 12"), "Die Drei");
    assert_eq!(normalize("Story Ep3"), "Story");
    // Markers without a number stay.
    assert_eq!(normalize("Discovery Episode"), "Discovery Episode");
}

#[test]
fn test_normalize_unicode() {
    assert_eq!(normalize("café del mar"), "Café Del Mar");
    // Decomposed accents are composed before punctuation is dropped.
    assert_eq!(normalize("cafe\u{301}"), "Café");
    assert_eq!(normalize("straße"), "Straße");
    assert_eq!(normalize("ÅNGSTRÖM"), "Ångström");
}

#[test]
fn test_normalize_idempotent() {
    let inputs = [
        "Various Artists - Best Of CD 2 (Deutsch)",
        "  the   kids  ",
        "ßa ǆemal",
        "cafe\u{301} ǅ",
        "Various Variousartists",
        "various various artists artists",
        "CD1 CD2 Folge 3",
        "İstanbul",
        "12 - Track Twelve.mp3",
        "ǈubljana",
        "",
    ];
    for input in inputs {
        let once = normalize(input);
        assert_eq!(normalize(&once), once, "normalize is not idempotent for {input:?}");
    }
}

#[test]
fn test_normalize_idempotent_on_deeply_nested_noise() {
    // Each pass peels only the innermost "ep N", so this needs one pass per level.
    let numbers: Vec<String> = (0..100).map(|n| n.to_string()).collect();
    let input = format!("{}{} tail", "ep ".repeat(100), numbers.join(" "));
    let once = normalize(&input);
    assert_eq!(once, "Tail");
    assert_eq!(normalize(&once), once);
}

#[test]
fn test_normalizer_matches_normalize_with() {
    let rules = NormalizationRules::default();
    let normalizer = Normalizer::new(&rules);
    for input in ["Various Artists - Hits CD 2", "the kids", "Folge 12 Deutsch"] {
        assert_eq!(normalizer.normalize(input), normalize_with(&rules, input));
    }
}

#[test]
fn test_normalize_with_custom_rules() {
    let rules = NormalizationRules::new(vec!["remastered".to_string()], vec![Regex::new(r"(?i)\b\d{4}\b").unwrap()]);
    assert_eq!(normalize_with(&rules, "Album 1999 Remastered"), "Album");
    // Default fillers are not part of custom rules.
    assert_eq!(normalize_with(&rules, "various artists"), "Various Artists");
}

#[test]
fn test_normalize_with_empty_rules() {
    let rules = NormalizationRules::empty();
    assert_eq!(normalize_with(&rules, "various artists cd 1"), "Various Artists Cd 1");
}

#[test]
fn test_normalize_ignores_empty_matching_patterns() {
    let rules = NormalizationRules::new(vec![], vec![Regex::new(r"x*").unwrap()]);
    assert_eq!(normalize_with(&rules, "xx yy"), "Xx Yy");
}
