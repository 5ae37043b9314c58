use crate::normalize::NormalizationRules;
use crate::resolver::*;
use crate::scope::DirectoryScope;
use std::path::{Path, PathBuf};

fn record(path: &str, artist: Option<&str>, title: Option<&str>) -> AudioFileRecord {
    AudioFileRecord {
        source_path: PathBuf::from(path),
        current_tags: CurrentTags {
            artist: artist.map(String::from),
            album: None,
            title: title.map(String::from),
            track: None,
        },
        is_directory_boundary: false,
    }
}

fn scope_of(path: &str) -> DirectoryScope {
    DirectoryScope::enter(Path::new(path).parent().unwrap())
}

#[test]
fn test_various_artists_artist_equals_album() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, true);
    let rec = record("/music/The Kids/01.mp3", Some("The Kids"), Some("Song One"));
    let mut scope = scope_of("/music/The Kids/01.mp3");

    let resolved = resolver.resolve(&rec, &mut scope, 1).unwrap();
    assert_eq!(resolved.title, "Song One");
    assert_eq!(resolved.artist, VARIOUS_ARTISTS);
    assert_eq!(resolved.album, "The Kids");
    assert_eq!(resolved.track_number, 1);
}

#[test]
fn test_various_artists_prefixes_title() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, true);
    let rec = record("/music/Compilation/07.mp3", Some("Band A"), Some("Track X"));
    let mut scope = scope_of("/music/Compilation/07.mp3");

    let resolved = resolver.resolve(&rec, &mut scope, 7).unwrap();
    assert_eq!(
        resolved,
        ResolvedMetadata {
            artist: "Various Artists".to_string(),
            album: "Compilation".to_string(),
            title: "Band A - Track X".to_string(),
            track_number: 7,
        }
    );
    assert_eq!(scope.artists(), &["Band A".to_string()]);
}

#[test]
fn test_artist_equals_album_outside_various_artists_mode() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, false);
    let rec = record("/music/The Kids/01.mp3", Some("The Kids"), Some("Song One"));
    let mut scope = scope_of("/music/The Kids/01.mp3");

    let resolved = resolver.resolve(&rec, &mut scope, 1).unwrap();
    assert_eq!(resolved.artist, "The Kids");
    assert_eq!(resolved.title, "Song One");
}

#[test]
fn test_fallback_to_filename() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, false);
    let rec = record("/music/Best Of CD 1/Band B - great song.mp3", None, None);
    let mut scope = scope_of("/music/Best Of CD 1/Band B - great song.mp3");

    let resolved = resolver.resolve(&rec, &mut scope, 2).unwrap();
    assert_eq!(resolved.artist, "Band B");
    assert_eq!(resolved.album, "Best Of");
    assert_eq!(resolved.title, "Great Song");
    assert_eq!(scope.artists(), &["Band B".to_string()]);
}

#[test]
fn test_filename_with_dash_only() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, false);
    let rec = record("/music/Album/Artist-Title.mp3", None, None);
    let mut scope = scope_of("/music/Album/Artist-Title.mp3");

    let resolved = resolver.resolve(&rec, &mut scope, 1).unwrap();
    assert_eq!(resolved.artist, "Artist");
    assert_eq!(resolved.title, "Title");
}

#[test]
fn test_filename_without_separator() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, false);
    let rec = record("/music/Album/Just A Title.mp3", Some("Someone"), None);
    let mut scope = scope_of("/music/Album/Just A Title.mp3");

    let resolved = resolver.resolve(&rec, &mut scope, 1).unwrap();
    assert_eq!(resolved.artist, "Someone");
    assert_eq!(resolved.title, "Just A Title");
}

#[test]
fn test_embedded_title_loses_artist() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, false);
    let rec = record("/music/Album/01.mp3", Some("Band A"), Some("Band A - Hit"));
    let mut scope = scope_of("/music/Album/01.mp3");

    let resolved = resolver.resolve(&rec, &mut scope, 1).unwrap();
    assert_eq!(resolved.title, "Hit");
}

#[test]
fn test_artist_removal_keeps_partial_words() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, false);
    let rec = record("/music/Album/01.mp3", Some("Band A"), Some("Band Anthem"));
    let mut scope = scope_of("/music/Album/01.mp3");

    let resolved = resolver.resolve(&rec, &mut scope, 1).unwrap();
    assert_eq!(resolved.title, "Band Anthem");
}

#[test]
fn test_blank_embedded_artist_falls_back_to_filename() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, false);
    let rec = record("/music/Album/Band C - Tune.mp3", Some("  ?? "), Some("Tune"));
    let mut scope = scope_of("/music/Album/Band C - Tune.mp3");

    let resolved = resolver.resolve(&rec, &mut scope, 1).unwrap();
    assert_eq!(resolved.artist, "Band C");
    assert_eq!(resolved.title, "Tune");
}

#[test]
fn test_metadata_incomplete_falls_back_to_raw_stem() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, false);
    let rec = record("/music/Album/Band D - !!!.mp3", None, Some("???"));
    let mut scope = scope_of("/music/Album/Band D - !!!.mp3");

    let incomplete = resolver.resolve(&rec, &mut scope, 4).unwrap_err();
    assert_eq!(incomplete.raw_title, "Band D - !!!");
    let fallback = incomplete.into_fallback();
    assert_eq!(fallback.title, "Band D - !!!");
    assert_eq!(fallback.artist, "Band D");
    assert_eq!(fallback.album, "Album");
    assert_eq!(fallback.track_number, 4);
}

#[test]
fn test_compilation_detection() {
    let rules = NormalizationRules::default();
    let resolver = MetadataResolver::new(&rules, false);
    let mut scope = scope_of("/music/Mix/01.mp3");
    resolver.resolve(&record("/music/Mix/01.mp3", Some("Band A"), Some("One")), &mut scope, 1).unwrap();
    assert!(!scope.looks_like_compilation());
    resolver.resolve(&record("/music/Mix/02.mp3", Some("band a"), Some("Two")), &mut scope, 2).unwrap();
    assert!(!scope.looks_like_compilation());
    resolver.resolve(&record("/music/Mix/03.mp3", Some("Band B"), Some("Three")), &mut scope, 3).unwrap();
    assert!(scope.looks_like_compilation());
}

#[test]
fn test_split_artist_title() {
    assert_eq!(split_artist_title("A - B - C"), (Some("A"), "B - C"));
    assert_eq!(split_artist_title("A-B"), (Some("A"), "B"));
    assert_eq!(split_artist_title("Title"), (None, "Title"));
}
