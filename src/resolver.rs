/// The resolver module derives the canonical (artist, album, title) of a file from its embedded
/// tags and its place in the directory tree.
use crate::error::TagsortExpectedError;
use crate::id3tags::{TagContainer, ALBUM, ARTIST, TITLE, TRACK};
use crate::normalize::{NormalizationRules, Normalizer};
use crate::scope::DirectoryScope;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const VARIOUS_ARTISTS: &str = "Various Artists";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentTags {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub track: Option<String>,
}

impl CurrentTags {
    pub fn read(tags: &dyn TagContainer) -> Self {
        Self {
            artist: tags.get_text(ARTIST),
            album: tags.get_text(ALBUM),
            title: tags.get_text(TITLE),
            track: tags.get_text(TRACK),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFileRecord {
    pub source_path: PathBuf,
    pub current_tags: CurrentTags,
    pub is_directory_boundary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMetadata {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub track_number: u32,
}

/// Neither the embedded tags nor the filename yielded a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataIncomplete {
    pub path: PathBuf,
    pub artist: String,
    pub album: String,
    pub track_number: u32,
    /// The filename stem, untouched by normalization.
    pub raw_title: String,
}

impl MetadataIncomplete {
    /// Keep the raw filename text as the title rather than dropping the file.
    pub fn into_fallback(self) -> ResolvedMetadata {
        ResolvedMetadata {
            artist: self.artist,
            album: self.album,
            title: self.raw_title,
            track_number: self.track_number,
        }
    }
}

impl From<MetadataIncomplete> for TagsortExpectedError {
    fn from(err: MetadataIncomplete) -> Self {
        TagsortExpectedError::MetadataIncomplete { path: err.path }
    }
}

pub struct MetadataResolver {
    normalizer: Normalizer,
    various_artists: bool,
}

impl MetadataResolver {
    /// Compiles the rules once; build one resolver per run, not per file.
    pub fn new(rules: &NormalizationRules, various_artists: bool) -> Self {
        Self {
            normalizer: Normalizer::new(rules),
            various_artists,
        }
    }

    pub fn resolve(
        &self,
        record: &AudioFileRecord,
        scope: &mut DirectoryScope,
        track_number: u32,
    ) -> std::result::Result<ResolvedMetadata, MetadataIncomplete> {
        let path = &record.source_path;
        let stem = _file_stem(path);
        let (name_artist, name_title) = split_artist_title(&stem);

        let album = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| self.normalize(&n.to_string_lossy()))
            .unwrap_or_default();

        let artist = record
            .current_tags
            .artist
            .as_deref()
            .map(|a| self.normalize(a))
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.normalize(name_artist.unwrap_or("")));
        scope.add_artist(&artist);

        let title = record
            .current_tags
            .title
            .as_deref()
            .map(|t| self.title_without_artist(t, &artist))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.normalize(name_title));

        if title.is_empty() {
            return Err(MetadataIncomplete {
                path: path.clone(),
                artist: self.final_artist(&artist),
                album,
                track_number,
                raw_title: if stem.is_empty() {
                    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
                } else {
                    stem
                },
            });
        }

        Ok(ResolvedMetadata {
            title: self.final_title(&artist, &album, &title),
            artist: self.final_artist(&artist),
            album,
            track_number,
        })
    }

    fn normalize(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }

    fn title_without_artist(&self, title: &str, artist: &str) -> String {
        let title = self.normalize(title);
        if artist.is_empty() {
            return title;
        }
        self.normalize(&_remove_words(&title, artist))
    }

    fn final_artist(&self, artist: &str) -> String {
        if self.various_artists {
            VARIOUS_ARTISTS.to_string()
        } else {
            artist.to_string()
        }
    }

    fn final_title(&self, artist: &str, album: &str, title: &str) -> String {
        if !self.various_artists || artist.is_empty() || artist == album {
            title.to_string()
        } else {
            format!("{artist} - {title}")
        }
    }
}

/// Split a filename stem into (artist, title) at the first " - ", or failing that the first "-".
pub fn split_artist_title(stem: &str) -> (Option<&str>, &str) {
    if let Some((artist, title)) = stem.split_once(" - ") {
        return (Some(artist), title);
    }
    if let Some((artist, title)) = stem.split_once('-') {
        return (Some(artist), title);
    }
    (None, stem)
}

/// Remove the first whole-word occurrence of `needle` from `haystack`. Both are expected to be
/// normalized, so words are single-space separated and consistently cased.
fn _remove_words(haystack: &str, needle: &str) -> String {
    let words: Vec<&str> = haystack.split(' ').collect();
    let target: Vec<&str> = needle.split(' ').collect();
    if target.len() > words.len() {
        return haystack.to_string();
    }
    for i in 0..=words.len() - target.len() {
        if words[i..i + target.len()] == target[..] {
            let mut rest = words[..i].to_vec();
            rest.extend_from_slice(&words[i + target.len()..]);
            return rest.join(" ");
        }
    }
    haystack.to_string()
}

fn _file_stem(p: &Path) -> String {
    p.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default()
}
