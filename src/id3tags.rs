/// The id3tags module is the narrow tag-container seam of the crate: everything else reads and
/// writes frames through [`TagContainer`] and never touches the ID3v2 layout directly.
use crate::error::{Result, TagsortError, TagsortExpectedError};
use id3::{Tag as Id3Tag, TagLike, Version};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub const PICTURE: &str = "APIC";
pub const ALBUM: &str = "TALB";
pub const TITLE: &str = "TIT2";
pub const ARTIST: &str = "TPE1";
pub const TRACK: &str = "TRCK";

/// Frames kept when obsolete tags are removed.
pub const DEFAULT_FRAMES: &[&str] = &[ALBUM, ARTIST, TRACK, TITLE, PICTURE];

/// The ID3v2.3 frames we know by name, used to validate update directives and to label listings.
pub const FRAME_DESCRIPTIONS: &[(&str, &str)] = &[
    ("AENC", "Audio encryption"),
    ("APIC", "Attached picture"),
    ("COMM", "Comments"),
    ("COMR", "Commercial frame"),
    ("ENCR", "Encryption method registration"),
    ("ETCO", "Event timing codes"),
    ("GEOB", "General encapsulated object"),
    ("GRID", "Group identification registration"),
    ("LINK", "Linked information"),
    ("MCDI", "Music CD identifier"),
    ("MLLT", "MPEG location lookup table"),
    ("OWNE", "Ownership frame"),
    ("PCNT", "Play counter"),
    ("POPM", "Popularimeter"),
    ("POSS", "Position synchronisation frame"),
    ("PRIV", "Private frame"),
    ("RBUF", "Recommended buffer size"),
    ("RVAD", "Relative volume adjustment"),
    ("RVRB", "Reverb"),
    ("SYLT", "Synchronised lyrics/text"),
    ("SYTC", "Synchronised tempo codes"),
    ("TALB", "Album/Movie/Show title"),
    ("TBPM", "BPM"),
    ("TCOM", "Composer"),
    ("TCON", "Content type"),
    ("TCOP", "Copyright message"),
    ("TDAT", "Date"),
    ("TDLY", "Playlist delay"),
    ("TENC", "Encoded by"),
    ("TEXT", "Lyricist/Text writer"),
    ("TFLT", "File type"),
    ("TIME", "Time"),
    ("TIT1", "Content group description"),
    ("TIT2", "Title/Songname/Content description"),
    ("TIT3", "Subtitle/Description refinement"),
    ("TKEY", "Initial key"),
    ("TLAN", "Language"),
    ("TLEN", "Length"),
    ("TMED", "Media type"),
    ("TOAL", "Original album/movie/show title"),
    ("TOFN", "Original filename"),
    ("TOLY", "Original lyricist/text writer"),
    ("TOPE", "Original artist/performer"),
    ("TORY", "Original release year"),
    ("TOWN", "File owner/licensee"),
    ("TPE1", "Lead artist/Lead performer/Soloist/Performing group"),
    ("TPE2", "Band/Orchestra/Accompaniment"),
    ("TPE3", "Conductor/performer refinement"),
    ("TPE4", "Interpreted, remixed, or otherwise modified by"),
    ("TPOS", "Part of a set"),
    ("TPUB", "Publisher"),
    ("TRCK", "Track number/Position in set"),
    ("TRDA", "Recording dates"),
    ("TRSN", "Internet radio station name"),
    ("TRSO", "Internet radio station owner"),
    ("TSIZ", "Size"),
    ("TSRC", "ISRC"),
    ("TSSE", "Software/Hardware and settings used for encoding"),
    ("TXXX", "User defined text information frame"),
    ("TYER", "Year"),
    ("UFID", "Unique file identifier"),
    ("USER", "Terms of use"),
    ("USLT", "Unsynchronised lyrics/text transcription"),
    ("WCOM", "Commercial information"),
    ("WCOP", "Copyright/Legal information"),
    ("WOAF", "Official audio file webpage"),
    ("WOAR", "Official artist/performer webpage"),
    ("WOAS", "Official audio source webpage"),
    ("WORS", "Official internet radio station homepage"),
    ("WPAY", "Payment"),
    ("WPUB", "Publishers official webpage"),
    ("WXXX", "User defined URL link frame"),
];

pub fn describe_frame(id: &str) -> Option<&'static str> {
    FRAME_DESCRIPTIONS.iter().find(|(frame_id, _)| *frame_id == id).map(|(_, desc)| *desc)
}

pub fn is_known_frame(id: &str) -> bool {
    describe_frame(id).is_some()
}

/// The operations the pipelines need from a tag container. Closing is handled by `Drop`.
pub trait TagContainer {
    fn path(&self) -> &Path;
    /// Sorted, de-duplicated ids of all frames present.
    fn frame_ids(&self) -> Vec<String>;
    fn get_text(&self, id: &str) -> Option<String>;
    /// A printable rendering of any frame, textual or not.
    fn display_frame(&self, id: &str) -> Option<String>;
    fn set_text(&mut self, id: &str, value: &str);
    fn delete_frame(&mut self, id: &str);
    fn save(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// When false the existing tag is not parsed at all and the container starts empty.
    pub parse: bool,
    /// Keep only these frames after parsing.
    pub limit_to_frames: Option<Vec<String>>,
}

impl OpenOptions {
    pub fn strict(limit_to_frames: Option<Vec<String>>) -> Self {
        Self {
            parse: true,
            limit_to_frames,
        }
    }

    pub fn permissive() -> Self {
        Self {
            parse: false,
            limit_to_frames: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    Parsed,
    Degraded,
}

/// Result of the two-step open: strict parsing first, then permissive.
#[derive(Debug)]
pub enum OpenOutcome {
    Parsed(Id3File),
    Degraded { file: Id3File, reason: String },
    Failed(TagsortError),
}

#[derive(Debug, Clone)]
pub struct Id3File {
    path: PathBuf,
    tag: Id3Tag,
    /// The tag on disk could not be decoded, so saving replaces it wholesale instead of letting
    /// the id3 crate locate and patch it.
    replace_on_save: bool,
}

impl Id3File {
    pub fn from_tag(path: &Path, tag: Id3Tag) -> Self {
        Self {
            path: path.to_path_buf(),
            tag,
            replace_on_save: false,
        }
    }

    pub fn open(path: &Path, options: &OpenOptions) -> Result<Id3File> {
        // Make sure the file is there and readable even when the tag is not parsed.
        File::open(path).map_err(|e| TagsortError::fs_failure(path, e))?;

        if !options.parse {
            return Ok(Self::from_tag(path, Id3Tag::new()));
        }

        let mut tag = match Id3Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(id3::Error {
                kind: id3::ErrorKind::NoTag,
                ..
            }) => Id3Tag::new(),
            Err(e) => {
                return Err(TagsortExpectedError::TagParseFailure {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
                .into())
            }
        };

        if let Some(keep) = &options.limit_to_frames {
            let obsolete: Vec<String> =
                tag.frames().map(|f| f.id().to_string()).filter(|id| !keep.iter().any(|k| k == id)).collect();
            for id in obsolete {
                tag.remove(&id);
            }
        }

        Ok(Self::from_tag(path, tag))
    }

    /// Open strictly, fall back to a permissive open, and report which of the two worked.
    pub fn open_with_fallback(path: &Path, limit_to_frames: Option<Vec<String>>) -> OpenOutcome {
        let strict_err = match Self::open(path, &OpenOptions::strict(limit_to_frames)) {
            Ok(file) => return OpenOutcome::Parsed(file),
            Err(e) => e,
        };
        tracing::debug!("Strict tag parse of {} failed ({}), retrying without parsing", path.display(), strict_err);

        match Self::open(path, &OpenOptions::permissive()) {
            Ok(mut file) => {
                file.replace_on_save = true;
                OpenOutcome::Degraded {
                    file,
                    reason: strict_err.to_string(),
                }
            }
            Err(e) => OpenOutcome::Failed(e),
        }
    }

    pub fn tag(&self) -> &Id3Tag {
        &self.tag
    }

    /// Write our tag followed by the audio, dropping whatever ID3v2 tag the file started with.
    fn rewrite(&self) -> Result<()> {
        let data = fs::read(&self.path).map_err(|e| TagsortError::fs_failure(&self.path, e))?;
        let audio = &data[leading_tag_len(&data).min(data.len())..];
        let mut out = Vec::with_capacity(data.len());
        self.tag.write_to(&mut out, Version::Id3v23)?;
        out.extend_from_slice(audio);
        fs::write(&self.path, out).map_err(|e| TagsortError::fs_failure(&self.path, e))?;
        Ok(())
    }
}

/// Length of the ID3v2 tag at the start of `data`, header and footer included, taken from the
/// header alone so that it works for tags whose body cannot be decoded. Zero if there is none.
pub fn leading_tag_len(data: &[u8]) -> usize {
    if data.len() < 10 || &data[..3] != b"ID3" {
        return 0;
    }
    // Four 7-bit bytes, most significant first.
    let size = data[6..10].iter().fold(0usize, |acc, b| (acc << 7) | usize::from(b & 0x7F));
    let footer = if data[5] & 0x10 != 0 { 10 } else { 0 };
    10 + size + footer
}

impl TagContainer for Id3File {
    fn path(&self) -> &Path {
        &self.path
    }

    fn frame_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tag.frames().map(|f| f.id().to_string()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    fn get_text(&self, id: &str) -> Option<String> {
        self.tag.get(id).and_then(|f| f.content().text()).map(|t| t.trim_end_matches('\0').to_string())
    }

    fn display_frame(&self, id: &str) -> Option<String> {
        // The last frame wins when an id repeats.
        let frame = self.tag.frames().filter(|f| f.id() == id).last()?;
        match frame.content().text() {
            Some(text) => Some(text.trim_end_matches('\0').to_string()),
            None => Some(format!("{:?}", frame.content())),
        }
    }

    fn set_text(&mut self, id: &str, value: &str) {
        self.tag.set_text(id, value);
    }

    fn delete_frame(&mut self, id: &str) {
        self.tag.remove(id);
    }

    fn save(&mut self) -> Result<()> {
        if self.replace_on_save {
            return self.rewrite();
        }
        self.tag.write_to_path(&self.path, Version::Id3v23)?;
        Ok(())
    }
}
