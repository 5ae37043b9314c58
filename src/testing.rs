use crate::catalog::{CatalogClient, StubMatch};
use crate::error::{Result, TagsortExpectedError};
use id3::{Tag, TagLike, Version};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Once;
use std::time::Instant;
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init() -> TempDir {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")))
            .with_test_writer()
            .try_init();
    });
    TempDir::new().expect("failed to create temp dir")
}

// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, no padding: 417 bytes per frame.
const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
const FRAME_LEN: usize = 417;

/// A few silent MPEG frames without any tag.
pub fn mpeg_frames(count: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(count * FRAME_LEN);
    for _ in 0..count {
        data.extend_from_slice(&FRAME_HEADER);
        data.resize(data.len() + FRAME_LEN - FRAME_HEADER.len(), 0);
    }
    data
}

/// Write an MP3 at `path` carrying the given text frames. An empty frame list writes no tag at all.
pub fn write_mp3(path: &Path, frames: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent dir");
    }
    fs::write(path, mpeg_frames(8)).expect("failed to write mpeg frames");
    if frames.is_empty() {
        return;
    }
    let mut tag = Tag::new();
    for (id, value) in frames {
        tag.set_text(*id, *value);
    }
    tag.write_to_path(path, Version::Id3v23).expect("failed to write tag");
}

/// An MP3 whose tag header claims ID3v2 but whose body is garbage.
pub fn write_corrupt_mp3(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent dir");
    }
    let mut data = vec![b'I', b'D', b'3', 0x09, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00];
    data.extend_from_slice(&[0xAB; 256]);
    data.extend(mpeg_frames(4));
    fs::write(path, data).expect("failed to write corrupt mp3");
}

pub fn read_tag(path: &Path) -> Tag {
    Tag::read_from_path(path).expect("failed to read tag")
}

/// A catalog client that answers from a script and records when it was called.
#[derive(Default)]
pub struct FakeCatalogClient {
    responses: RefCell<VecDeque<Result<Vec<StubMatch>>>>,
    default_matches: Vec<StubMatch>,
    pub calls: RefCell<Vec<(String, Instant)>>,
}

impl FakeCatalogClient {
    /// Answer every query with the same matches.
    pub fn always(matches: Vec<StubMatch>) -> Self {
        Self {
            default_matches: matches,
            ..Default::default()
        }
    }

    /// Answer the next query with a failure, then fall back to the defaults.
    pub fn then_fail(self, reason: &str) -> Self {
        self.responses.borrow_mut().push_back(Err(TagsortExpectedError::Generic(reason.to_string()).into()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(q, _)| q.clone()).collect()
    }
}

impl CatalogClient for FakeCatalogClient {
    fn search_stub(&self, query: &str) -> Result<Vec<StubMatch>> {
        self.calls.borrow_mut().push((query.to_string(), Instant::now()));
        match self.responses.borrow_mut().pop_front() {
            Some(response) => response,
            None => Ok(self.default_matches.clone()),
        }
    }
}

pub fn stub(id: &str, artist: &str, title: &str, track_count: u32) -> StubMatch {
    StubMatch {
        id: id.to_string(),
        artist: artist.to_string(),
        title: title.to_string(),
        track_count,
        score: Some(100),
    }
}
