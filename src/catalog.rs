/// The catalog module matches folders against the MusicBrainz CD-stub catalog.
///
/// Each folder holding audio files is looked up once: the folder name is split into artist and
/// title, the catalog is searched, and the result lands in a `cd-info.json` sidecar next to the
/// files. A folder whose sidecar already carries matches is never queried again unless a refresh
/// is requested. All catalog calls go through a [`Pacer`], which enforces a minimum interval
/// between consecutive calls, retries included.
use crate::common::{clean_path, is_audio_file};
use crate::datafiles::{delete_lookup_record, read_lookup_record, write_lookup_record, write_summary};
use crate::error::{Result, TagsortError, TagsortExpectedError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubMatch {
    pub id: String,
    pub artist: String,
    pub title: String,
    pub track_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CDLookupRecord {
    pub path: PathBuf,
    pub search_query: String,
    pub file_count: usize,
    #[serde(default)]
    pub best_match: Option<StubMatch>,
    #[serde(default)]
    pub all_matches: Vec<StubMatch>,
    #[serde(default)]
    pub queried_at: Option<DateTime<Utc>>,
}

impl CDLookupRecord {
    pub fn is_resolved(&self) -> bool {
        !self.all_matches.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FolderState {
    Unresolved,
    Querying,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLookup {
    pub record: CDLookupRecord,
    pub state: FolderState,
    /// False when the answer came from an existing sidecar.
    pub queried: bool,
    /// Why the lookup stayed unresolved, if the catalog call failed.
    pub failure: Option<String>,
}

/// One line of the `cd-infos.json` summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub path: PathBuf,
    pub query: String,
    pub file_count: usize,
    pub match_count: usize,
    pub best_id: Option<String>,
    pub best_artist: Option<String>,
    pub best_title: Option<String>,
    pub best_track_count: Option<u32>,
}

impl From<&CDLookupRecord> for SummaryRow {
    fn from(record: &CDLookupRecord) -> Self {
        let best = record.best_match.as_ref();
        Self {
            path: record.path.clone(),
            query: record.search_query.clone(),
            file_count: record.file_count,
            match_count: record.all_matches.len(),
            best_id: best.map(|m| m.id.clone()),
            best_artist: best.map(|m| m.artist.clone()),
            best_title: best.map(|m| m.title.clone()),
            best_track_count: best.map(|m| m.track_count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedFolder {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    pub records: Vec<CDLookupRecord>,
    pub unresolved: Vec<UnresolvedFolder>,
    pub summary: Vec<SummaryRow>,
    /// Number of catalog searches actually performed, retries excluded.
    pub queries: usize,
}

pub trait CatalogClient {
    fn search_stub(&self, query: &str) -> Result<Vec<StubMatch>>;
}

impl<C: CatalogClient + ?Sized> CatalogClient for &C {
    fn search_stub(&self, query: &str) -> Result<Vec<StubMatch>> {
        (**self).search_stub(query)
    }
}

/// Enforces a minimum interval between consecutive calls.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the interval has passed since the previous call, then record this one.
    pub fn wait(&self) {
        let mut last = self.last_call.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

pub struct CatalogMatcher<C> {
    client: C,
    pacer: Pacer,
    max_retries: u32,
}

impl<C: CatalogClient> CatalogMatcher<C> {
    pub fn new(client: C, pacing: Duration, max_retries: u32) -> Self {
        Self {
            client,
            pacer: Pacer::new(pacing),
            max_retries,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn resolve_folder(&self, folder: &Path, refresh: bool) -> Result<FolderLookup> {
        if refresh {
            if delete_lookup_record(folder)? {
                debug!("Deleted existing lookup of {} for refresh", folder.display());
            }
        } else if let Some(record) = read_lookup_record(folder)? {
            if record.is_resolved() {
                debug!("{} already resolved, not querying", folder.display());
                return Ok(FolderLookup {
                    record,
                    state: FolderState::Resolved,
                    queried: false,
                    failure: None,
                });
            }
        }

        let file_count = count_audio_files(folder)?;
        let name = folder.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let query = build_query(&name);
        let mut record = CDLookupRecord {
            path: folder.to_path_buf(),
            search_query: query.clone(),
            file_count,
            ..Default::default()
        };

        let mut state = FolderState::Querying;
        debug!("{} is {:?} with {}", folder.display(), state, query);
        let matches = match self.search_with_retries(&query) {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Lookup of {} failed: {}", folder.display(), e);
                return Ok(FolderLookup {
                    record,
                    state: FolderState::Unresolved,
                    queried: true,
                    failure: Some(e.to_string()),
                });
            }
        };

        record.best_match = best_match(&matches, file_count).cloned();
        record.all_matches = matches;
        record.queried_at = Some(Utc::now());
        write_lookup_record(folder, &record)?;

        state = if record.is_resolved() {
            FolderState::Resolved
        } else {
            FolderState::Unresolved
        };
        info!("{}: {} matches for {}", folder.display(), record.all_matches.len(), query);

        Ok(FolderLookup {
            record,
            state,
            queried: true,
            failure: None,
        })
    }

    /// Look up every folder holding audio files under the given roots, then write the summary
    /// table of each root.
    pub fn run(&self, roots: &[PathBuf], refresh: bool) -> Result<CatalogReport> {
        let mut cleaned = Vec::with_capacity(roots.len());
        for root in roots {
            let root = clean_path(root);
            if !root.is_dir() {
                return Err(TagsortExpectedError::InputPathInvalid {
                    path: root,
                    reason: "not a directory".to_string(),
                }
                .into());
            }
            cleaned.push(root);
        }

        let mut report = CatalogReport::default();
        for root in &cleaned {
            let mut rows = Vec::new();
            for folder in audio_folders(root) {
                let lookup = match self.resolve_folder(&folder, refresh) {
                    Ok(lookup) => lookup,
                    Err(e) => {
                        warn!("Skipping {}: {}", folder.display(), e);
                        report.unresolved.push(UnresolvedFolder {
                            path: folder,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };

                if lookup.queried {
                    report.queries += 1;
                }
                if lookup.state != FolderState::Resolved {
                    let reason = lookup.failure.clone().unwrap_or_else(|| "no matches".to_string());
                    warn!("{} is unresolved: {}", folder.display(), reason);
                    report.unresolved.push(UnresolvedFolder {
                        path: folder.clone(),
                        reason,
                    });
                }
                rows.push(SummaryRow::from(&lookup.record));
                report.records.push(lookup.record);
            }

            write_summary(root, &rows)?;
            report.summary.extend(rows);
        }

        info!(
            "Looked up {} folders with {} queries, {} unresolved",
            report.records.len(),
            report.queries,
            report.unresolved.len()
        );
        Ok(report)
    }

    fn search_with_retries(&self, query: &str) -> Result<Vec<StubMatch>> {
        let mut attempt = 0;
        loop {
            self.pacer.wait();
            match self.client.search_stub(query) {
                Ok(matches) => return Ok(matches),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!("Catalog query {:?} failed ({}), retry {}/{}", query, e, attempt, self.max_retries);
                }
                Err(e) => {
                    return Err(TagsortExpectedError::CatalogQueryFailure {
                        query: query.to_string(),
                        reason: e.to_string(),
                    }
                    .into())
                }
            }
        }
    }
}

/// `artist:'X' AND title:'Y'` from a folder named `X - Y`. The split happens at the last
/// separator, so artists may contain " - " but titles may not.
pub fn build_query(folder_name: &str) -> String {
    let (artist, title) = match folder_name.rsplit_once(" - ") {
        Some((artist, title)) => (artist.trim(), title.trim()),
        None => ("", folder_name.trim()),
    };
    let (artist, title) = (escape_term(artist), escape_term(title));
    match (artist.is_empty(), title.is_empty()) {
        (false, false) => format!("artist:'{artist}' AND title:'{title}'"),
        (false, true) => format!("artist:'{artist}'"),
        (true, _) => format!("title:'{title}'"),
    }
}

/// Backslash-escape the characters that would end or break a quoted term.
fn escape_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// The first match with as many tracks as the folder has files, else the first match.
pub fn best_match(matches: &[StubMatch], file_count: usize) -> Option<&StubMatch> {
    matches.iter().find(|m| m.track_count as usize == file_count).or_else(|| matches.first())
}

pub fn count_audio_files(folder: &Path) -> Result<usize> {
    let entries = fs::read_dir(folder).map_err(|e| TagsortError::fs_failure(folder, e))?;
    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| TagsortError::fs_failure(folder, e))?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) && is_audio_file(&entry.path()) {
            count += 1;
        }
    }
    Ok(count)
}

/// Directories under `root` (itself included) that directly contain audio files, sorted by path.
fn audio_folders(root: &Path) -> Vec<PathBuf> {
    let mut folders = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot read {}: {}", e.path().unwrap_or(root).display(), e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        match count_audio_files(entry.path()) {
            Ok(0) => {}
            Ok(_) => folders.push(entry.path().to_path_buf()),
            Err(e) => warn!("{}", e),
        }
    }
    folders
}
