/// The pipeline module walks input trees depth-first and, per MP3 file, copies it to the output
/// tree, resolves its canonical metadata, assigns the next track number of its directory, applies
/// update directives, and writes the result back.
///
/// A dry run goes through exactly the same steps and produces the same [`Report`]; it only skips
/// the copy, the tag write and the rename. Failures are contained per file: the file is logged and
/// listed in [`Report::skipped`], and traversal continues. Malformed user input, such as a directive
/// copying from a frame that is not there, aborts the run instead.
use crate::common::{clean_path, create_target, is_audio_file, sanitize_filename, truncate_display};
use crate::directives::{apply_directives, UpdateDirective};
use crate::error::{Result, TagsortError, TagsortExpectedError};
use crate::id3tags::{
    describe_frame, Id3File, OpenMode, OpenOutcome, TagContainer, ALBUM, ARTIST, DEFAULT_FRAMES, TITLE, TRACK,
};
use crate::normalize::NormalizationRules;
use crate::resolver::{AudioFileRecord, CurrentTags, MetadataResolver, ResolvedMetadata};
use crate::scope::{DirectoryScope, ScopeStack};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const MAX_DISPLAY_VALUE_CHARS: usize = 60;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Where edited copies go. Without it the run only inspects.
    pub output_root: Option<PathBuf>,
    pub recursive: bool,
    pub dry_run: bool,
    pub various_artists: bool,
    /// Keep only the default frames (album, artist, track, title, picture).
    pub remove_obsolete_tags: bool,
    pub update_directives: Vec<UpdateDirective>,
    /// Write the resolved artist/album/title into the copy, not just the track number.
    pub write_resolved: bool,
    /// Collect the per-frame listing and duration of every file.
    pub verbose: bool,
    pub rules: NormalizationRules,
    pub max_filename_bytes: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            output_root: None,
            recursive: false,
            dry_run: false,
            various_artists: false,
            remove_obsolete_tags: false,
            update_directives: vec![],
            write_resolved: false,
            verbose: false,
            rules: NormalizationRules::default(),
            max_filename_bytes: 180,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagLine {
    pub id: String,
    pub description: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    /// Path relative to the input root.
    pub display_name: String,
    pub target: Option<PathBuf>,
    pub open_mode: OpenMode,
    pub resolved: ResolvedMetadata,
    /// False when the title fell back to the raw filename.
    pub metadata_complete: bool,
    pub renamed_to: Option<PathBuf>,
    pub tags: Vec<TagLine>,
    pub duration_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectorySummary {
    pub path: PathBuf,
    pub tracks: u32,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub dry_run: bool,
    pub directories: Vec<DirectorySummary>,
    pub files: Vec<FileReport>,
    pub skipped: Vec<SkippedFile>,
}

impl Report {
    fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            directories: vec![],
            files: vec![],
            skipped: vec![],
        }
    }

    fn skip(&mut self, path: &Path, reason: String) {
        warn!("Skipping {}: {}", path.display(), reason);
        self.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            reason,
        });
    }

    fn close_scopes(&mut self, scopes: Vec<DirectoryScope>, various_artists: bool) {
        for scope in scopes {
            if !various_artists && scope.looks_like_compilation() {
                info!(
                    "{} has {} distinct artists, it may be a various-artists compilation",
                    scope.path().display(),
                    scope.artists().len()
                );
            }
            self.directories.push(DirectorySummary {
                path: scope.path().to_path_buf(),
                tracks: scope.track_counter(),
                artists: scope.artists().to_vec(),
            });
        }
    }

    pub fn incomplete(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| !f.metadata_complete)
    }
}

pub fn run(input_roots: &[PathBuf], options: &PipelineOptions) -> Result<Report> {
    let output_root = options.output_root.as_deref().map(validate_output_root).transpose()?;

    let mut roots = Vec::with_capacity(input_roots.len());
    for root in input_roots {
        let root = clean_path(root);
        if !root.exists() {
            return Err(TagsortExpectedError::InputPathInvalid {
                path: root,
                reason: "path does not exist".to_string(),
            }
            .into());
        }
        if output_root.as_deref() == Some(root.as_path()) {
            return Err(TagsortExpectedError::OutputPathInvalid {
                path: root,
                reason: "output path is the same as an input path".to_string(),
            }
            .into());
        }
        roots.push(root);
    }

    let resolver = MetadataResolver::new(&options.rules, options.various_artists);
    let mut state = RunState {
        options,
        output_root: output_root.as_deref(),
        resolver,
        claimed: HashSet::new(),
        report: Report::new(options.dry_run),
    };
    for root in &roots {
        info!("Scanning {}", root.display());
        state.scan_root(root)?;
    }
    let report = state.report;

    info!(
        "Processed {} files in {} directories, skipped {}{}",
        report.files.len(),
        report.directories.len(),
        report.skipped.len(),
        if options.dry_run { " (dry run)" } else { "" }
    );
    Ok(report)
}

pub fn validate_output_root(output: &Path) -> Result<PathBuf> {
    let output = clean_path(output);
    if !output.exists() {
        return Err(TagsortExpectedError::OutputPathInvalid {
            path: output,
            reason: "output path does not exist".to_string(),
        }
        .into());
    }
    if !output.is_dir() {
        return Err(TagsortExpectedError::OutputPathInvalid {
            path: output,
            reason: "output path is not a directory".to_string(),
        }
        .into());
    }
    Ok(output)
}

/// Everything that outlives a single root: the compiled resolver, the output paths written so far
/// and the report.
struct RunState<'a> {
    options: &'a PipelineOptions,
    output_root: Option<&'a Path>,
    resolver: MetadataResolver,
    /// Final output paths of the files processed so far, renames included.
    claimed: HashSet<PathBuf>,
    report: Report,
}

impl RunState<'_> {
    fn scan_root(&mut self, root: &Path) -> Result<()> {
        let options = self.options;
        // Target paths are computed relative to the directory being scanned; a single file maps
        // relative to its parent.
        let base = if root.is_file() { root.parent().unwrap_or(root).to_path_buf() } else { root.to_path_buf() };
        let max_depth = if options.recursive { usize::MAX } else { 1 };

        // Never walk into our own output when it lives inside the input tree. An output root above
        // the input root prunes nothing.
        let pruned = self.output_root.filter(|out| out.starts_with(root)).map(Path::to_path_buf);
        let walker = WalkDir::new(root)
            .max_depth(max_depth)
            .sort_by(|a, b| a.file_type().is_dir().cmp(&b.file_type().is_dir()).then_with(|| a.file_name().cmp(b.file_name())))
            .into_iter()
            .filter_entry(move |e| pruned.as_deref().map_or(true, |out| !e.path().starts_with(out)));

        let mut scopes = ScopeStack::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    self.report.skip(&path, TagsortError::fs_failure(&path, &e).to_string());
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                let left = scopes.enter(entry.path(), entry.depth());
                self.report.close_scopes(left, options.various_artists);
                info!("[{}]", entry.path().display());
                continue;
            }

            if !is_audio_file(entry.path()) {
                continue;
            }

            let depth = if entry.depth() == 0 {
                scopes.enter(&base, 0);
                1
            } else {
                entry.depth()
            };
            let left = scopes.leave_to(depth);
            self.report.close_scopes(left, options.various_artists);

            let Some(scope) = scopes.for_file(depth) else {
                self.report.skip(entry.path(), "file outside of any directory scope".to_string());
                continue;
            };

            match self.process_file(entry.path(), &base, scope) {
                Ok(file) => {
                    if options.verbose {
                        debug!("{:?}", file);
                    } else {
                        info!("{}", file.display_name);
                    }
                    self.report.files.push(file);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => self.report.skip(entry.path(), e.to_string()),
            }
        }

        let left = scopes.leave_to(0);
        self.report.close_scopes(left, options.various_artists);
        Ok(())
    }

    fn process_file(&mut self, source: &Path, base: &Path, scope: &mut DirectoryScope) -> Result<FileReport> {
        let options = self.options;
        let target = self.output_root.map(|out| create_target(source, base, out));
        if let Some(target) = &target {
            self.check_unclaimed(target)?;
        }

        // Edit a copy, never the original.
        let working = match &target {
            Some(target) if !options.dry_run => {
                copy_to_target(source, target)?;
                target.clone()
            }
            _ => source.to_path_buf(),
        };

        let limit = options.remove_obsolete_tags.then(|| DEFAULT_FRAMES.iter().map(|s| s.to_string()).collect());
        let (mut tags, open_mode) = match Id3File::open_with_fallback(&working, limit) {
            OpenOutcome::Parsed(file) => (file, OpenMode::Parsed),
            OpenOutcome::Degraded { file, reason } => {
                warn!("Could not parse tags of {} ({}), continuing with an empty tag", source.display(), reason);
                (file, OpenMode::Degraded)
            }
            OpenOutcome::Failed(e) => {
                return Err(TagsortExpectedError::TagParseFailure {
                    path: source.to_path_buf(),
                    reason: e.to_string(),
                }
                .into())
            }
        };

        let record = AudioFileRecord {
            source_path: source.to_path_buf(),
            current_tags: CurrentTags::read(&tags),
            is_directory_boundary: scope.at_boundary(),
        };
        if record.is_directory_boundary {
            debug!("First track of {}", scope.path().display());
        }

        let track_number = scope.next_track();
        let (resolved, metadata_complete) = match self.resolver.resolve(&record, scope, track_number) {
            Ok(resolved) => (resolved, true),
            Err(incomplete) => {
                warn!("{}, keeping the raw filename {:?} as title", TagsortExpectedError::from(incomplete.clone()), incomplete.raw_title);
                (incomplete.into_fallback(), false)
            }
        };
        debug!("Resolved {} to {:?}", source.display(), resolved);

        let mut renamed_to = None;
        if let Some(target) = &target {
            tags.set_text(TRACK, &track_number.to_string());
            if options.write_resolved {
                tags.set_text(ARTIST, &resolved.artist);
                tags.set_text(ALBUM, &resolved.album);
                tags.set_text(TITLE, &resolved.title);
            }

            let effects = apply_directives(&mut tags, &options.update_directives)?;
            if let Some(title) = effects.rename_to {
                renamed_to = renamed_path(target, &title, options.max_filename_bytes);
                if renamed_to.is_none() {
                    warn!("Not renaming {}: title {:?} is not a usable filename", source.display(), title);
                }
            }
            if let Some(new_path) = renamed_to.as_deref().filter(|p| *p != target.as_path()) {
                if let Err(e) = self.check_unclaimed(new_path) {
                    if !options.dry_run {
                        discard_copy(&working);
                    }
                    return Err(e);
                }
            }
        }

        let (tag_lines, duration_secs) = if options.verbose {
            (tag_lines(&tags), mp3_duration::from_path(&working).ok().map(|d| d.as_secs()))
        } else {
            (vec![], None)
        };

        if target.is_some() && !options.dry_run {
            tags.save().map_err(|e| TagsortError::fs_failure(&working, e))?;
            if let Some(new_path) = &renamed_to {
                fs::rename(&working, new_path).map_err(|e| TagsortError::fs_failure(&working, e))?;
            }
        }

        if let Some(written) = renamed_to.as_ref().or(target.as_ref()) {
            self.claimed.insert(written.clone());
        }

        Ok(FileReport {
            source: source.to_path_buf(),
            display_name: source.strip_prefix(base).unwrap_or(source).display().to_string(),
            target,
            open_mode,
            resolved,
            metadata_complete,
            renamed_to,
            tags: tag_lines,
            duration_secs,
        })
    }

    /// Fail if an earlier file of this run already ends up at `path`. Dry runs track the same
    /// claims, so they report the same collisions.
    fn check_unclaimed(&self, path: &Path) -> Result<()> {
        if self.claimed.contains(path) {
            return Err(TagsortError::fs_failure(path, "an earlier file of this run was already written there"));
        }
        Ok(())
    }
}

fn discard_copy(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

fn copy_to_target(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| TagsortError::fs_failure(parent, e))?;
        }
    }
    fs::copy(source, target).map_err(|e| TagsortError::fs_failure(target, e))?;
    Ok(())
}

/// `<title>.<ext>` next to `path`, or None if the title sanitizes to nothing.
fn renamed_path(path: &Path, title: &str, max_filename_bytes: usize) -> Option<PathBuf> {
    let extension = path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
    let stem = sanitize_filename(title, max_filename_bytes.saturating_sub(extension.len()));
    if stem.is_empty() {
        return None;
    }
    let parent = path.parent()?;
    Some(parent.join(format!("{stem}{extension}")))
}

fn tag_lines(tags: &dyn TagContainer) -> Vec<TagLine> {
    tags.frame_ids()
        .into_iter()
        .map(|id| TagLine {
            description: describe_frame(&id).unwrap_or_default().to_string(),
            value: truncate_display(&tags.display_frame(&id).unwrap_or_default(), MAX_DISPLAY_VALUE_CHARS),
            id,
        })
        .collect()
}
