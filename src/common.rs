/// The common module is our grab bag of path helpers and logging setup shared by the pipelines and
/// the binaries.
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &[".mp3"];

static ILLEGAL_FS_CHARS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[:\?<>\\\*\|"/]+"#).unwrap());

pub fn is_audio_file(p: &Path) -> bool {
    let extension = p.extension().and_then(|s| s.to_str()).map(|s| format!(".{}", s.to_lowercase())).unwrap_or_default();
    SUPPORTED_AUDIO_EXTENSIONS.contains(&extension.as_str())
}

/// Lexically clean a path: make it absolute against the current directory and drop `.` and `..`
/// components without touching the filesystem.
pub fn clean_path(p: &Path) -> PathBuf {
    let absolute = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(p)).unwrap_or_else(|_| p.to_path_buf())
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Map a file below `source_root` to the same relative location below `target_root`.
pub fn create_target(filename: &Path, source_root: &Path, target_root: &Path) -> PathBuf {
    let filename = clean_path(filename);
    let source_root = clean_path(source_root);
    let target_root = clean_path(target_root);

    match filename.strip_prefix(&source_root) {
        Ok(rel) => target_root.join(rel),
        // A root that is itself a file maps onto its own name.
        Err(_) => target_root.join(filename.file_name().unwrap_or_default()),
    }
}

pub fn sanitize_filename(name: &str, max_filename_bytes: usize) -> String {
    let mut name = ILLEGAL_FS_CHARS_REGEX.replace_all(name, "_").trim().to_string();

    if name.len() > max_filename_bytes {
        let mut end = max_filename_bytes;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name = name[..end].trim().to_string();
    }

    name.nfc().collect::<String>()
}

/// Shorten `s` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate_display(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    format!("{head}...")
}

/// Exit code for an error that reached a binary's `main`: 2 for bad user input or configuration,
/// 1 for everything else.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<crate::error::TagsortError>() {
        Some(e) if e.is_fatal() => 2,
        _ => 1,
    }
}

// Logging initialization
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, EnvFilter};

static LOGGING_INITIALIZED: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Install the global tracing subscriber. `output` is either `stderr` or `file`; the returned guard
/// must be kept alive for file logging to flush.
pub fn initialize_logging(output: &str) -> anyhow::Result<Option<WorkerGuard>> {
    let mut initialized = LOGGING_INITIALIZED.lock().map_err(|_| anyhow::anyhow!("Logging lock poisoned"))?;
    if !initialized.insert(output.to_string()) {
        return Ok(None);
    }
    drop(initialized);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match output {
        "stderr" => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(None)
        }
        "file" => {
            let proj_dirs = ProjectDirs::from("", "", "tagsort").ok_or_else(|| anyhow::anyhow!("Failed to get project directories"))?;
            let log_dir = if cfg!(target_os = "macos") {
                proj_dirs.cache_dir()
            } else {
                proj_dirs.state_dir().unwrap_or(proj_dirs.cache_dir())
            };
            fs::create_dir_all(log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .max_log_files(10)
                .filename_prefix("tagsort")
                .filename_suffix("log")
                .build(log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(Some(guard))
        }
        other => Err(anyhow::anyhow!("Unknown log output {other:?}: expected stderr or file")),
    }
}
