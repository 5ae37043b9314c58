/// The datafiles module reads and writes the catalog sidecars: `cd-info.json` inside every looked-up
/// folder and the `cd-infos.json` summary table at each search root.
use crate::catalog::{CDLookupRecord, SummaryRow};
use crate::error::{Result, TagsortError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const CD_INFO_FILENAME: &str = "cd-info.json";
pub const CD_INFOS_FILENAME: &str = "cd-infos.json";

pub fn lookup_record_path(folder: &Path) -> PathBuf {
    folder.join(CD_INFO_FILENAME)
}

pub fn summary_path(root: &Path) -> PathBuf {
    root.join(CD_INFOS_FILENAME)
}

/// Read the sidecar of a folder. A missing sidecar is `None`; so is a corrupt one, which is logged
/// and will be overwritten by the next successful lookup.
pub fn read_lookup_record(folder: &Path) -> Result<Option<CDLookupRecord>> {
    _read_json(&lookup_record_path(folder))
}

pub fn write_lookup_record(folder: &Path, record: &CDLookupRecord) -> Result<()> {
    _write_json(&lookup_record_path(folder), record)
}

/// Remove the sidecar of a folder, if any.
pub fn delete_lookup_record(folder: &Path) -> Result<bool> {
    let path = lookup_record_path(folder);
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(TagsortError::fs_failure(path, e)),
    }
}

pub fn read_summary(root: &Path) -> Result<Vec<SummaryRow>> {
    Ok(_read_json(&summary_path(root))?.unwrap_or_default())
}

pub fn write_summary(root: &Path, rows: &[SummaryRow]) -> Result<()> {
    _write_json(&summary_path(root), &rows)
}

fn _read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TagsortError::fs_failure(path, e)),
    };

    match serde_json::from_str::<T>(&contents) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Failed to parse {}: {}. Ignoring it.", path.display(), e);
            Ok(None)
        }
    }
}

fn _write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| TagsortError::fs_failure(path, e))?;
    Ok(())
}
