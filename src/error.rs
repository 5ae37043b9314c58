use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagsortError {
    #[error("Tagsort error: {0}")]
    Generic(String),
    #[error(transparent)]
    Expected(#[from] TagsortExpectedError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ID3 error: {0}")]
    Id3(#[from] id3::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors caused by user input or data on disk, as opposed to bugs or environment failures.
#[derive(Error, Debug)]
pub enum TagsortExpectedError {
    #[error("{0}")]
    Generic(String),
    #[error("Failed to parse tags of {path}: {reason}")]
    TagParseFailure { path: PathBuf, reason: String },
    #[error("Wrong update: {directive}")]
    InvalidUpdateSyntax { directive: String },
    #[error("Invalid tag: {tag}")]
    UnknownTag { tag: String },
    #[error("Invalid tag reference ~{reference} for {tag}")]
    InvalidTagReference { tag: String, reference: String },
    #[error("Incomplete metadata for {path}: no title could be derived")]
    MetadataIncomplete { path: PathBuf },
    #[error("Catalog query {query:?} failed: {reason}")]
    CatalogQueryFailure { query: String, reason: String },
    #[error("File system failure at {path}: {reason}")]
    FileSystemFailure { path: PathBuf, reason: String },
    #[error("Output path {path} is invalid: {reason}")]
    OutputPathInvalid { path: PathBuf, reason: String },
    #[error("Input path {path} is invalid: {reason}")]
    InputPathInvalid { path: PathBuf, reason: String },
    #[error("Configuration file not found ({path})")]
    ConfigNotFound { path: PathBuf },
    #[error("Failed to decode configuration file ({path}): {reason}")]
    ConfigDecode { path: PathBuf, reason: String },
    #[error("Invalid value for {key} in configuration file ({path}): {reason}")]
    InvalidConfigValue {
        path: PathBuf,
        key: String,
        reason: String,
    },
}

impl TagsortError {
    /// Whether the error must abort the whole run instead of a single file or folder.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TagsortError::Expected(
                TagsortExpectedError::InvalidUpdateSyntax { .. }
                    | TagsortExpectedError::InvalidTagReference { .. }
                    | TagsortExpectedError::UnknownTag { .. }
                    | TagsortExpectedError::OutputPathInvalid { .. }
                    | TagsortExpectedError::InputPathInvalid { .. }
                    | TagsortExpectedError::ConfigNotFound { .. }
                    | TagsortExpectedError::ConfigDecode { .. }
                    | TagsortExpectedError::InvalidConfigValue { .. }
            )
        )
    }

    pub fn fs_failure(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        TagsortExpectedError::FileSystemFailure {
            path: path.into(),
            reason: err.to_string(),
        }
        .into()
    }
}

pub type Result<T> = std::result::Result<T, TagsortError>;
