/// The config module provides the config spec and parsing logic.
///
/// The configuration file is optional. We emit detailed errors when an invalid value is found and
/// warnings for unrecognized keys. Command line flags override whatever the file says.
use crate::error::{Result, TagsortError, TagsortExpectedError};
use crate::musicbrainz::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::normalize::NormalizationRules;
use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml::{Table, Value};

const NORMALIZE_KEYS: &[&str] = &["filler_phrases", "noise_patterns"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub base_url: String,
    pub user_agent: String,
    pub pacing: Duration,
    pub max_retries: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pacing: Duration::from_millis(100),
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub normalize: NormalizationRules,
    pub catalog: CatalogConfig,
    /// `stderr` or `file`.
    pub log_output: String,
    pub max_filename_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            normalize: NormalizationRules::default(),
            catalog: CatalogConfig::default(),
            log_output: "stderr".to_string(),
            max_filename_bytes: 180,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tagsort").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Parse the file at `config_path_override`, or the default location. Only an explicitly
    /// requested file must exist.
    pub fn parse(config_path_override: Option<&Path>) -> Result<Config> {
        let (cfgpath, explicit) = match config_path_override {
            Some(p) => (_expand_path(p), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Config::default()),
            },
        };

        let contents = match fs::read_to_string(&cfgpath) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if explicit {
                    return Err(TagsortExpectedError::ConfigNotFound { path: cfgpath }.into());
                }
                tracing::debug!("No configuration file at {}, using defaults", cfgpath.display());
                return Ok(Config::default());
            }
            Err(e) => return Err(TagsortError::fs_failure(cfgpath, e)),
        };

        Self::parse_str(&cfgpath, &contents)
    }

    pub fn parse_str(cfgpath: &Path, contents: &str) -> Result<Config> {
        let mut data: Table = toml::from_str(contents).map_err(|e| TagsortExpectedError::ConfigDecode {
            path: cfgpath.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut config = Config::default();
        let mut unrecognized = Vec::new();

        if let Some(value) = data.remove("log_output") {
            let output = _as_str(cfgpath, "log_output", &value)?;
            if output != "stderr" && output != "file" {
                return Err(_invalid(cfgpath, "log_output", format!("must be stderr or file, got {output:?}")));
            }
            config.log_output = output.to_string();
        }

        if let Some(value) = data.remove("max_filename_bytes") {
            let bytes = _as_int(cfgpath, "max_filename_bytes", &value)?;
            if bytes < 16 {
                return Err(_invalid(cfgpath, "max_filename_bytes", "must be at least 16".to_string()));
            }
            config.max_filename_bytes = bytes as usize;
        }

        if let Some(value) = data.remove("normalize") {
            let Value::Table(table) = value else {
                return Err(_invalid(cfgpath, "normalize", "must be a table".to_string()));
            };
            for (key, value) in &table {
                if !NORMALIZE_KEYS.contains(&key.as_str()) {
                    _collect_unrecognized(&format!("normalize.{key}"), value, &mut unrecognized);
                }
            }
            config.normalize = Value::Table(table)
                .try_into::<NormalizationRules>()
                .map_err(|e| _invalid(cfgpath, "normalize", e.to_string()))?;
        }

        if let Some(value) = data.remove("catalog") {
            let Value::Table(mut table) = value else {
                return Err(_invalid(cfgpath, "catalog", "must be a table".to_string()));
            };
            if let Some(value) = table.remove("base_url") {
                let url = _as_str(cfgpath, "catalog.base_url", &value)?;
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(_invalid(cfgpath, "catalog.base_url", format!("not an http(s) URL: {url:?}")));
                }
                config.catalog.base_url = url.to_string();
            }
            if let Some(value) = table.remove("user_agent") {
                let agent = _as_str(cfgpath, "catalog.user_agent", &value)?;
                if agent.trim().is_empty() {
                    return Err(_invalid(cfgpath, "catalog.user_agent", "must not be empty".to_string()));
                }
                config.catalog.user_agent = agent.to_string();
            }
            if let Some(value) = table.remove("pacing_ms") {
                config.catalog.pacing = Duration::from_millis(_as_int(cfgpath, "catalog.pacing_ms", &value)? as u64);
            }
            if let Some(value) = table.remove("max_retries") {
                let retries = _as_int(cfgpath, "catalog.max_retries", &value)?;
                config.catalog.max_retries =
                    u32::try_from(retries).map_err(|e| _invalid(cfgpath, "catalog.max_retries", e.to_string()))?;
            }
            for (key, value) in &table {
                _collect_unrecognized(&format!("catalog.{key}"), value, &mut unrecognized);
            }
        }

        for (key, value) in &data {
            _collect_unrecognized(key, value, &mut unrecognized);
        }
        if !unrecognized.is_empty() {
            tracing::warn!("Unrecognized options found in configuration file: {}", unrecognized.join(", "));
        }

        Ok(config)
    }
}

fn _expand_path(p: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref())
}

/// Walk down nested tables so that unknown keys are reported by their full dotted accessor.
fn _collect_unrecognized(accessor: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Table(table) if !table.is_empty() => {
            for (k, v) in table {
                _collect_unrecognized(&format!("{accessor}.{k}"), v, out);
            }
        }
        _ => out.push(accessor.to_string()),
    }
}

fn _invalid(cfgpath: &Path, key: &str, reason: String) -> TagsortError {
    TagsortExpectedError::InvalidConfigValue {
        path: cfgpath.to_path_buf(),
        key: key.to_string(),
        reason,
    }
    .into()
}

fn _as_str<'a>(cfgpath: &Path, key: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| _invalid(cfgpath, key, format!("must be a string, got {}", value.type_str())))
}

fn _as_int(cfgpath: &Path, key: &str, value: &Value) -> Result<i64> {
    match value.as_integer() {
        Some(i) if i >= 0 => Ok(i),
        Some(i) => Err(_invalid(cfgpath, key, format!("must not be negative, got {i}"))),
        None => Err(_invalid(cfgpath, key, format!("must be an integer, got {}", value.type_str()))),
    }
}
