//! Typed settings with defaults and validation.
//!
//! The host persists settings as a flat string map (see
//! [`Settings::to_map`]); [`Settings::from_map`] applies defaults for
//! missing keys and validates the numeric ones up front, so nothing
//! downstream has to re-parse strings. [`Settings::load`] and
//! [`Settings::save`] read and write that map as `settings.json` in a
//! config directory.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::history::DEFAULT_MAX_HISTORY_LINES;

/// File name of the persisted settings map.
pub const SETTINGS_FILE: &str = "settings.json";

pub const DEFAULT_LLM_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_LLM_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SUMMARY_TRIGGER: &str = "!summary";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Setting keys, as they appear in the persisted map.
pub mod keys {
    pub const LLM_URL: &str = "llm_url";
    pub const LLM_MODEL: &str = "llm_model";
    pub const MAX_HISTORY_LINES: &str = "max_history_lines";
    pub const TEMPERATURE: &str = "temperature";
    pub const PROMPT_FILE: &str = "prompt_file";
    pub const SUMMARY_TRIGGER: &str = "summary_trigger";
    pub const TIMEOUT_SECS: &str = "timeout_secs";
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got '{value}'")]
    NotPositiveInteger { key: &'static str, value: String },
    #[error("{key} must be a number, got '{value}'")]
    NotANumber { key: &'static str, value: String },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Summarizer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Generation endpoint. Default: [`DEFAULT_LLM_URL`].
    pub llm_url: String,
    /// Model name sent with each request. Default: [`DEFAULT_LLM_MODEL`].
    pub llm_model: String,
    /// Per-conversation history cap. Default: `150`.
    pub max_history_lines: NonZeroUsize,
    /// Sampling temperature. Kept for display; not sent to the endpoint.
    pub temperature: f32,
    /// Template file, relative to the config directory. Empty means the
    /// built-in template.
    pub prompt_file: String,
    /// A message equal to this triggers a summary. Empty disables it.
    pub summary_trigger: String,
    /// Request timeout. Default: 30 seconds.
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_url: DEFAULT_LLM_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            max_history_lines: DEFAULT_MAX_HISTORY_LINES,
            temperature: DEFAULT_TEMPERATURE,
            prompt_file: String::new(),
            summary_trigger: DEFAULT_SUMMARY_TRIGGER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Build settings from a flat string map. Missing keys take defaults;
    /// unknown keys are ignored.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| map.get(key).map(|v| v.trim());

        let max_history_lines = match get(keys::MAX_HISTORY_LINES) {
            Some(v) => parse_positive(keys::MAX_HISTORY_LINES, v)?,
            None => defaults.max_history_lines,
        };
        let timeout = match get(keys::TIMEOUT_SECS) {
            Some(v) => Duration::from_secs(parse_positive(keys::TIMEOUT_SECS, v)?.get() as u64),
            None => defaults.timeout,
        };
        let temperature = match get(keys::TEMPERATURE) {
            Some(v) => v
                .parse::<f32>()
                .ok()
                .filter(|t| t.is_finite())
                .ok_or_else(|| ConfigError::NotANumber {
                    key: keys::TEMPERATURE,
                    value: v.to_string(),
                })?,
            None => defaults.temperature,
        };

        Ok(Self {
            llm_url: get(keys::LLM_URL).map_or(defaults.llm_url, str::to_string),
            llm_model: get(keys::LLM_MODEL).map_or(defaults.llm_model, str::to_string),
            max_history_lines,
            temperature,
            prompt_file: get(keys::PROMPT_FILE).map_or(defaults.prompt_file, str::to_string),
            // Not trimmed: the trigger is compared against trimmed messages,
            // so surrounding whitespace here would never match anyway.
            summary_trigger: map
                .get(keys::SUMMARY_TRIGGER)
                .cloned()
                .unwrap_or(defaults.summary_trigger),
            timeout,
        })
    }

    /// The flat string map the host persists.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        [
            (keys::LLM_URL, self.llm_url.clone()),
            (keys::LLM_MODEL, self.llm_model.clone()),
            (keys::MAX_HISTORY_LINES, self.max_history_lines.to_string()),
            (keys::TEMPERATURE, self.temperature.to_string()),
            (keys::PROMPT_FILE, self.prompt_file.clone()),
            (keys::SUMMARY_TRIGGER, self.summary_trigger.clone()),
            (keys::TIMEOUT_SECS, self.timeout.as_secs().to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// Read `settings.json` from `dir`. A missing file yields defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        Self::from_map(&read_map(dir)?)
    }

    /// Write the current settings to `settings.json` in `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        write_map(dir, &self.to_map())
    }

    /// Add defaults for any keys missing from `settings.json`, keeping
    /// values that are already set. Returns the keys that were added.
    pub fn init_file(dir: &Path) -> Result<Vec<String>, ConfigError> {
        let mut map = read_map(dir)?;
        let mut added = Vec::new();
        for (key, value) in Self::default().to_map() {
            if !map.contains_key(&key) {
                added.push(key.clone());
                map.insert(key, value);
            }
        }
        if !added.is_empty() {
            write_map(dir, &map)?;
        }
        Ok(added)
    }

    /// Resolve `prompt_file` against the host directory. `None` when no
    /// prompt file is configured.
    pub fn prompt_path(&self, dir: &Path) -> Option<PathBuf> {
        if self.prompt_file.trim().is_empty() {
            None
        } else {
            Some(dir.join(self.prompt_file.trim()))
        }
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<NonZeroUsize, ConfigError> {
    value
        .parse::<NonZeroUsize>()
        .map_err(|_| ConfigError::NotPositiveInteger {
            key,
            value: value.to_string(),
        })
}

fn read_map(dir: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let path = dir.join(SETTINGS_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
}

fn write_map(dir: &Path, map: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    let path = dir.join(SETTINGS_FILE);
    let write_err = |source| ConfigError::Write {
        path: path.clone(),
        source,
    };
    let json = serde_json::to_string_pretty(map).map_err(|e| write_err(std::io::Error::other(e)))?;
    std::fs::create_dir_all(dir).map_err(write_err)?;
    std::fs::write(&path, json).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_map_yields_defaults() {
        let settings = Settings::from_map(&BTreeMap::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.max_history_lines.get(), 150);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.llm_url, "http://localhost:11434/api/generate");
    }

    #[test]
    fn values_override_defaults() {
        let settings = Settings::from_map(&map(&[
            ("llm_url", "http://gpu-box:11434/api/generate"),
            ("llm_model", "qwen3:8b"),
            ("max_history_lines", " 40 "),
            ("temperature", "0.2"),
            ("prompt_file", "prompt.txt"),
            ("summary_trigger", ""),
            ("timeout_secs", "90"),
            ("unrelated", "ignored"),
        ]))
        .unwrap();
        assert_eq!(settings.llm_model, "qwen3:8b");
        assert_eq!(settings.max_history_lines.get(), 40);
        assert!((settings.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(settings.summary_trigger, "");
        assert_eq!(settings.timeout, Duration::from_secs(90));
    }

    #[test]
    fn rejects_non_positive_history_lines() {
        for bad in ["0", "-5", "lots", "1.5", ""] {
            let err = Settings::from_map(&map(&[("max_history_lines", bad)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::NotPositiveInteger { key: "max_history_lines", .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_bad_temperature_and_timeout() {
        assert!(matches!(
            Settings::from_map(&map(&[("temperature", "warm")])),
            Err(ConfigError::NotANumber { .. })
        ));
        assert!(matches!(
            Settings::from_map(&map(&[("timeout_secs", "0")])),
            Err(ConfigError::NotPositiveInteger { .. })
        ));
    }

    #[test]
    fn map_round_trip() {
        let settings = Settings {
            llm_model: "phi4-mini".into(),
            max_history_lines: NonZeroUsize::new(12).unwrap(),
            prompt_file: "p.txt".into(),
            ..Settings::default()
        };
        assert_eq!(Settings::from_map(&settings.to_map()).unwrap(), settings);
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load(dir.path()).unwrap(), Settings::default());
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        let err = Settings::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(SETTINGS_FILE));
    }

    #[test]
    fn init_file_keeps_existing_values() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"llm_model": "mistral:7b"}"#,
        )
        .unwrap();

        let added = Settings::init_file(dir.path()).unwrap();
        assert!(added.contains(&"llm_url".to_string()));
        assert!(!added.contains(&"llm_model".to_string()));

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.llm_model, "mistral:7b");
        assert_eq!(settings.llm_url, DEFAULT_LLM_URL);

        // Second run has nothing left to add.
        assert!(Settings::init_file(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn prompt_path_resolves_against_dir() {
        let dir = Path::new("/etc/chatsum");
        let mut settings = Settings::default();
        assert_eq!(settings.prompt_path(dir), None);
        settings.prompt_file = "prompt.txt".into();
        assert_eq!(
            settings.prompt_path(dir),
            Some(PathBuf::from("/etc/chatsum/prompt.txt"))
        );
    }
}
