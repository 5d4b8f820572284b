//! Application and sync engine configuration.
//!
//! `AppConfig` is the persisted JSON file the CLI reads; `SyncEngineConfig`
//! is the runtime knob set the engine is built with.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};

pub const ENV_SUPABASE_URL: &str = "FINMANAGER_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "FINMANAGER_SUPABASE_ANON_KEY";
pub const ENV_DB_PATH: &str = "FINMANAGER_DB_PATH";

const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 15;

/// Runtime settings for the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEngineConfig {
    /// Upper bound on one remote call; expiry counts as unreachable
    pub remote_timeout: Duration,
    /// Periodic drain trigger, off when `None`
    pub sync_interval: Option<Duration>,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            sync_interval: None,
        }
    }
}

/// Persisted application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub remote_timeout_secs: Option<u64>,
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
}

impl AppConfig {
    /// Read the config at `path`; a missing file is an empty config.
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Overlay `FINMANAGER_*` variables from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, keyed by the `FINMANAGER_*` names.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = normalize_text_option(lookup(ENV_SUPABASE_URL)) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY)) {
            self.supabase_anon_key = Some(key);
        }
        if let Some(path) = normalize_text_option(lookup(ENV_DB_PATH)) {
            self.db_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Supabase URL and anon key, when both are configured.
    ///
    /// Setting only one of the two is an error.
    pub fn supabase(&self) -> Result<Option<(String, String)>, String> {
        let url = normalize_text_option(self.supabase_url.clone());
        let anon_key = normalize_text_option(self.supabase_anon_key.clone());

        match (url, anon_key) {
            (None, None) => Ok(None),
            (Some(url), Some(anon_key)) => {
                if is_http_url(&url) {
                    Ok(Some((url.trim_end_matches('/').to_string(), anon_key)))
                } else {
                    Err("supabase_url must include http:// or https://".to_string())
                }
            }
            (Some(_), None) => Err("supabase_anon_key is required with supabase_url".to_string()),
            (None, Some(_)) => Err("supabase_url is required with supabase_anon_key".to_string()),
        }
    }

    pub fn sync_engine_config(&self) -> SyncEngineConfig {
        let defaults = SyncEngineConfig::default();
        SyncEngineConfig {
            remote_timeout: self
                .remote_timeout_secs
                .filter(|secs| *secs > 0)
                .map_or(defaults.remote_timeout, Duration::from_secs),
            sync_interval: self
                .sync_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    fn normalize(&mut self) {
        self.supabase_url = normalize_text_option(self.supabase_url.clone())
            .map(|url| url.trim_end_matches('/').to_string());
        self.supabase_anon_key = normalize_text_option(self.supabase_anon_key.clone());
        self.db_path = self
            .db_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty_config() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load_from_path(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn roundtrip_normalizes_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("finmanager").join("config.json");

        let config = AppConfig {
            supabase_url: Some(" https://project.supabase.co/ ".to_string()),
            supabase_anon_key: Some(" anon ".to_string()),
            db_path: Some(PathBuf::new()),
            remote_timeout_secs: Some(5),
            sync_interval_secs: None,
        };
        config.save_to_path(&path).unwrap();

        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(
            loaded.supabase_url.as_deref(),
            Some("https://project.supabase.co")
        );
        assert_eq!(loaded.supabase_anon_key.as_deref(), Some("anon"));
        assert_eq!(loaded.db_path, None);
        assert_eq!(loaded.remote_timeout_secs, Some(5));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_token": "x"}"#).unwrap();

        let error = AppConfig::load_from_path(&path).unwrap_err();
        assert!(error.contains("unknown field"));
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_SUPABASE_URL, "https://override.supabase.co"),
            (ENV_DB_PATH, "/tmp/finmanager.db"),
            (ENV_SUPABASE_ANON_KEY, "  "),
        ]);
        let config = AppConfig {
            supabase_url: Some("https://file.supabase.co".to_string()),
            supabase_anon_key: Some("file-key".to_string()),
            ..AppConfig::default()
        }
        .with_overrides_from(|key| env.get(key).map(ToString::to_string));

        assert_eq!(
            config.supabase().unwrap(),
            Some((
                "https://override.supabase.co".to_string(),
                "file-key".to_string()
            ))
        );
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/finmanager.db")));
    }

    #[test]
    fn supabase_requires_both_values() {
        let url_only = AppConfig {
            supabase_url: Some("https://project.supabase.co".to_string()),
            ..AppConfig::default()
        };
        assert!(url_only.supabase().is_err());
        assert_eq!(AppConfig::default().supabase().unwrap(), None);

        let bad_url = AppConfig {
            supabase_url: Some("project.supabase.co".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            ..AppConfig::default()
        };
        assert!(bad_url.supabase().is_err());
    }

    #[test]
    fn sync_engine_config_defaults_and_overrides() {
        assert_eq!(
            AppConfig::default().sync_engine_config(),
            SyncEngineConfig::default()
        );

        let config = AppConfig {
            remote_timeout_secs: Some(3),
            sync_interval_secs: Some(60),
            ..AppConfig::default()
        };
        let engine = config.sync_engine_config();
        assert_eq!(engine.remote_timeout, Duration::from_secs(3));
        assert_eq!(engine.sync_interval, Some(Duration::from_secs(60)));
    }
}
