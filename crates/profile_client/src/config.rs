use std::{collections::HashMap, fs, path::Path, time::Duration};

use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "profile.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub storage_endpoint: String,
    pub storage_bucket: String,
    pub upload_chunk_size: usize,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".into(),
            storage_endpoint: "https://firebasestorage.googleapis.com".into(),
            storage_bucket: "profile-avatars.appspot.com".into(),
            upload_chunk_size: 256 * 1024,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Loads settings from an optional TOML file, then applies env overrides.
///
/// A missing file is not an error; an unreadable or malformed one is.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

    if path.exists() {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw).map_err(|source| {
            ConfigError::Parse {
                path: path.display().to_string(),
                source,
            }
        })?;
        apply_file_values(&mut settings, &file_cfg);
    }

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.api_base_url = normalize_base_url(&settings.api_base_url);
    settings.storage_endpoint = settings
        .storage_endpoint
        .trim()
        .trim_end_matches('/')
        .to_string();
    if settings.storage_endpoint.is_empty() {
        settings.storage_endpoint = Settings::default().storage_endpoint;
    }
    Ok(settings)
}

fn apply_file_values(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("api_base_url").and_then(toml::Value::as_str) {
        settings.api_base_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("storage_endpoint").and_then(toml::Value::as_str) {
        settings.storage_endpoint = v.to_string();
    }
    if let Some(v) = file_cfg.get("storage_bucket").and_then(toml::Value::as_str) {
        settings.storage_bucket = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("upload_chunk_size")
        .and_then(toml::Value::as_integer)
        .and_then(|v| usize::try_from(v).ok())
        .filter(|v| *v > 0)
    {
        settings.upload_chunk_size = v;
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
    {
        settings.request_timeout_secs = Some(v);
    }
}

pub(crate) fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("PROFILE_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("STORAGE_ENDPOINT") {
        settings.storage_endpoint = v;
    }
    if let Some(v) = lookup("STORAGE_BUCKET") {
        settings.storage_bucket = v;
    }

    if let Some(v) = lookup("APP__UPLOAD_CHUNK_SIZE") {
        if let Ok(parsed) = v.parse::<usize>() {
            if parsed > 0 {
                settings.upload_chunk_size = parsed;
            }
        }
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }
}

pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Settings::default().api_base_url;
    }
    trimmed.to_string()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
