use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::Deserialize;
use url::Url;

use crate::error::{ClientError, Result};

pub const SETTINGS_FILE: &str = "storefront.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub api_token: Option<String>,
    /// `field,direction` applied when the route carries no sort parameter.
    pub default_sort: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".into(),
            api_token: None,
            default_sort: Some("id,asc".into()),
            request_timeout_secs: 30,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();
    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub fn load_settings_from(path: &Path) -> Result<ClientSettings> {
    let raw = fs::read_to_string(path)
        .map_err(|e| ClientError::Config(format!("failed to read {}: {e}", path.display())))?;
    let mut settings = ClientSettings::default();
    apply_file(&mut settings, &raw);
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!("ignoring unparseable {SETTINGS_FILE}");
        return;
    };
    if let Some(v) = file_cfg.get("api_url").and_then(toml::Value::as_str) {
        settings.api_base_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("api_token").and_then(toml::Value::as_str) {
        settings.api_token = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("default_sort").and_then(toml::Value::as_str) {
        settings.default_sort = non_blank(v);
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
    {
        if let Ok(v) = u64::try_from(v) {
            settings.request_timeout_secs = v;
        }
    }
}

fn apply_env(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("STOREFRONT_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = var("STOREFRONT_API_TOKEN") {
        settings.api_token = non_blank(&v);
    }
    if let Some(v) = var("APP__API_TOKEN") {
        settings.api_token = non_blank(&v);
    }

    if let Some(v) = var("APP__DEFAULT_SORT") {
        settings.default_sort = non_blank(&v);
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
}

fn non_blank(v: &str) -> Option<String> {
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Trims, drops trailing slashes and checks the result is an http(s) URL.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(ClientSettings::default().api_base_url);
    }
    let parsed = Url::parse(trimmed)
        .map_err(|e| ClientError::Config(format!("invalid api url {trimmed:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::Config(format!(
            "unsupported api url scheme {:?}",
            parsed.scheme()
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
