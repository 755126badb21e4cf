use std::{fs, path::PathBuf, time::Duration};

use shared::{domain::TopN, protocol::DEFAULT_SERVICE_URL};
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSettings {
    pub service_url: String,
    pub default_top_n: i64,
    pub request_timeout_secs: u64,
    pub download_dir: PathBuf,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            default_top_n: i64::from(TopN::DEFAULT.get()),
            request_timeout_secs: 30,
            download_dir: default_download_dir(),
        }
    }
}

impl DashboardSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Defaults, then `dashboard.toml` in the working directory, then environment.
pub fn load_settings() -> DashboardSettings {
    let raw = fs::read_to_string(SETTINGS_FILE).ok();
    settings_from_sources(raw.as_deref(), |key| std::env::var(key).ok())
}

pub fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> DashboardSettings {
    let mut settings = DashboardSettings::default();

    if let Some(raw) = file {
        match toml::from_str::<toml::Table>(raw) {
            Ok(table) => apply_file(&mut settings, &table),
            Err(err) => warn!("ignoring malformed {SETTINGS_FILE}: {err}"),
        }
    }

    if let Some(v) = env("PREDICTION_SERVICE_URL") {
        apply_service_url(&mut settings, &v);
    }
    if let Some(v) = env("APP__SERVICE_URL") {
        apply_service_url(&mut settings, &v);
    }

    if let Some(v) = env("APP__DEFAULT_TOP_N") {
        if let Ok(parsed) = v.trim().parse::<i64>() {
            settings.default_top_n = parsed;
        }
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Some(parsed) = timeout_secs(v.trim().parse::<u64>().ok()) {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = env("APP__DOWNLOAD_DIR") {
        if !v.trim().is_empty() {
            settings.download_dir = PathBuf::from(v.trim());
        }
    }

    settings
}

fn apply_file(settings: &mut DashboardSettings, table: &toml::Table) {
    if let Some(v) = table.get("service_url").and_then(|v| v.as_str()) {
        apply_service_url(settings, v);
    }
    if let Some(v) = table.get("default_top_n").and_then(integer_value) {
        settings.default_top_n = v;
    }
    if let Some(v) = timeout_secs(
        table
            .get("request_timeout_secs")
            .and_then(integer_value)
            .and_then(|v| u64::try_from(v).ok()),
    ) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = table.get("download_dir").and_then(|v| v.as_str()) {
        settings.download_dir = PathBuf::from(v);
    }
}

// Accepts `10` as well as `"10"`.
fn integer_value(value: &toml::Value) -> Option<i64> {
    value
        .as_integer()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

// A zero timeout would fail every request.
fn timeout_secs(value: Option<u64>) -> Option<u64> {
    value.filter(|secs| *secs > 0)
}

fn apply_service_url(settings: &mut DashboardSettings, raw: &str) {
    match normalize_service_url(raw) {
        Some(url) => settings.service_url = url,
        None => warn!(value = raw, "ignoring invalid prediction service url"),
    }
}

/// Validates an http(s) base URL and strips trailing slashes so paths can be appended.
pub fn normalize_service_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
