use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use shared::protocol::DEFAULT_MODE;
use tracing::warn;

use crate::emulator::DEFAULT_RELEASE_DELAY;

pub const SETTINGS_FILE: &str = "relay.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub press_release_ms: u64,
    pub default_mode: String,
    pub cors_any_origin: bool,
    pub max_frame_bytes: usize,
    /// Extra symbol -> token mappings layered over the built-in key table.
    pub key_aliases: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "0.0.0.0:8079".into(),
            press_release_ms: DEFAULT_RELEASE_DELAY.as_millis() as u64,
            default_mode: DEFAULT_MODE.into(),
            cors_any_origin: true,
            max_frame_bytes: 64 * 1024,
            key_aliases: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn press_release_delay(&self) -> Duration {
        Duration::from_millis(self.press_release_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    press_release_ms: Option<u64>,
    default_mode: Option<String>,
    cors_any_origin: Option<bool>,
    max_frame_bytes: Option<usize>,
    #[serde(default)]
    key_aliases: HashMap<String, String>,
}

pub fn load_settings() -> Settings {
    let file = match read_settings_file(Path::new(SETTINGS_FILE)) {
        Ok(file) => file,
        Err(error) => {
            warn!(%error, "ignoring {SETTINGS_FILE}");
            None
        }
    };
    resolve_settings(file, |name| std::env::var(name).ok())
}

fn read_settings_file(path: &Path) -> anyhow::Result<Option<FileSettings>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read '{}'", path.display()));
        }
    };
    let parsed = toml::from_str::<FileSettings>(&raw)
        .with_context(|| format!("failed to parse '{}'", path.display()))?;
    Ok(Some(parsed))
}

/// Layers defaults, then the settings file, then environment variables.
fn resolve_settings(file: Option<FileSettings>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(file) = file {
        if let Some(v) = file.bind_addr {
            settings.server_bind = v;
        }
        if let Some(v) = file.press_release_ms {
            settings.press_release_ms = v;
        }
        if let Some(v) = file.default_mode {
            settings.default_mode = v;
        }
        if let Some(v) = file.cors_any_origin {
            settings.cors_any_origin = v;
        }
        if let Some(v) = file.max_frame_bytes {
            settings.max_frame_bytes = v;
        }
        settings.key_aliases = file.key_aliases;
    }

    if let Some(v) = env("RELAY_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("RELAY_PRESS_RELEASE_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.press_release_ms = parsed,
            Err(_) => warn!(value = %v, "RELAY_PRESS_RELEASE_MS is not a number"),
        }
    }

    if let Some(v) = env("RELAY_DEFAULT_MODE") {
        if !v.trim().is_empty() {
            settings.default_mode = v;
        }
    }

    if let Some(v) = env("RELAY_CORS_ANY_ORIGIN") {
        match parse_flag(&v) {
            Some(flag) => settings.cors_any_origin = flag,
            None => warn!(value = %v, "RELAY_CORS_ANY_ORIGIN is not a boolean"),
        }
    }

    settings
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
