use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    /// Capacity of the board event fan-out. Subscribers that fall further
    /// behind are resynced from storage.
    pub event_buffer: usize,
    /// Largest accepted request body, which bounds the size of one board.
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8443".into(),
            database_url: "sqlite://./data/retro.db".into(),
            event_buffer: 256,
            max_body_bytes: 1024 * 1024,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, &file_cfg),
            Err(error) => warn!(%error, "ignoring unreadable server.toml"),
        }
    }

    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Ok(v) = std::env::var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Ok(v) = std::env::var("APP__EVENT_BUFFER") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.event_buffer = parsed.max(1);
        }
    }
    if let Ok(v) = std::env::var("APP__MAX_BODY_BYTES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_body_bytes = parsed;
        }
    }

    settings
}

fn apply_file_settings(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
        settings.server_bind = v.to_string();
    }
    if let Some(v) = file_cfg.get("database_url").and_then(toml::Value::as_str) {
        settings.database_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("event_buffer").and_then(toml::Value::as_integer) {
        settings.event_buffer = usize::try_from(v).unwrap_or(1).max(1);
    }
    if let Some(v) = file_cfg.get("max_body_bytes").and_then(toml::Value::as_integer) {
        if let Ok(v) = usize::try_from(v) {
            settings.max_body_bytes = v;
        }
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if has_windows_drive(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_database_url)
        .replace('\\', "/");
    if has_windows_drive(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_windows_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
