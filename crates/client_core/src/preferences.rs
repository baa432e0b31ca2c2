//! Per-user display preferences, kept in a small TOML file.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Classic,
    Cyberpunk,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Classic => Theme::Cyberpunk,
            Theme::Cyberpunk => Theme::Classic,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Classic => "classic",
            Theme::Cyberpunk => "cyberpunk",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
}

impl Preferences {
    /// Missing or unreadable files fall back to the defaults.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read preferences");
                return Self::default();
            }
        };
        toml::from_str(&raw).unwrap_or_else(|err| {
            warn!(path = %path.display(), %err, "ignoring malformed preferences");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        let raw = toml::to_string(self).context("failed to encode preferences")?;
        fs::write(path, raw).with_context(|| format!("failed to write '{}'", path.display()))
    }

    /// Switches theme and persists the result.
    pub fn toggle_theme(&mut self, path: &Path) -> Result<Theme> {
        self.theme = self.theme.toggled();
        self.save(path)?;
        Ok(self.theme)
    }
}

#[cfg(test)]
#[path = "tests/preferences_tests.rs"]
mod tests;
