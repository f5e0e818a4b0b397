//! Settings stored at `~/.config/ModState/settings.json`.
//!
//! Tells the front end how to reach the backend, the catalog and the
//! durable storage file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_CATALOG_URL;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Backend program followed by its arguments.
    pub backend_command: Vec<String>,
    /// Base URL of the package registry.
    pub catalog_url: String,
    /// Durable storage file for queries and colours.
    pub storage_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_command: Vec::new(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            storage_path: Self::data_dir().join("storage.json"),
        }
    }
}

impl Settings {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_dir().join("settings.json"))
    }

    /// Load from `path`. A missing file yields defaults; a malformed one is
    /// an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings at {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings at {:?}", path))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
    }

    /// Config directory path (`~/.config/ModState/`).
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("ModState")
    }

    /// Data directory path (`~/.local/share/ModState/`).
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("ModState")
    }
}
