//! Persisted colour preferences.
//!
//! Only the stored choice lives here; turning a choice into a palette is the
//! presentation layer's job.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::persisted::PersistedStore;
use crate::storage::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorCategory {
    Accent,
    Primary,
}

impl ColorCategory {
    pub fn key(self) -> &'static str {
        match self {
            ColorCategory::Accent => "accent",
            ColorCategory::Primary => "primary",
        }
    }

    pub fn default_setting(self) -> ColorSetting {
        let name = match self {
            ColorCategory::Accent => "green",
            ColorCategory::Primary => "slate",
        };
        ColorSetting::Default {
            name: name.to_string(),
        }
    }
}

/// A named built-in palette or a custom base colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ColorSetting {
    Default { name: String },
    Custom { hex: String },
}

impl std::fmt::Display for ColorSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorSetting::Default { name } => write!(f, "{name}"),
            ColorSetting::Custom { hex } => write!(f, "custom {hex}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColorPreferences {
    pub accent: PersistedStore<ColorSetting>,
    pub primary: PersistedStore<ColorSetting>,
}

impl ColorPreferences {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            accent: color_store(Arc::clone(&storage), ColorCategory::Accent),
            primary: color_store(storage, ColorCategory::Primary),
        }
    }

    pub fn get(&self, category: ColorCategory) -> &PersistedStore<ColorSetting> {
        match category {
            ColorCategory::Accent => &self.accent,
            ColorCategory::Primary => &self.primary,
        }
    }
}

fn color_store(storage: Arc<dyn Storage>, category: ColorCategory) -> PersistedStore<ColorSetting> {
    PersistedStore::create(storage, category.key(), move || category.default_setting())
}
