//! Data shapes exchanged with the backend and the remote catalog.
//!
//! Field names follow the backend's camelCase JSON so payloads decode
//! without an intermediate layer.

use serde::{Deserialize, Deserializer, Serialize};

/// A supported game.
///
/// `favorite` is not sent by the backend; it is stamped on the client from
/// the favourites list of the [`GameInfo`] snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Stable key (registry community slug).
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub steam_id: Option<u32>,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub favorite: bool,
}

/// Backend snapshot of every game, the active one and the favourites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub all: Vec<Game>,
    #[serde(default)]
    pub active: Option<Game>,
    #[serde(default)]
    pub favorites: Vec<String>,
}

impl GameInfo {
    /// Stamp `favorite` on every game (and the active one) by membership in
    /// `favorites`.
    pub fn stamp_favorites(&mut self) {
        let favorites = &self.favorites;
        for game in self.all.iter_mut().chain(self.active.iter_mut()) {
            game.favorite = favorites.iter().any(|f| f == &game.id);
        }
    }
}

/// One profile of the active game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfo {
    pub name: String,
    #[serde(default)]
    pub mod_count: u32,
    /// Any extra metadata the backend attaches.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Profile envelope for the active game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilesInfo {
    pub profiles: Vec<ProfileInfo>,
    #[serde(default)]
    pub active_index: usize,
}

impl ProfilesInfo {
    /// `profiles[active_index]`, or `None` when the index is out of range.
    pub fn active_profile(&self) -> Option<&ProfileInfo> {
        self.profiles.get(self.active_index)
    }
}

/// A registry category for the active game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCategory {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    use serde::de::Error as _;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string or numeric id, found {other}"
        ))),
    }
}

/// Progress of one refreshable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}
