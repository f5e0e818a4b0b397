//! Published game, profile, category and query state.
//!
//! [`AppState`] owns every slice. Consumers get [`Readable`] views of the
//! backend-derived slices; only the orchestrator publishes into them. The
//! two query stores and the colour preferences are user-editable and
//! persisted.

use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{Game, GameInfo, LoadState, PackageCategory, ProfileInfo, ProfilesInfo};
use crate::persisted::PersistedStore;
use crate::query::{QueryArgs, QueryKind, MOD_QUERY_KEY, PROFILE_QUERY_KEY};
use crate::reactive::{Reactive, Readable};
use crate::storage::Storage;
use crate::theme::ColorPreferences;

#[derive(Debug, Clone)]
pub struct AppState {
    games: Reactive<Vec<Game>>,
    active_game: Reactive<Option<Game>>,
    profiles: Reactive<Vec<ProfileInfo>>,
    active_profile_index: Reactive<usize>,
    active_profile: Reactive<Option<ProfileInfo>>,
    categories: Reactive<Vec<PackageCategory>>,
    games_load: Reactive<LoadState>,
    profiles_load: Reactive<LoadState>,
    categories_load: Reactive<LoadState>,
    mod_query: PersistedStore<QueryArgs>,
    profile_query: PersistedStore<QueryArgs>,
    colors: ColorPreferences,
}

impl AppState {
    /// Create the state, loading persisted queries and colours from
    /// `storage` and wiring the query reset to active-game changes.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let state = Self {
            games: Reactive::default(),
            active_game: Reactive::default(),
            profiles: Reactive::default(),
            active_profile_index: Reactive::default(),
            active_profile: Reactive::default(),
            categories: Reactive::default(),
            games_load: Reactive::default(),
            profiles_load: Reactive::default(),
            categories_load: Reactive::default(),
            mod_query: PersistedStore::create(
                Arc::clone(&storage),
                MOD_QUERY_KEY,
                QueryArgs::mod_default,
            ),
            profile_query: PersistedStore::create(
                Arc::clone(&storage),
                PROFILE_QUERY_KEY,
                QueryArgs::profile_default,
            ),
            colors: ColorPreferences::new(storage),
        };
        state.reset_queries_on_game_change();
        state
    }

    /// Standing observer: both queries go back to their defaults whenever a
    /// different game becomes active, the first published game included.
    fn reset_queries_on_game_change(&self) {
        let last_game: Mutex<Option<String>> = Mutex::new(None);
        let mod_query = self.mod_query.clone();
        let profile_query = self.profile_query.clone();

        self.active_game.subscribe(move |game: &Option<Game>| {
            let Some(game) = game else {
                return;
            };
            {
                let mut last = last_game.lock().unwrap_or_else(PoisonError::into_inner);
                if last.as_deref() == Some(game.id.as_str()) {
                    return;
                }
                *last = Some(game.id.clone());
            }

            tracing::debug!("Active game changed to '{}', resetting queries", game.id);
            mod_query.reset();
            profile_query.reset();
        });
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn games(&self) -> Readable<Vec<Game>> {
        self.games.readable()
    }

    pub fn active_game(&self) -> Readable<Option<Game>> {
        self.active_game.readable()
    }

    pub fn active_game_id(&self) -> Option<String> {
        self.active_game.with(|game| game.as_ref().map(|g| g.id.clone()))
    }

    pub fn profiles(&self) -> Readable<Vec<ProfileInfo>> {
        self.profiles.readable()
    }

    pub fn active_profile_index(&self) -> Readable<usize> {
        self.active_profile_index.readable()
    }

    pub fn active_profile(&self) -> Readable<Option<ProfileInfo>> {
        self.active_profile.readable()
    }

    pub fn categories(&self) -> Readable<Vec<PackageCategory>> {
        self.categories.readable()
    }

    pub fn games_load_state(&self) -> Readable<LoadState> {
        self.games_load.readable()
    }

    pub fn profiles_load_state(&self) -> Readable<LoadState> {
        self.profiles_load.readable()
    }

    pub fn categories_load_state(&self) -> Readable<LoadState> {
        self.categories_load.readable()
    }

    pub fn mod_query(&self) -> &PersistedStore<QueryArgs> {
        &self.mod_query
    }

    pub fn profile_query(&self) -> &PersistedStore<QueryArgs> {
        &self.profile_query
    }

    pub fn query(&self, kind: QueryKind) -> &PersistedStore<QueryArgs> {
        match kind {
            QueryKind::Mod => &self.mod_query,
            QueryKind::Profile => &self.profile_query,
        }
    }

    pub fn colors(&self) -> &ColorPreferences {
        &self.colors
    }

    // ------------------------------------------------------------------
    // Publishing (orchestrator only)
    // ------------------------------------------------------------------

    /// Replace the game list, then publish the active game.
    pub(crate) fn publish_games(&self, info: GameInfo) {
        let GameInfo { all, active, .. } = info;
        self.games.set(all);
        self.active_game.set(active);
    }

    pub(crate) fn publish_profiles(&self, info: ProfilesInfo) {
        let active = info.active_profile().cloned();
        if active.is_none() && !info.profiles.is_empty() {
            tracing::warn!(
                "Backend reported active profile {} but only {} profiles exist",
                info.active_index,
                info.profiles.len()
            );
        }

        self.profiles.set(info.profiles);
        self.active_profile_index.set(info.active_index);
        self.active_profile.set(active);
    }

    pub(crate) fn publish_categories(&self, categories: Vec<PackageCategory>) {
        self.categories.set(categories);
    }

    pub(crate) fn games_load(&self) -> &Reactive<LoadState> {
        &self.games_load
    }

    pub(crate) fn profiles_load(&self) -> &Reactive<LoadState> {
        &self.profiles_load
    }

    pub(crate) fn categories_load(&self) -> &Reactive<LoadState> {
        &self.categories_load
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortBy;
    use crate::storage::MemoryStorage;

    fn game(id: &str) -> Game {
        Game {
            id: id.to_string(),
            display_name: id.to_string(),
            aliases: Vec::new(),
            steam_id: None,
            popular: false,
            favorite: false,
        }
    }

    fn info(active: &str) -> GameInfo {
        GameInfo {
            all: vec![game("valheim"), game("lethal-company")],
            active: Some(game(active)),
            favorites: Vec::new(),
        }
    }

    fn profile(name: &str) -> ProfileInfo {
        ProfileInfo {
            name: name.to_string(),
            mod_count: 0,
            extra: Default::default(),
        }
    }

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_first_game_resets_queries() {
        let state = state();
        state.mod_query().update(|q| q.search_term = "foo".to_string());
        state.profile_query().update(|q| q.sort_by = SortBy::Name);

        state.publish_games(info("valheim"));

        assert_eq!(state.mod_query().get(), QueryArgs::mod_default());
        assert_eq!(state.profile_query().get(), QueryArgs::profile_default());
    }

    #[test]
    fn test_same_game_does_not_reset() {
        let state = state();
        state.publish_games(info("valheim"));
        state.mod_query().update(|q| q.search_term = "foo".to_string());

        state.publish_games(info("valheim"));
        assert_eq!(state.mod_query().get().search_term, "foo");

        state.publish_games(info("lethal-company"));
        assert_eq!(state.mod_query().get().search_term, "");
    }

    #[test]
    fn test_no_active_game_does_not_reset() {
        let state = state();
        state.mod_query().update(|q| q.search_term = "foo".to_string());

        let mut empty = info("valheim");
        empty.active = None;
        state.publish_games(empty);

        assert_eq!(state.mod_query().get().search_term, "foo");
        assert!(state.active_game_id().is_none());
    }

    #[test]
    fn test_publish_profiles_in_range() {
        let state = state();
        state.publish_profiles(ProfilesInfo {
            profiles: vec![profile("Default"), profile("Modded")],
            active_index: 1,
        });

        assert_eq!(state.active_profile_index().get(), 1);
        assert_eq!(state.active_profile().get().unwrap().name, "Modded");
        assert_eq!(state.profiles().get().len(), 2);
    }

    #[test]
    fn test_publish_profiles_out_of_range() {
        let state = state();
        state.publish_profiles(ProfilesInfo {
            profiles: vec![profile("Default")],
            active_index: 3,
        });

        assert_eq!(state.active_profile_index().get(), 3);
        assert!(state.active_profile().get().is_none());
    }
}
