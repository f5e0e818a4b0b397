//! Refresh cascade between the backend, the catalog and [`AppState`].
//!
//! Every mutation is a round trip: tell the backend, then re-derive the
//! dependent state from it. Nothing is patched locally.
//!
//! ```text
//! set_active_game / favorite_game ─┐
//!                                  ├─> refresh_games ─┬─> refresh_profiles
//!                          init ───┘                  └─> refresh_categories
//! set_active_profile ────────────────────────────────────> refresh_profiles
//! ```
//!
//! Refreshes of one resource are serialized: a later request always
//! publishes after an earlier one, so a slow response can never overwrite a
//! newer one. Different resources refresh concurrently.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;

use crate::catalog::CategorySource;
use crate::error::Result;
use crate::gateway::{commands, invoke_as, CommandGateway};
use crate::models::{GameInfo, LoadState, ProfilesInfo};
use crate::reactive::Reactive;
use crate::state::AppState;

pub struct Orchestrator {
    gateway: Arc<dyn CommandGateway>,
    catalog: Arc<dyn CategorySource>,
    state: AppState,
    games_lock: Mutex<()>,
    profiles_lock: Mutex<()>,
    categories_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn CommandGateway>,
        catalog: Arc<dyn CategorySource>,
        state: AppState,
    ) -> Self {
        Self {
            gateway,
            catalog,
            state,
            games_lock: Mutex::new(()),
            profiles_lock: Mutex::new(()),
            categories_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// First load at startup.
    pub async fn init(&self) -> Result<()> {
        tracing::info!("Loading initial state");
        self.refresh_games().await
    }

    /// Re-read games and favourites, publish the active game, then refresh
    /// profiles and categories for it. Returns once both dependents finish.
    pub async fn refresh_games(&self) -> Result<()> {
        let _guard = self.games_lock.lock().await;
        self.refresh_games_locked().await
    }

    /// Ask the backend to switch games, then resynchronize everything.
    pub async fn set_active_game(&self, game_id: &str) -> Result<()> {
        let _guard = self.games_lock.lock().await;
        tracing::info!("Switching active game to '{game_id}'");
        self.gateway
            .invoke(commands::SET_ACTIVE_GAME, json!({ "slug": game_id }))
            .await?;
        self.refresh_games_locked().await
    }

    /// Toggle a game's favourite flag on the backend, then re-derive the
    /// flags from the new snapshot.
    pub async fn favorite_game(&self, game_id: &str) -> Result<()> {
        let _guard = self.games_lock.lock().await;
        tracing::info!("Toggling favourite for '{game_id}'");
        self.gateway
            .invoke(commands::FAVORITE_GAME, json!({ "slug": game_id }))
            .await?;
        self.refresh_games_locked().await
    }

    /// Re-read the profile envelope of the active game.
    pub async fn refresh_profiles(&self) -> Result<()> {
        let _guard = self.profiles_lock.lock().await;
        self.refresh_profiles_locked().await
    }

    /// Ask the backend to switch profiles, then re-read them. The published
    /// active profile only changes once the backend has confirmed.
    pub async fn set_active_profile(&self, index: usize) -> Result<()> {
        let _guard = self.profiles_lock.lock().await;
        tracing::info!("Switching active profile to #{index}");
        self.gateway
            .invoke(commands::SET_ACTIVE_PROFILE, json!({ "index": index }))
            .await?;
        self.refresh_profiles_locked().await
    }

    /// Re-read the categories of the active game from the catalog.
    ///
    /// Without an active game this does nothing: no request is made and the
    /// published categories are left as they are.
    pub async fn refresh_categories(&self) -> Result<()> {
        let _guard = self.categories_lock.lock().await;

        let Some(game_id) = self.state.active_game_id() else {
            tracing::debug!("No active game, skipping category refresh");
            return Ok(());
        };

        tracked(self.state.categories_load(), async {
            let categories = self.catalog.categories(&game_id).await?;
            self.state.publish_categories(categories);
            Ok(())
        })
        .await
    }

    async fn refresh_games_locked(&self) -> Result<()> {
        tracked(self.state.games_load(), async {
            let mut info: GameInfo =
                invoke_as(self.gateway.as_ref(), commands::GET_GAME_INFO, json!({})).await?;
            info.stamp_favorites();
            tracing::debug!(
                "Loaded {} games, active: {:?}",
                info.all.len(),
                info.active.as_ref().map(|g| g.id.as_str())
            );
            self.state.publish_games(info);
            Ok(())
        })
        .await?;

        let (profiles, categories) =
            tokio::join!(self.refresh_profiles(), self.refresh_categories());
        profiles.and(categories)
    }

    async fn refresh_profiles_locked(&self) -> Result<()> {
        tracked(self.state.profiles_load(), async {
            let info: ProfilesInfo =
                invoke_as(self.gateway.as_ref(), commands::GET_PROFILE_INFO, json!({})).await?;
            tracing::debug!(
                "Loaded {} profiles, active #{}",
                info.profiles.len(),
                info.active_index
            );
            self.state.publish_profiles(info);
            Ok(())
        })
        .await
    }
}

/// Run `work` with `load` showing `Loading`; `Ready` on success, the
/// previous state on failure.
async fn tracked<F>(load: &Reactive<LoadState>, work: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let previous = load.get();
    load.set(LoadState::Loading);
    match work.await {
        Ok(()) => {
            load.set(LoadState::Ready);
            Ok(())
        }
        Err(e) => {
            tracing::warn!("Refresh failed: {e}");
            load.set(previous);
            Err(e)
        }
    }
}
