//! Reactive values backed by durable storage.
//!
//! A [`PersistedStore`] is seeded from [`Storage`] by key and writes every
//! later value back under the same key. Missing or undecodable entries are
//! equivalent to "no stored preference": the store falls back to its default
//! and never reports an error.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::reactive::Reactive;
use crate::storage::Storage;

type MakeDefault<T> = Arc<dyn Fn() -> T + Send + Sync>;

pub struct PersistedStore<T> {
    key: String,
    value: Reactive<T>,
    make_default: MakeDefault<T>,
}

impl<T> Clone for PersistedStore<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            make_default: Arc::clone(&self.make_default),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PersistedStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedStore")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> PersistedStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Read `key` from storage, or `make_default()` if it is absent or
    /// cannot be decoded.
    pub fn load(storage: &dyn Storage, key: &str, make_default: impl FnOnce() -> T) -> T {
        let Some(raw) = storage.get(key) else {
            return make_default();
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Stored value for '{key}' is unreadable, using default: {e}");
                make_default()
            }
        }
    }

    /// Build a store seeded by [`load`](Self::load) that persists every
    /// subsequent write to `storage` under `key`.
    pub fn create(
        storage: Arc<dyn Storage>,
        key: &str,
        make_default: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        let initial = Self::load(storage.as_ref(), key, &make_default);
        let value = Reactive::new(initial);

        let persist_key = key.to_string();
        value.subscribe(move |current: &T| write_through(storage.as_ref(), &persist_key, current));

        Self {
            key: key.to_string(),
            value,
            make_default: Arc::new(make_default),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> T {
        self.value.get()
    }

    pub fn set(&self, value: T) {
        self.value.set(value);
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.value.update(f);
    }

    /// Replace the value with a fresh default (persisted like any write).
    pub fn reset(&self) {
        self.value.set((self.make_default)());
    }

    pub fn default_value(&self) -> T {
        (self.make_default)()
    }

    /// Underlying reactive handle, for subscribing.
    pub fn reactive(&self) -> &Reactive<T> {
        &self.value
    }
}

fn write_through<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize '{key}': {e}");
            return;
        }
    };
    if let Err(e) = storage.set(key, &json) {
        tracing::error!("Failed to persist '{key}': {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryArgs, SortBy};
    use crate::storage::MemoryStorage;

    fn storage() -> Arc<dyn Storage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_load_missing_returns_default() {
        let storage = MemoryStorage::new();
        let query = PersistedStore::load(&storage, "modQuery", QueryArgs::mod_default);
        assert_eq!(query, QueryArgs::mod_default());
    }

    #[test]
    fn test_load_unparseable_returns_default() {
        let storage = MemoryStorage::new();
        for payload in ["", "{\"maxCount\": 2", "[1, 2, 3]", "\"text\"", "{\"sortBy\": 7}"] {
            storage.set("profileQuery", payload).unwrap();
            let query = PersistedStore::load(&storage, "profileQuery", QueryArgs::profile_default);
            assert_eq!(query, QueryArgs::profile_default(), "payload {payload:?}");
        }
    }

    #[test]
    fn test_round_trip_through_storage() {
        let storage = storage();
        let store = PersistedStore::create(Arc::clone(&storage), "modQuery", QueryArgs::mod_default);
        store.update(|q| {
            q.search_term = "bepinex".to_string();
            q.sort_by = SortBy::Downloads;
        });

        // A different default must not win over the stored value.
        let fresh = PersistedStore::create(storage, "modQuery", QueryArgs::profile_default);
        let query = fresh.get();
        assert_eq!(query.search_term, "bepinex");
        assert_eq!(query.sort_by, SortBy::Downloads);
    }

    #[test]
    fn test_keys_do_not_interfere() {
        let storage = storage();
        let mods = PersistedStore::create(Arc::clone(&storage), "modQuery", QueryArgs::mod_default);
        let profiles =
            PersistedStore::create(Arc::clone(&storage), "profileQuery", QueryArgs::profile_default);

        mods.update(|q| q.search_term = "mods".to_string());
        profiles.update(|q| q.search_term = "profile".to_string());

        assert_eq!(
            PersistedStore::load(storage.as_ref(), "modQuery", QueryArgs::mod_default).search_term,
            "mods"
        );
        assert_eq!(
            PersistedStore::load(storage.as_ref(), "profileQuery", QueryArgs::profile_default)
                .search_term,
            "profile"
        );
    }

    #[test]
    fn test_reset_persists_default() {
        let storage = storage();
        let store = PersistedStore::create(Arc::clone(&storage), "modQuery", QueryArgs::mod_default);
        store.update(|q| q.search_term = "foo".to_string());
        store.reset();

        assert_eq!(store.get(), QueryArgs::mod_default());
        assert_eq!(
            PersistedStore::load(storage.as_ref(), "modQuery", QueryArgs::profile_default),
            QueryArgs::mod_default()
        );
    }
}
