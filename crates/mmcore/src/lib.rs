//! Client-side state core for the mod manager.
//!
//! Keeps games, profiles, categories and the persisted search queries
//! consistent with the backend process. See [`orchestrator`] for the refresh
//! cascade and [`persisted`] for how user preferences survive restarts.

pub mod catalog;
pub mod error;
pub mod gateway;
pub mod models;
pub mod orchestrator;
pub mod persisted;
pub mod query;
pub mod reactive;
pub mod settings;
pub mod state;
pub mod storage;
pub mod theme;

pub use error::{Error, Result};
pub use orchestrator::Orchestrator;
pub use state::AppState;
