//! Command gateway to the backend process.
//!
//! The backend owns mod installation and is the source of truth for which
//! game and profile are active. Everything here talks to it by command name
//! with a JSON argument object and gets a JSON payload (or an error) back.

pub mod process;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

pub use process::ProcessGateway;

/// Backend command names.
pub mod commands {
    /// `{}` -> `GameInfo`
    pub const GET_GAME_INFO: &str = "get_game_info";
    /// `{ slug }` -> `()`
    pub const SET_ACTIVE_GAME: &str = "set_active_game";
    /// `{ slug }` -> `()`
    pub const FAVORITE_GAME: &str = "favorite_game";
    /// `{}` -> `ProfilesInfo`
    pub const GET_PROFILE_INFO: &str = "get_profile_info";
    /// `{ index }` -> `()`
    pub const SET_ACTIVE_PROFILE: &str = "set_active_profile";
}

#[async_trait]
pub trait CommandGateway: Send + Sync {
    /// Send `command` with `args` and wait for the backend's answer.
    async fn invoke(&self, command: &str, args: Value) -> Result<Value>;
}

/// Invoke a command and decode its payload into `T`.
pub async fn invoke_as<T: DeserializeOwned>(
    gateway: &dyn CommandGateway,
    command: &str,
    args: Value,
) -> Result<T> {
    let payload = gateway.invoke(command, args).await?;
    Ok(serde_json::from_value(payload)?)
}
