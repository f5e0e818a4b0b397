//! Error type shared by the gateway, catalog, storage and orchestrator.

/// Errors surfaced by the state core.
///
/// Backend and network failures propagate to whoever triggered the refresh.
/// Corrupt persisted data never reaches this type; it is recovered in
/// [`crate::persisted`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend answered a command with an error.
    #[error("backend command '{command}' failed: {message}")]
    Command { command: String, message: String },

    /// The backend process went away before answering.
    #[error("command gateway is closed")]
    GatewayClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catalog request failed or returned a non-success status.
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Durable storage could not be written.
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display() {
        let err = Error::Command {
            command: "set_active_game".to_string(),
            message: "unknown game".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "backend command 'set_active_game' failed: unknown game"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
