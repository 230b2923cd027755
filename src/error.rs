use thiserror::Error;

/// Errors returned to callers of the job service.
///
/// Every failure maps to one of four kinds. None of them is swallowed by
/// the core; `StoreUnavailable` is only surfaced after the append retry
/// has been spent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Missing or malformed input. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The job is not in the state the operation requires.
    #[error("{0}")]
    InvalidTransition(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl BoardError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BoardError::Validation(_) => "ValidationError",
            BoardError::NotFound(_) => "NotFound",
            BoardError::InvalidTransition(_) => "InvalidTransition",
            BoardError::StoreUnavailable(_) => "StoreUnavailable",
        }
    }
}

/// Errors raised by a [`Datastore`](crate::store::Datastore) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatastoreError {
    /// Row or column does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient I/O failure (network, timeout, server error).
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl From<DatastoreError> for BoardError {
    fn from(err: DatastoreError) -> Self {
        match err {
            DatastoreError::NotFound(msg) => BoardError::NotFound(msg),
            DatastoreError::Unavailable(msg) => BoardError::StoreUnavailable(msg),
        }
    }
}

impl From<reqwest::Error> for DatastoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            DatastoreError::NotFound(err.to_string())
        } else {
            DatastoreError::Unavailable(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_display_is_the_bare_reason() {
        let err = BoardError::InvalidTransition("job is not available".into());
        assert_eq!(err.to_string(), "job is not available");
        assert_eq!(err.kind(), "InvalidTransition");
    }

    #[test]
    fn datastore_errors_map_to_board_kinds() {
        let err: BoardError = DatastoreError::NotFound("row 7".into()).into();
        assert_eq!(err, BoardError::NotFound("row 7".into()));

        let err: BoardError = DatastoreError::Unavailable("timeout".into()).into();
        assert_eq!(err.kind(), "StoreUnavailable");
        assert_eq!(err.to_string(), "store unavailable: timeout");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BoardError>();
        assert_send_sync::<DatastoreError>();
        assert_send_sync::<ConfigError>();
    }
}
