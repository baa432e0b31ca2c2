use board_engine::BoardError;
use shared::error::{ApiException, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("board not found")]
    NotFound,
    #[error("board was deleted")]
    Deleted,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("not permitted: {0}")]
    Forbidden(String),
    #[error("board store unavailable: {0:#}")]
    Transport(anyhow::Error),
    #[error("board view is not open")]
    Closed,
}

impl SyncError {
    /// Sorts a store failure into the cases a board view reacts to.
    pub fn from_store(err: anyhow::Error) -> Self {
        let Some(api) = err.downcast_ref::<ApiException>() else {
            return SyncError::Transport(err);
        };
        match api.code {
            ErrorCode::NotFound => SyncError::NotFound,
            ErrorCode::Validation => SyncError::Validation(api.message.clone()),
            ErrorCode::Forbidden => SyncError::Forbidden(api.message.clone()),
            ErrorCode::Internal => SyncError::Transport(err),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncError::NotFound | SyncError::Deleted)
    }
}

impl From<BoardError> for SyncError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::NotItemCreator { .. } => SyncError::Forbidden(err.to_string()),
            _ => SyncError::Validation(err.to_string()),
        }
    }
}
