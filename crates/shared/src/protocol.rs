use serde::{Deserialize, Serialize};

use crate::{
    domain::{Board, BoardId, UserId},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBoardResponse {
    pub board_id: BoardId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardsQuery {
    pub created_by: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBoardQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeQuery {
    pub board_id: BoardId,
}

/// Frames pushed to board subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    BoardUpdated { board: Board },
    BoardDeleted { board_id: BoardId },
    Error(ApiError),
}

impl ServerEvent {
    pub fn board_id(&self) -> Option<&BoardId> {
        match self {
            ServerEvent::BoardUpdated { board } => Some(&board.id),
            ServerEvent::BoardDeleted { board_id } => Some(board_id),
            ServerEvent::Error(_) => None,
        }
    }
}
