use shared::domain::{ColumnId, ItemId, UserId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board name must not be empty")]
    EmptyBoardName,
    #[error("item text must not be empty")]
    EmptyText,
    #[error("item {item_id} not found in column {column_id}")]
    ItemNotFound { column_id: ColumnId, item_id: ItemId },
    #[error("user {user_id} did not create item {item_id}")]
    NotItemCreator { item_id: ItemId, user_id: UserId },
}
