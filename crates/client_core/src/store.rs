use anyhow::Result;
use async_trait::async_trait;
use shared::domain::{Board, BoardDocument, BoardId, UserId};
use tokio::sync::mpsc;

/// One delivery from a board subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardChange {
    Updated(Board),
    Removed,
}

/// Live feed of confirmed board states. Dropping it detaches from the store.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<BoardChange>,
    disposer: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<BoardChange>,
        disposer: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            disposer: Some(Box::new(disposer)),
        }
    }

    /// `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<BoardChange> {
        self.receiver.recv().await
    }

    pub fn dispose(mut self) {
        self.run_disposer();
    }

    fn run_disposer(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_disposer();
    }
}

/// Persistence and change feed for board documents.
///
/// Failures the caller can act on are reported as a
/// [`shared::error::ApiException`] inside the `anyhow::Error`; anything else
/// counts as transport trouble.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_board(&self, doc: &BoardDocument) -> Result<BoardId>;
    async fn get_board(&self, board_id: &BoardId) -> Result<Option<Board>>;
    async fn boards_by_creator(&self, user_id: &UserId) -> Result<Vec<Board>>;
    async fn board_by_join_code(&self, join_code: &str) -> Result<Option<Board>>;
    /// Whole-document overwrite.
    async fn save_board(&self, board_id: &BoardId, doc: &BoardDocument) -> Result<()>;
    /// Sets `timerSettings.visible` without touching the rest of the board.
    async fn mark_timer_visible(&self, board_id: &BoardId) -> Result<()>;
    async fn delete_board(&self, board_id: &BoardId, user_id: &UserId) -> Result<()>;
    /// The first delivery is the board's current state.
    async fn subscribe(&self, board_id: &BoardId) -> Result<Subscription>;
}
