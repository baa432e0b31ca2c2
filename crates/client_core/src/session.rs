use std::{sync::Arc, time::Duration};

use shared::domain::{BoardId, ColumnId, ItemId, UserId};
use tokio::{
    sync::{broadcast, Mutex},
    task::{JoinHandle, JoinSet},
    time::MissedTickBehavior,
};
use tracing::{debug, warn};

use crate::{BoardSyncController, ClientEvent, DocumentStore, SyncError};

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub tick_interval: Duration,
    /// How long a freshly added item keeps its entry-animation flag.
    pub new_flag_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            new_flag_delay: Duration::from_secs(1),
        }
    }
}

/// One open board view: the controller plus the tasks feeding it.
///
/// The subscription pump, the countdown ticker and any pending flag
/// clears are aborted on [`BoardSession::close`] or drop, so nothing
/// reaches the controller after teardown. Viewing another board means
/// opening another session.
pub struct BoardSession {
    controller: Arc<BoardSyncController>,
    options: SessionOptions,
    pump: JoinHandle<()>,
    ticker: JoinHandle<()>,
    background: Mutex<JoinSet<()>>,
}

impl BoardSession {
    pub async fn open(
        store: Arc<dyn DocumentStore>,
        user_id: UserId,
        board_id: BoardId,
    ) -> Result<Self, SyncError> {
        let controller = BoardSyncController::new(store, user_id, board_id);
        Self::open_with(controller, SessionOptions::default()).await
    }

    pub async fn open_with(
        controller: Arc<BoardSyncController>,
        options: SessionOptions,
    ) -> Result<Self, SyncError> {
        controller.load().await?;
        let mut subscription = controller
            .store()
            .subscribe(controller.board_id())
            .await
            .map_err(SyncError::from_store)?;

        let pump_controller = Arc::clone(&controller);
        let pump = tokio::spawn(async move {
            while let Some(change) = subscription.next().await {
                pump_controller.apply_change(change).await;
                if pump_controller.terminal().await.is_some() {
                    return;
                }
            }
            warn!(board_id = %pump_controller.board_id(), "board feed closed");
            pump_controller.notice("lost connection to the board");
        });

        let tick_controller = Arc::clone(&controller);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(options.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match tick_controller.tick().await {
                    Some(phase) if phase.is_revealed() => break,
                    Some(_) => {}
                    // Terminal, or nothing loaded.
                    None if tick_controller.terminal().await.is_some() => break,
                    None => {}
                }
            }
            debug!(board_id = %tick_controller.board_id(), "countdown ticker stopped");
        });

        Ok(Self {
            controller,
            options,
            pump,
            ticker,
            background: Mutex::new(JoinSet::new()),
        })
    }

    pub fn controller(&self) -> &Arc<BoardSyncController> {
        &self.controller
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.controller.subscribe_events()
    }

    /// Adds an item and schedules clearing its entry-animation flag.
    pub async fn add_item(&self, column_id: ColumnId, text: &str) -> Result<ItemId, SyncError> {
        let item_id = self.controller.add_item(column_id, text).await?;

        let controller = Arc::clone(&self.controller);
        let delay = self.options.new_flag_delay;
        let pending = item_id.clone();
        self.background.lock().await.spawn(async move {
            tokio::time::sleep(delay).await;
            controller.clear_new_flag(&pending).await;
        });
        Ok(item_id)
    }

    /// Waits for scheduled background writes, then tears the session down.
    pub async fn finish(mut self) {
        let background = self.background.get_mut();
        while background.join_next().await.is_some() {}
        self.shutdown();
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.pump.abort();
        self.ticker.abort();
        self.background.get_mut().abort_all();
    }
}

impl Drop for BoardSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
