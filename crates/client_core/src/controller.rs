use std::sync::Arc;

use board_engine::{
    board,
    ordering::{arrange, Arrangement, DragEnd},
    reactions::ReactionKind,
    timer::{TimerGate, TimerPhase},
    BoardError,
};
use chrono::{DateTime, Utc};
use shared::domain::{Board, BoardDocument, BoardId, ColumnId, ItemId, UserId};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{store::BoardChange, ClientEvent, DocumentStore, SyncError, Terminal};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Default)]
struct ControllerState {
    /// Last state delivered by the store.
    confirmed: Option<Board>,
    /// What the view renders: `confirmed`, or an optimistic arrangement on
    /// top of it until the next delivery.
    projection: Option<Board>,
    gate: TimerGate,
    terminal: Option<Terminal>,
}

/// Owns the local projection of one board and turns user intents into
/// whole-document writes.
///
/// Apart from drag-end, a mutation never touches the projection directly:
/// it persists the new document and waits for the store to echo it back
/// through [`BoardSyncController::apply_change`].
pub struct BoardSyncController {
    store: Arc<dyn DocumentStore>,
    user_id: UserId,
    board_id: BoardId,
    clock: Arc<dyn Clock>,
    state: Mutex<ControllerState>,
    events: broadcast::Sender<ClientEvent>,
}

impl BoardSyncController {
    pub fn new(store: Arc<dyn DocumentStore>, user_id: UserId, board_id: BoardId) -> Arc<Self> {
        Self::with_clock(store, user_id, board_id, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn DocumentStore>,
        user_id: UserId,
        board_id: BoardId,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            store,
            user_id,
            board_id,
            clock,
            state: Mutex::new(ControllerState::default()),
            events,
        })
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn projection(&self) -> Option<Board> {
        self.state.lock().await.projection.clone()
    }

    pub async fn confirmed(&self) -> Option<Board> {
        self.state.lock().await.confirmed.clone()
    }

    pub async fn terminal(&self) -> Option<Terminal> {
        self.state.lock().await.terminal
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn notice(&self, message: impl Into<String>) {
        self.emit(ClientEvent::Notice(message.into()));
    }

    /// Initial fetch. A missing board puts the view in its terminal state.
    pub async fn load(&self) -> Result<Board, SyncError> {
        let board = self
            .store
            .get_board(&self.board_id)
            .await
            .map_err(|err| self.report_failure("load board", err))?;
        let Some(board) = board else {
            self.enter_terminal(Terminal::NotFound).await;
            return Err(SyncError::NotFound);
        };
        self.apply_confirmed(board.clone()).await;
        Ok(board)
    }

    pub async fn apply_change(&self, change: BoardChange) {
        match change {
            BoardChange::Updated(board) => self.apply_confirmed(board).await,
            BoardChange::Removed => self.enter_terminal(Terminal::Deleted).await,
        }
    }

    /// Adopts a delivered state wholesale, discarding any optimistic
    /// arrangement. Replays of the same state are harmless.
    pub async fn apply_confirmed(&self, board: Board) {
        if board.id != self.board_id {
            debug!(board_id = %self.board_id, delivered = %board.id, "ignoring delivery for another board");
            return;
        }
        {
            let mut state = self.state.lock().await;
            if state.terminal.is_some() {
                return;
            }
            state.confirmed = Some(board.clone());
            state.projection = Some(board.clone());
        }
        self.emit(ClientEvent::BoardUpdated {
            board,
            confirmed: true,
        });
        self.tick().await;
    }

    async fn enter_terminal(&self, terminal: Terminal) {
        {
            let mut state = self.state.lock().await;
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(terminal);
        }
        info!(board_id = %self.board_id, ?terminal, "board view closed");
        self.emit(ClientEvent::Terminal(terminal));
    }

    /// Re-evaluates the timer against the clock. Emits the countdown while
    /// counting and `ContentRevealed` once, on the transition.
    pub async fn tick(&self) -> Option<TimerPhase> {
        let (was_revealed, step) = {
            let mut state = self.state.lock().await;
            if state.terminal.is_some() {
                return None;
            }
            let settings = state.projection.as_ref()?.doc.timer_settings.clone();
            let was_revealed = state.gate.is_revealed();
            (was_revealed, state.gate.observe(&settings, self.clock.now()))
        };

        match step.phase {
            TimerPhase::Counting { remaining_secs } => {
                self.emit(ClientEvent::Countdown { remaining_secs });
            }
            TimerPhase::Revealed if !was_revealed => self.emit(ClientEvent::ContentRevealed),
            TimerPhase::Revealed => {}
        }

        if step.persist_reveal {
            if let Err(err) = self.store.mark_timer_visible(&self.board_id).await {
                self.report_failure("reveal board", err);
            }
        }
        Some(step.phase)
    }

    pub async fn is_revealed(&self) -> bool {
        self.state.lock().await.gate.is_revealed()
    }

    /// Flips the persisted visibility flag without waiting for the timer.
    pub async fn reveal(&self) -> Result<(), SyncError> {
        self.snapshot().await?;
        self.store
            .mark_timer_visible(&self.board_id)
            .await
            .map_err(|err| self.report_failure("reveal board", err))
    }

    pub async fn add_item(&self, column_id: ColumnId, text: &str) -> Result<ItemId, SyncError> {
        let item = board::new_item(text, &self.user_id, self.clock.now())?;
        let item_id = item.id.clone();
        let mut doc = self.snapshot().await?;
        board::add_item(&mut doc, column_id, item);
        self.persist("add item", &doc).await?;
        debug!(board_id = %self.board_id, item_id = %item_id, column = %column_id, "item added");
        Ok(item_id)
    }

    pub async fn delete_item(&self, column_id: ColumnId, item_id: &ItemId) -> Result<(), SyncError> {
        let user_id = self.user_id.clone();
        self.mutate("delete item", |doc| {
            board::delete_item(doc, column_id, item_id, &user_id).map(|_| ())
        })
        .await
    }

    pub async fn toggle_reaction(
        &self,
        column_id: ColumnId,
        item_id: &ItemId,
        kind: ReactionKind,
    ) -> Result<(), SyncError> {
        let user_id = self.user_id.clone();
        self.mutate("toggle reaction", |doc| {
            board::toggle_item_reaction(doc, column_id, item_id, &user_id, kind)
        })
        .await
    }

    pub async fn set_action(
        &self,
        column_id: ColumnId,
        item_id: &ItemId,
        text: &str,
    ) -> Result<(), SyncError> {
        self.mutate("set action", |doc| {
            board::set_action(doc, column_id, item_id, text)
        })
        .await
    }

    /// Applies the drag locally first, then persists. A failed write keeps
    /// the local arrangement until the next delivery replaces it.
    ///
    /// Returns whether anything moved.
    pub async fn drag_end(&self, drag: &DragEnd) -> Result<bool, SyncError> {
        let (board, doc) = {
            let mut state = self.state.lock().await;
            if let Some(terminal) = state.terminal {
                return Err(terminal.into());
            }
            let projection = state.projection.as_mut().ok_or(SyncError::Closed)?;
            match arrange(&projection.doc.columns, drag) {
                Arrangement::Unchanged(reason) => {
                    debug!(board_id = %self.board_id, item_id = %drag.item_id, ?reason, "drag left board unchanged");
                    return Ok(false);
                }
                Arrangement::Moved(columns) => {
                    projection.doc.columns = columns;
                }
            }
            (projection.clone(), projection.doc.clone())
        };

        self.emit(ClientEvent::BoardUpdated {
            board,
            confirmed: false,
        });
        self.persist("move item", &doc).await?;
        Ok(true)
    }

    /// Drops the entry-animation flag on an item, working from a fresh read
    /// of the stored board. Failures are only logged.
    pub async fn clear_new_flag(&self, item_id: &ItemId) {
        if self.state.lock().await.terminal.is_some() {
            return;
        }
        let mut doc = match self.store.get_board(&self.board_id).await {
            Ok(Some(board)) => board.doc,
            Ok(None) => {
                debug!(board_id = %self.board_id, item_id = %item_id, "board gone before new-item flag cleared");
                return;
            }
            Err(err) => {
                warn!(board_id = %self.board_id, item_id = %item_id, error = %err, "failed to read board for new-item flag");
                return;
            }
        };
        if !board::clear_new_flag(&mut doc, item_id) {
            return;
        }

        if let Err(err) = self.store.save_board(&self.board_id, &doc).await {
            warn!(board_id = %self.board_id, item_id = %item_id, error = %err, "failed to clear new-item flag");
        }
    }

    /// Current projection document, as a starting point for a write.
    async fn snapshot(&self) -> Result<BoardDocument, SyncError> {
        let state = self.state.lock().await;
        if let Some(terminal) = state.terminal {
            return Err(terminal.into());
        }
        state
            .projection
            .as_ref()
            .map(|board| board.doc.clone())
            .ok_or(SyncError::Closed)
    }

    async fn mutate<F>(&self, action: &'static str, op: F) -> Result<(), SyncError>
    where
        F: FnOnce(&mut BoardDocument) -> Result<(), BoardError>,
    {
        let mut doc = self.snapshot().await?;
        match op(&mut doc) {
            Ok(()) => self.persist(action, &doc).await,
            Err(BoardError::ItemNotFound { column_id, item_id }) => {
                debug!(board_id = %self.board_id, %column_id, %item_id, action, "item no longer on board");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, action: &'static str, doc: &BoardDocument) -> Result<(), SyncError> {
        self.store
            .save_board(&self.board_id, doc)
            .await
            .map_err(|err| self.report_failure(action, err))
    }

    fn report_failure(&self, action: &'static str, err: anyhow::Error) -> SyncError {
        let err = SyncError::from_store(err);
        warn!(board_id = %self.board_id, action, error = %err, "board store call failed");
        if !err.is_terminal() {
            self.emit(ClientEvent::Notice(format!("could not {action}: {err}")));
        }
        err
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
