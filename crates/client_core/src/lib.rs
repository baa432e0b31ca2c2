//! Client-side synchronization for retrospective boards.
//!
//! A [`BoardSession`] keeps one board view in step with the document store:
//! it loads the board, follows the store's change feed, drives the countdown
//! and routes user intents through a [`BoardSyncController`].

use shared::domain::Board;

mod controller;
mod error;
mod http_store;
pub mod preferences;
mod session;
mod store;

pub use controller::{BoardSyncController, Clock, SystemClock};
pub use error::SyncError;
pub use http_store::HttpDocumentStore;
pub use preferences::{Preferences, Theme};
pub use session::{BoardSession, SessionOptions};
pub use store::{BoardChange, DocumentStore, Subscription};

/// Why a board view stopped following its board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    NotFound,
    Deleted,
}

impl From<Terminal> for SyncError {
    fn from(value: Terminal) -> Self {
        match value {
            Terminal::NotFound => SyncError::NotFound,
            Terminal::Deleted => SyncError::Deleted,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// `confirmed` is false for an optimistic local arrangement.
    BoardUpdated { board: Board, confirmed: bool },
    Countdown { remaining_secs: i64 },
    ContentRevealed,
    /// Transient, dismissible failure report.
    Notice(String),
    Terminal(Terminal),
}

#[cfg(test)]
#[path = "tests/memory_store.rs"]
mod memory_store;
