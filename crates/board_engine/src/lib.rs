//! Pure board operations: reaction ledger, drag ordering, timer gate and
//! whole-document mutations. Nothing here performs I/O.

pub mod board;
mod error;
pub mod ordering;
pub mod reactions;
pub mod timer;

pub use error::BoardError;

#[cfg(test)]
#[path = "tests/fixtures.rs"]
mod fixtures;
