use serde::{Deserialize, Serialize};
use shared::domain::{Item, Ledger, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Like,
    Dislike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerCounts {
    pub likes: usize,
    pub dislikes: usize,
}

fn holds(ledger: &Ledger, user: &UserId) -> bool {
    ledger.get(user).copied().unwrap_or(false)
}

/// Toggles `kind` for `user`. Setting one reaction clears the opposite one,
/// so a user never holds both.
pub fn toggle_reaction(item: &Item, user: &UserId, kind: ReactionKind) -> Item {
    let mut next = item.clone();
    let (own, other) = match kind {
        ReactionKind::Like => (&mut next.reactions, &mut next.dislikes),
        ReactionKind::Dislike => (&mut next.dislikes, &mut next.reactions),
    };

    if holds(own, user) {
        own.remove(user);
    } else {
        own.insert(user.clone(), true);
        other.remove(user);
    }
    next
}

pub fn reaction_of(item: &Item, user: &UserId) -> Option<ReactionKind> {
    if holds(&item.reactions, user) {
        Some(ReactionKind::Like)
    } else if holds(&item.dislikes, user) {
        Some(ReactionKind::Dislike)
    } else {
        None
    }
}

pub fn counts(item: &Item) -> LedgerCounts {
    LedgerCounts {
        likes: item.reactions.values().filter(|set| **set).count(),
        dislikes: item.dislikes.values().filter(|set| **set).count(),
    }
}

#[cfg(test)]
#[path = "tests/reactions_tests.rs"]
mod tests;
