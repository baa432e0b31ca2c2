use super::*;
use crate::fixtures::item;

fn user(id: &str) -> UserId {
    UserId::from(id)
}

#[test]
fn like_then_dislike_moves_user_to_dislike_ledger() {
    let start = item("too-many-meetings", "u1");
    let liked = toggle_reaction(&start, &user("u2"), ReactionKind::Like);
    assert_eq!(reaction_of(&liked, &user("u2")), Some(ReactionKind::Like));

    let disliked = toggle_reaction(&liked, &user("u2"), ReactionKind::Dislike);
    assert!(disliked.reactions.is_empty());
    assert_eq!(disliked.dislikes, Ledger::from([(user("u2"), true)]));
}

#[test]
fn toggling_twice_restores_original_ledgers() {
    let mut start = item("a", "u1");
    start.reactions.insert(user("u3"), true);
    for kind in [ReactionKind::Like, ReactionKind::Dislike] {
        let once = toggle_reaction(&start, &user("u2"), kind);
        let twice = toggle_reaction(&once, &user("u2"), kind);
        assert_eq!(twice, start);
    }
}

#[test]
fn user_never_holds_both_reactions() {
    let sequence = [
        ReactionKind::Like,
        ReactionKind::Dislike,
        ReactionKind::Dislike,
        ReactionKind::Like,
        ReactionKind::Like,
        ReactionKind::Dislike,
        ReactionKind::Like,
    ];
    let u = user("u2");
    let mut current = item("a", "u1");
    for kind in sequence {
        current = toggle_reaction(&current, &u, kind);
        let both = current.reactions.contains_key(&u) && current.dislikes.contains_key(&u);
        assert!(!both, "user holds both reactions after {kind:?}");
    }
}

#[test]
fn toggle_leaves_other_users_untouched() {
    let mut start = item("a", "u1");
    start.reactions.insert(user("u3"), true);
    start.dislikes.insert(user("u4"), true);

    let next = toggle_reaction(&start, &user("u2"), ReactionKind::Dislike);
    assert_eq!(next.reactions.get(&user("u3")), Some(&true));
    assert_eq!(next.dislikes.get(&user("u4")), Some(&true));
    assert_eq!(
        counts(&next),
        LedgerCounts {
            likes: 1,
            dislikes: 2
        }
    );
}

#[test]
fn false_entries_do_not_count_as_reactions() {
    let mut start = item("a", "u1");
    start.reactions.insert(user("u2"), false);
    assert_eq!(reaction_of(&start, &user("u2")), None);
    assert_eq!(counts(&start).likes, 0);

    let liked = toggle_reaction(&start, &user("u2"), ReactionKind::Like);
    assert_eq!(liked.reactions.get(&user("u2")), Some(&true));
}
