use board_engine::{
    board::{add_item, new_board, new_item, toggle_item_reaction},
    ordering::{arrange, Arrangement, DragEnd, DropTarget},
    reactions::ReactionKind,
};
use chrono::Utc;
use shared::domain::{ColumnId, UserId};
use storage::Storage;

#[tokio::test]
async fn two_writers_last_write_wins_on_whole_document() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let alice = UserId::from("alice");

    let mut doc = new_board("Retro", &alice, 0, Utc::now()).expect("board");
    let first = new_item("Shipped on time", &alice, Utc::now()).expect("item");
    let first_id = first.id.clone();
    add_item(&mut doc, ColumnId::WentWell, first);
    let board_id = storage.create_board(&doc).await.expect("create");

    // Both clients read the same snapshot.
    let snapshot = storage
        .get_board(&board_id)
        .await
        .expect("load")
        .expect("board");
    let mut alice_view = snapshot.doc.clone();
    let mut bob_view = snapshot.doc;

    toggle_item_reaction(
        &mut alice_view,
        ColumnId::WentWell,
        &first_id,
        &alice,
        ReactionKind::Like,
    )
    .expect("like");
    let Arrangement::Moved(columns) = arrange(
        &bob_view.columns,
        &DragEnd {
            item_id: first_id.clone(),
            column_id: ColumnId::WentWell,
            target: Some(DropTarget::EmptyColumn {
                column_id: ColumnId::BrilliantIdeas,
            }),
        },
    ) else {
        panic!("move expected");
    };
    bob_view.columns = columns;

    storage
        .replace_board(&board_id, &alice_view)
        .await
        .expect("alice write");
    storage
        .replace_board(&board_id, &bob_view)
        .await
        .expect("bob write");

    let confirmed = storage
        .get_board(&board_id)
        .await
        .expect("load")
        .expect("board");
    assert_eq!(confirmed.doc, bob_view);
    let moved = &confirmed.doc.columns.brilliant_ideas.items[0];
    assert!(moved.reactions.is_empty(), "alice's like was overwritten");
    assert!(confirmed.doc.columns.went_well.items.is_empty());
}
