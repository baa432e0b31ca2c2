use super::*;
use board_engine::board::{add_item, new_board, new_item};
use chrono::Utc;
use shared::domain::ColumnId;

fn sample(name: &str, owner: &str, minutes: u32) -> BoardDocument {
    new_board(name, &UserId::from(owner), minutes, Utc::now()).expect("board")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("retro_board_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn stores_and_loads_board_documents() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let doc = sample("Sprint 12", "u1", 0);
    let board_id = storage.create_board(&doc).await.expect("create");

    let board = storage
        .get_board(&board_id)
        .await
        .expect("load")
        .expect("board exists");
    assert_eq!(board.id, board_id);
    assert_eq!(board.doc, doc);

    let missing = storage
        .get_board(&BoardId::from("missing"))
        .await
        .expect("load");
    assert!(missing.is_none());
}

#[tokio::test]
async fn finds_boards_by_join_code_and_creator() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = sample("Sprint 12", "u1", 0);
    let second = sample("Sprint 13", "u1", 5);
    let other = sample("Team B", "u2", 0);
    let first_id = storage.create_board(&first).await.expect("first");
    storage.create_board(&second).await.expect("second");
    storage.create_board(&other).await.expect("other");

    let joined = storage
        .find_board_by_join_code(&first.join_code)
        .await
        .expect("lookup")
        .expect("board for code");
    assert_eq!(joined.id, first_id);
    assert!(storage
        .find_board_by_join_code("nope")
        .await
        .expect("lookup")
        .is_none());

    let mine = storage
        .list_boards_by_creator(&UserId::from("u1"))
        .await
        .expect("list");
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|board| board.doc.created_by == UserId::from("u1")));
}

#[tokio::test]
async fn replace_overwrites_whole_document_and_keeps_item_order() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let mut doc = sample("Sprint 12", "u1", 0);
    let board_id = storage.create_board(&doc).await.expect("create");

    for text in ["first", "second", "third"] {
        let item = new_item(text, &UserId::from("u1"), Utc::now()).expect("item");
        add_item(&mut doc, ColumnId::ToImprove, item);
    }
    assert!(storage.replace_board(&board_id, &doc).await.expect("replace"));

    let stored = storage
        .get_board(&board_id)
        .await
        .expect("load")
        .expect("board");
    let texts: Vec<_> = stored
        .doc
        .columns
        .to_improve
        .items
        .iter()
        .map(|item| item.text.as_str())
        .collect();
    assert_eq!(texts, ["first", "second", "third"]);

    assert!(!storage
        .replace_board(&BoardId::from("missing"), &doc)
        .await
        .expect("replace"));
}

#[tokio::test]
async fn timer_visible_is_updated_in_place() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let doc = sample("Sprint 12", "u1", 10);
    let board_id = storage.create_board(&doc).await.expect("create");

    assert!(storage.set_timer_visible(&board_id).await.expect("reveal"));
    assert!(storage.set_timer_visible(&board_id).await.expect("reveal again"));

    let stored = storage
        .get_board(&board_id)
        .await
        .expect("load")
        .expect("board");
    assert!(stored.doc.timer_settings.visible);
    assert_eq!(stored.doc.timer_settings.duration, 10);
    assert_eq!(stored.doc.columns, doc.columns);
}

#[tokio::test]
async fn replace_cannot_hide_a_revealed_timer() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let mut stale = sample("Sprint 12", "u1", 10);
    let board_id = storage.create_board(&stale).await.expect("create");
    assert!(storage.set_timer_visible(&board_id).await.expect("reveal"));

    let item = new_item("late note", &UserId::from("u2"), Utc::now()).expect("item");
    add_item(&mut stale, ColumnId::WentWell, item);
    assert!(!stale.timer_settings.visible);
    assert!(storage.replace_board(&board_id, &stale).await.expect("replace"));

    let stored = storage
        .get_board(&board_id)
        .await
        .expect("load")
        .expect("board");
    assert!(stored.doc.timer_settings.visible);
    assert_eq!(stored.doc.columns.went_well.items.len(), 1);
}

#[tokio::test]
async fn deletes_boards() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let board_id = storage
        .create_board(&sample("Sprint 12", "u1", 0))
        .await
        .expect("create");

    assert!(storage.delete_board(&board_id).await.expect("delete"));
    assert!(!storage.delete_board(&board_id).await.expect("delete again"));
    assert!(storage.get_board(&board_id).await.expect("load").is_none());
}

#[test]
fn sqlite_path_ignores_memory_urls() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/retro.db?mode=rwc"),
        Some(PathBuf::from("./data/retro.db"))
    );
}
