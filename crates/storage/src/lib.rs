use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;
use uuid::Uuid;

use shared::domain::{Board, BoardDocument, BoardId, UserId};

/// Board documents stored whole, one JSON blob per row. `join_code` and
/// `created_by` are copied out of the document at creation for lookups.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_board(&self, doc: &BoardDocument) -> Result<BoardId> {
        let board_id = BoardId(Uuid::new_v4().to_string());
        let document = serde_json::to_string(doc).context("failed to encode board document")?;
        sqlx::query(
            "INSERT INTO boards (id, join_code, created_by, created_at, document)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(board_id.as_str())
        .bind(&doc.join_code)
        .bind(doc.created_by.as_str())
        .bind(doc.created_at.to_rfc3339())
        .bind(document)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert board '{}'", doc.name))?;
        debug!(board_id = %board_id, join_code = %doc.join_code, "board created");
        Ok(board_id)
    }

    pub async fn get_board(&self, board_id: &BoardId) -> Result<Option<Board>> {
        let row = sqlx::query("SELECT id, document FROM boards WHERE id = ?")
            .bind(board_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(decode_board).transpose()
    }

    pub async fn find_board_by_join_code(&self, join_code: &str) -> Result<Option<Board>> {
        let row = sqlx::query("SELECT id, document FROM boards WHERE join_code = ?")
            .bind(join_code)
            .fetch_optional(&self.pool)
            .await?;
        row.map(decode_board).transpose()
    }

    /// Newest first.
    pub async fn list_boards_by_creator(&self, user_id: &UserId) -> Result<Vec<Board>> {
        let rows = sqlx::query(
            "SELECT id, document FROM boards
             WHERE created_by = ?
             ORDER BY created_at DESC, id ASC",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(decode_board).collect()
    }

    /// Whole-document overwrite. Returns false when the board does not exist.
    /// A stored `timerSettings.visible = true` survives the write.
    pub async fn replace_board(&self, board_id: &BoardId, doc: &BoardDocument) -> Result<bool> {
        let document = serde_json::to_string(doc).context("failed to encode board document")?;
        let result = sqlx::query(
            "UPDATE boards
             SET document = CASE
                     WHEN json_extract(document, '$.timerSettings.visible')
                     THEN json_set(?, '$.timerSettings.visible', json('true'))
                     ELSE ?
                 END,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(&document)
        .bind(&document)
        .bind(board_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Field-path update of `timerSettings.visible` only.
    pub async fn set_timer_visible(&self, board_id: &BoardId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE boards
             SET document = json_set(document, '$.timerSettings.visible', json('true')),
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(board_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_board(&self, board_id: &BoardId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM boards WHERE id = ?")
            .bind(board_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn decode_board(row: SqliteRow) -> Result<Board> {
    let id: String = row.try_get("id")?;
    let document: String = row.try_get("document")?;
    let doc = serde_json::from_str::<BoardDocument>(&document)
        .with_context(|| format!("board '{id}' holds an unreadable document"))?;
    Ok(Board {
        id: BoardId(id),
        doc,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
