use board_engine::board::mark_visible;
use shared::{
    domain::{Board, BoardDocument, BoardId, UserId},
    error::{ApiError, ErrorCode},
    protocol::ServerEvent,
};
use storage::Storage;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn create_board(ctx: &ApiContext, doc: BoardDocument) -> Result<Board, ApiError> {
    validate_document(&doc)?;
    let id = ctx.storage.create_board(&doc).await.map_err(internal)?;
    info!(board_id = %id, created_by = %doc.created_by, "board created");
    Ok(Board { id, doc })
}

pub async fn load_board(ctx: &ApiContext, board_id: &BoardId) -> Result<Board, ApiError> {
    ctx.storage
        .get_board(board_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| board_not_found(board_id))
}

pub async fn boards_created_by(ctx: &ApiContext, user_id: &UserId) -> Result<Vec<Board>, ApiError> {
    ctx.storage
        .list_boards_by_creator(user_id)
        .await
        .map_err(internal)
}

pub async fn join_board(ctx: &ApiContext, join_code: &str) -> Result<Board, ApiError> {
    let join_code = join_code.trim();
    if join_code.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "join code is required"));
    }
    ctx.storage
        .find_board_by_join_code(join_code)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            ApiError::new(
                ErrorCode::NotFound,
                "no board found with that join code",
            )
        })
}

/// Whole-document overwrite, last writer wins. The fields fixed at creation
/// must come back unchanged, and a revealed timer stays revealed.
pub async fn save_board(
    ctx: &ApiContext,
    board_id: &BoardId,
    mut doc: BoardDocument,
) -> Result<ServerEvent, ApiError> {
    validate_document(&doc)?;
    let current = load_board(ctx, board_id).await?;
    if current.doc.join_code != doc.join_code
        || current.doc.created_by != doc.created_by
        || current.doc.timer_settings.start_time != doc.timer_settings.start_time
    {
        warn!(board_id = %board_id, "rejected overwrite of immutable board fields");
        return Err(ApiError::new(
            ErrorCode::Validation,
            "join code, creator and timer start cannot change",
        ));
    }

    if current.doc.timer_settings.visible {
        mark_visible(&mut doc);
    }

    let updated = ctx
        .storage
        .replace_board(board_id, &doc)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(board_not_found(board_id));
    }
    Ok(ServerEvent::BoardUpdated {
        board: Board {
            id: board_id.clone(),
            doc,
        },
    })
}

pub async fn reveal_board(ctx: &ApiContext, board_id: &BoardId) -> Result<ServerEvent, ApiError> {
    let updated = ctx
        .storage
        .set_timer_visible(board_id)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(board_not_found(board_id));
    }
    let board = load_board(ctx, board_id).await?;
    Ok(ServerEvent::BoardUpdated { board })
}

pub async fn delete_board(
    ctx: &ApiContext,
    board_id: &BoardId,
    user_id: &UserId,
) -> Result<ServerEvent, ApiError> {
    let board = load_board(ctx, board_id).await?;
    if &board.doc.created_by != user_id {
        return Err(ApiError::new(
            ErrorCode::Forbidden,
            "only the board creator may delete it",
        ));
    }
    ctx.storage.delete_board(board_id).await.map_err(internal)?;
    info!(board_id = %board_id, "board deleted");
    Ok(ServerEvent::BoardDeleted {
        board_id: board_id.clone(),
    })
}

fn validate_document(doc: &BoardDocument) -> Result<(), ApiError> {
    if doc.name.trim().is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "board name is required"));
    }
    if doc.join_code.trim().is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "join code is required"));
    }
    let blank_item = doc
        .columns
        .iter()
        .flat_map(|column| column.items.iter())
        .any(|item| item.text.trim().is_empty());
    if blank_item {
        return Err(ApiError::new(ErrorCode::Validation, "item text is required"));
    }
    Ok(())
}

fn board_not_found(board_id: &BoardId) -> ApiError {
    ApiError::new(ErrorCode::NotFound, format!("board {board_id} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}
