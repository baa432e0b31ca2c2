use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{Sink, SinkExt, StreamExt};
use server_api::{
    boards_created_by, create_board, delete_board, join_board, load_board, reveal_board,
    save_board, ApiContext,
};
use shared::{
    domain::{Board, BoardDocument, BoardId},
    error::{ApiError, ErrorCode},
    protocol::{BoardsQuery, CreateBoardResponse, DeleteBoardQuery, ServerEvent, SubscribeQuery},
};
use storage::Storage;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info, warn};

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext { storage };
    let (events, _) = broadcast::channel(settings.event_buffer);

    let state = AppState { api, events };
    let app = build_router(Arc::new(state)).layer(RequestBodyLimitLayer::new(settings.max_body_bytes));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/boards", post(http_create_board).get(http_list_boards))
        .route("/boards/join/:join_code", get(http_join_board))
        .route(
            "/boards/:board_id",
            get(http_get_board).put(http_save_board).delete(http_delete_board),
        )
        .route("/boards/:board_id/timer/visible", post(http_reveal_board))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> HttpError {
    if err.code == ErrorCode::Internal {
        error!(message = %err.message, "request failed");
    }
    (status_for(err.code), Json(err))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state.api.storage.health_check().await.map_err(|e| {
        http_error(ApiError::new(ErrorCode::Internal, e.to_string()))
    })?;
    Ok("ok")
}

async fn http_create_board(
    State(state): State<Arc<AppState>>,
    Json(doc): Json<BoardDocument>,
) -> Result<Json<CreateBoardResponse>, HttpError> {
    let board = create_board(&state.api, doc).await.map_err(http_error)?;
    Ok(Json(CreateBoardResponse { board_id: board.id }))
}

async fn http_list_boards(
    State(state): State<Arc<AppState>>,
    Query(q): Query<BoardsQuery>,
) -> Result<Json<Vec<Board>>, HttpError> {
    let boards = boards_created_by(&state.api, &q.created_by)
        .await
        .map_err(http_error)?;
    Ok(Json(boards))
}

async fn http_join_board(
    State(state): State<Arc<AppState>>,
    Path(join_code): Path<String>,
) -> Result<Json<Board>, HttpError> {
    let board = join_board(&state.api, &join_code).await.map_err(http_error)?;
    Ok(Json(board))
}

async fn http_get_board(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<String>,
) -> Result<Json<Board>, HttpError> {
    let board = load_board(&state.api, &BoardId(board_id))
        .await
        .map_err(http_error)?;
    Ok(Json(board))
}

async fn http_save_board(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<String>,
    Json(doc): Json<BoardDocument>,
) -> Result<Json<Board>, HttpError> {
    let event = save_board(&state.api, &BoardId(board_id), doc)
        .await
        .map_err(http_error)?;
    publish(&state, event.clone());
    match event {
        ServerEvent::BoardUpdated { board } => Ok(Json(board)),
        _ => Err(http_error(ApiError::new(
            ErrorCode::Internal,
            "save produced an unexpected event",
        ))),
    }
}

async fn http_reveal_board(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<String>,
) -> Result<Json<Board>, HttpError> {
    let event = reveal_board(&state.api, &BoardId(board_id))
        .await
        .map_err(http_error)?;
    publish(&state, event.clone());
    match event {
        ServerEvent::BoardUpdated { board } => Ok(Json(board)),
        _ => Err(http_error(ApiError::new(
            ErrorCode::Internal,
            "reveal produced an unexpected event",
        ))),
    }
}

async fn http_delete_board(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<String>,
    Query(q): Query<DeleteBoardQuery>,
) -> Result<StatusCode, HttpError> {
    let event = delete_board(&state.api, &BoardId(board_id), &q.user_id)
        .await
        .map_err(http_error)?;
    publish(&state, event);
    Ok(StatusCode::NO_CONTENT)
}

fn publish(state: &AppState, event: ServerEvent) {
    // No receivers just means nobody is watching this board right now.
    let _ = state.events.send(event);
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(q): Query<SubscribeQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket, q.board_id))
}

/// Pushes the current board, then every later change to it, until the
/// board is deleted or the peer goes away.
async fn ws_connection(state: Arc<AppState>, socket: WebSocket, board_id: BoardId) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before reading the snapshot so no write can fall in between.
    let mut events_rx = state.events.subscribe();

    let snapshot = current_state(&state.api, &board_id).await;
    let board_exists = matches!(snapshot, ServerEvent::BoardUpdated { .. });
    if !send_event(&mut sender, &snapshot).await || !board_exists {
        let _ = sender.close().await;
        return;
    }
    debug!(board_id = %board_id, "subscriber attached");

    let watched = board_id.clone();
    let api = state.api.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let event = match events_rx.recv().await {
                Ok(event) if event.board_id() == Some(&watched) => event,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(board_id = %watched, skipped, "subscriber lagged; resending current board");
                    current_state(&api, &watched).await
                }
                Err(RecvError::Closed) => break,
            };
            if !send_event(&mut sender, &event).await {
                break;
            }
            if matches!(event, ServerEvent::BoardDeleted { .. } | ServerEvent::Error(_)) {
                let _ = sender.close().await;
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
    debug!(board_id = %board_id, "subscriber detached");
}

async fn current_state(api: &ApiContext, board_id: &BoardId) -> ServerEvent {
    match load_board(api, board_id).await {
        Ok(board) => ServerEvent::BoardUpdated { board },
        Err(err) if err.code == ErrorCode::NotFound => ServerEvent::BoardDeleted {
            board_id: board_id.clone(),
        },
        Err(err) => ServerEvent::Error(err),
    }
}

async fn send_event<S>(sender: &mut S, event: &ServerEvent) -> bool
where
    S: Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(event) {
        Ok(v) => v,
        Err(_) => return true,
    };
    sender.send(Message::Text(text)).await.is_ok()
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
