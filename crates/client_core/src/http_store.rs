use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{Board, BoardDocument, BoardId, UserId},
    error::{ApiError, ApiException},
    protocol::{BoardsQuery, CreateBoardResponse, DeleteBoardQuery, ServerEvent},
};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

use crate::store::{BoardChange, DocumentStore, Subscription};

/// [`DocumentStore`] backed by the board server's HTTP routes and its
/// `/ws` push feed.
#[derive(Clone)]
pub struct HttpDocumentStore {
    http: Client,
    base_url: Url,
}

impl HttpDocumentStore {
    pub fn new(server_url: &str) -> Result<Self> {
        let base_url = Url::parse(server_url)
            .with_context(|| format!("invalid server url: {server_url}"))?;
        match base_url.scheme() {
            "http" | "https" => {}
            other => return Err(anyhow!("server_url must start with http:// or https://, got {other}://")),
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("server url cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn ws_endpoint(&self, board_id: &BoardId) -> Result<Url> {
        let mut url = self.endpoint(&["ws"])?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("cannot derive websocket url from {}", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("board_id", board_id.as_str());
        Ok(url)
    }

    async fn fetch_optional_board(&self, url: Url) -> Result<Option<Board>> {
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let board = check(response).await?.json().await?;
        Ok(Some(board))
    }
}

/// Turns a non-success response into an [`ApiException`] when the body
/// carries one.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => Err(ApiException::from(api_error).into()),
        Err(_) => Err(anyhow!("board server returned {status}: {body}")),
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn create_board(&self, doc: &BoardDocument) -> Result<BoardId> {
        let response = self
            .http
            .post(self.endpoint(&["boards"])?)
            .json(doc)
            .send()
            .await?;
        let created: CreateBoardResponse = check(response).await?.json().await?;
        Ok(created.board_id)
    }

    async fn get_board(&self, board_id: &BoardId) -> Result<Option<Board>> {
        self.fetch_optional_board(self.endpoint(&["boards", board_id.as_str()])?)
            .await
    }

    async fn boards_by_creator(&self, user_id: &UserId) -> Result<Vec<Board>> {
        let response = self
            .http
            .get(self.endpoint(&["boards"])?)
            .query(&BoardsQuery {
                created_by: user_id.clone(),
            })
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn board_by_join_code(&self, join_code: &str) -> Result<Option<Board>> {
        self.fetch_optional_board(self.endpoint(&["boards", "join", join_code])?)
            .await
    }

    async fn save_board(&self, board_id: &BoardId, doc: &BoardDocument) -> Result<()> {
        let response = self
            .http
            .put(self.endpoint(&["boards", board_id.as_str()])?)
            .json(doc)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn mark_timer_visible(&self, board_id: &BoardId) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(&["boards", board_id.as_str(), "timer", "visible"])?)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_board(&self, board_id: &BoardId, user_id: &UserId) -> Result<()> {
        let response = self
            .http
            .delete(self.endpoint(&["boards", board_id.as_str()])?)
            .query(&DeleteBoardQuery {
                user_id: user_id.clone(),
            })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn subscribe(&self, board_id: &BoardId) -> Result<Subscription> {
        let ws_url = self.ws_endpoint(board_id)?;
        let (ws_stream, _) = connect_async(ws_url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
        let (_, mut ws_reader) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel();

        let watched = board_id.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(err) => {
                        warn!(board_id = %watched, %err, "websocket receive failed");
                        break;
                    }
                };
                let change = match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(ServerEvent::BoardUpdated { board }) if board.id == watched => {
                        BoardChange::Updated(board)
                    }
                    Ok(ServerEvent::BoardDeleted { board_id }) if board_id == watched => {
                        BoardChange::Removed
                    }
                    Ok(ServerEvent::Error(err)) => {
                        warn!(board_id = %watched, code = ?err.code, message = %err.message, "server reported an error");
                        continue;
                    }
                    Ok(_) => continue,
                    Err(err) => {
                        warn!(board_id = %watched, %err, "invalid server event");
                        continue;
                    }
                };
                if tx.send(change).is_err() {
                    break;
                }
            }
            debug!(board_id = %watched, "board feed ended");
        });

        Ok(Subscription::new(rx, move || reader.abort()))
    }
}

#[cfg(test)]
#[path = "tests/http_store_tests.rs"]
mod tests;
