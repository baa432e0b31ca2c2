use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use board_engine::{
    board::{action_text, new_board, share_link},
    ordering::{DragEnd, DropTarget},
    reactions::{counts, reaction_of, ReactionKind},
    timer::format_countdown,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    BoardSession, BoardSyncController, ClientEvent, DocumentStore, HttpDocumentStore,
    Preferences, SyncError, Terminal,
};
use shared::domain::{Board, BoardId, ColumnId, ItemId, UserId};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "retro", about = "Shared retrospective boards")]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8443")]
    server_url: String,
    #[arg(long)]
    user: String,
    #[arg(long, default_value = "retro-preferences.toml")]
    preferences: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a board. A zero-minute timer shows notes right away.
    Create {
        name: String,
        #[arg(long, default_value_t = 0)]
        timer_minutes: u32,
    },
    Join {
        code: String,
    },
    /// Boards you created, newest first.
    List,
    Show {
        board_id: String,
    },
    Add {
        board_id: String,
        column: ColumnId,
        text: String,
    },
    React {
        board_id: String,
        column: ColumnId,
        item_id: String,
        #[arg(value_enum)]
        kind: Reaction,
    },
    /// Set the follow-up action on an item; an empty text clears it.
    Action {
        board_id: String,
        column: ColumnId,
        item_id: String,
        text: String,
    },
    /// Move an item in front of another one, or to the end of a column.
    Move {
        board_id: String,
        column: ColumnId,
        item_id: String,
        #[arg(long)]
        to: ColumnId,
        #[arg(long)]
        before: Option<String>,
    },
    Delete {
        board_id: String,
        column: ColumnId,
        item_id: String,
    },
    DeleteBoard {
        board_id: String,
    },
    Reveal {
        board_id: String,
    },
    /// Follow a board until it is deleted or Ctrl-C.
    Watch {
        board_id: String,
    },
    Theme {
        #[arg(long)]
        toggle: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Reaction {
    Like,
    Dislike,
}

impl From<Reaction> for ReactionKind {
    fn from(value: Reaction) -> Self {
        match value {
            Reaction::Like => ReactionKind::Like,
            Reaction::Dislike => ReactionKind::Dislike,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let args = Args::parse();
    let user = UserId(args.user.clone());

    if let Command::Theme { toggle } = args.command {
        let mut prefs = Preferences::load(&args.preferences);
        let theme = if toggle {
            prefs.toggle_theme(&args.preferences)?
        } else {
            prefs.theme
        };
        println!("theme: {}", theme.as_str());
        return Ok(());
    }

    let store: Arc<dyn DocumentStore> = Arc::new(HttpDocumentStore::new(&args.server_url)?);

    match args.command {
        Command::Create {
            name,
            timer_minutes,
        } => {
            let doc = new_board(&name, &user, timer_minutes, Utc::now())?;
            let board_id = store.create_board(&doc).await?;
            println!("created board {board_id}");
            println!("join code: {}", doc.join_code);
            println!("share: {}", share_link(&args.server_url, &doc.join_code));
        }
        Command::Join { code } => {
            let code = code.trim();
            if code.is_empty() {
                return Err(anyhow!("join code is required"));
            }
            let board = store
                .board_by_join_code(code)
                .await?
                .ok_or_else(|| anyhow!("no board found with join code {code}"))?;
            println!("joined {} ({})", board.doc.name, board.id);
        }
        Command::List => {
            for board in store.boards_by_creator(&user).await? {
                println!(
                    "{}  {}  code={}  items={}",
                    board.id,
                    board.doc.name,
                    board.doc.join_code,
                    board.doc.columns.item_count()
                );
            }
        }
        Command::Show { board_id } => {
            let controller = open(&store, &user, &board_id).await?;
            let board = controller.projection().await.ok_or(SyncError::Closed)?;
            print_board(&board, &user, controller.is_revealed().await);
        }
        Command::Add {
            board_id,
            column,
            text,
        } => {
            let session = BoardSession::open(store, user, BoardId(board_id)).await?;
            let item_id = session.add_item(column, &text).await?;
            session.finish().await;
            println!("added {item_id}");
        }
        Command::React {
            board_id,
            column,
            item_id,
            kind,
        } => {
            let controller = open(&store, &user, &board_id).await?;
            controller
                .toggle_reaction(column, &ItemId(item_id), kind.into())
                .await?;
        }
        Command::Action {
            board_id,
            column,
            item_id,
            text,
        } => {
            let controller = open(&store, &user, &board_id).await?;
            controller.set_action(column, &ItemId(item_id), &text).await?;
        }
        Command::Move {
            board_id,
            column,
            item_id,
            to,
            before,
        } => {
            let controller = open(&store, &user, &board_id).await?;
            let target = match before {
                Some(before) => DropTarget::Item {
                    item_id: ItemId(before),
                    column_id: to,
                },
                None => DropTarget::EmptyColumn { column_id: to },
            };
            let drag = DragEnd {
                item_id: ItemId(item_id),
                column_id: column,
                target: Some(target),
            };
            if !controller.drag_end(&drag).await? {
                println!("nothing moved");
            }
        }
        Command::Delete {
            board_id,
            column,
            item_id,
        } => {
            let controller = open(&store, &user, &board_id).await?;
            controller.delete_item(column, &ItemId(item_id)).await?;
        }
        Command::DeleteBoard { board_id } => {
            store
                .delete_board(&BoardId(board_id), &user)
                .await
                .map_err(SyncError::from_store)?;
            println!("board deleted");
        }
        Command::Reveal { board_id } => {
            let controller = open(&store, &user, &board_id).await?;
            controller.reveal().await?;
        }
        Command::Watch { board_id } => watch(store, user, BoardId(board_id)).await?,
        Command::Theme { .. } => {}
    }

    Ok(())
}

async fn open(
    store: &Arc<dyn DocumentStore>,
    user: &UserId,
    board_id: &str,
) -> Result<Arc<BoardSyncController>> {
    let controller = BoardSyncController::new(
        Arc::clone(store),
        user.clone(),
        BoardId(board_id.to_string()),
    );
    controller.load().await?;
    Ok(controller)
}

async fn watch(store: Arc<dyn DocumentStore>, user: UserId, board_id: BoardId) -> Result<()> {
    let session = BoardSession::open(store, user.clone(), board_id).await?;
    let controller = Arc::clone(session.controller());
    let mut events = session.subscribe_events();
    // Once shown, notes stay shown whatever later deliveries carry.
    let mut revealed = controller.is_revealed().await;
    if let Some(board) = controller.projection().await {
        print_board(&board, &user, revealed);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                match event {
                    ClientEvent::BoardUpdated { board, .. } => {
                        revealed |= controller.is_revealed().await;
                        print_board(&board, &user, revealed);
                    }
                    ClientEvent::Countdown { remaining_secs } => {
                        println!("notes hidden for {}", format_countdown(remaining_secs));
                    }
                    ClientEvent::ContentRevealed => {
                        revealed = true;
                        println!("time is up, notes revealed");
                        if let Some(board) = controller.projection().await {
                            print_board(&board, &user, revealed);
                        }
                    }
                    ClientEvent::Notice(message) => eprintln!("notice: {message}"),
                    ClientEvent::Terminal(Terminal::Deleted) => {
                        println!("board was deleted");
                        break;
                    }
                    ClientEvent::Terminal(Terminal::NotFound) => {
                        println!("board not found");
                        break;
                    }
                }
            }
        }
    }

    session.close();
    Ok(())
}

fn print_board(board: &Board, user: &UserId, revealed: bool) {
    println!("== {} [{}] code={}", board.doc.name, board.id, board.doc.join_code);
    for column in board.doc.columns.iter() {
        println!("-- {} ({})", column.title, column.items.len());
        for item in &column.items {
            let text = if revealed { item.text.as_str() } else { "(hidden)" };
            let tally = counts(item);
            let mine = match reaction_of(item, user) {
                Some(ReactionKind::Like) => " *liked*",
                Some(ReactionKind::Dislike) => " *disliked*",
                None => "",
            };
            println!(
                "   {}  {}  +{} -{}{}",
                item.id, text, tally.likes, tally.dislikes, mine
            );
            let action = action_text(item);
            if !action.is_empty() {
                println!("      action: {action}");
            }
        }
    }
}
