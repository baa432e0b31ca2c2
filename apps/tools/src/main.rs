use anyhow::{anyhow, Result};
use board_engine::board::new_board;
use chrono::Utc;
use clap::{Parser, Subcommand};
use shared::domain::{BoardId, UserId};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/retro.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateBoard {
        created_by: String,
        name: String,
        #[arg(long, default_value_t = 0)]
        timer_minutes: u32,
    },
    /// Print the stored JSON document.
    ShowBoard {
        board_id: String,
    },
    ListBoards {
        created_by: String,
    },
    /// Remove a board regardless of who created it.
    DeleteBoard {
        board_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateBoard {
            created_by,
            name,
            timer_minutes,
        } => {
            let doc = new_board(&name, &UserId(created_by), timer_minutes, Utc::now())?;
            let board_id = storage.create_board(&doc).await?;
            println!("created board_id={board_id} join_code={}", doc.join_code);
        }
        Command::ShowBoard { board_id } => {
            let board = storage
                .get_board(&BoardId(board_id.clone()))
                .await?
                .ok_or_else(|| anyhow!("board {board_id} not found"))?;
            println!("{}", serde_json::to_string_pretty(&board)?);
        }
        Command::ListBoards { created_by } => {
            for board in storage.list_boards_by_creator(&UserId(created_by)).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    board.id,
                    board.doc.join_code,
                    board.doc.created_at.to_rfc3339(),
                    board.doc.name
                );
            }
        }
        Command::DeleteBoard { board_id } => {
            if storage.delete_board(&BoardId(board_id.clone())).await? {
                println!("deleted board_id={board_id}");
            } else {
                return Err(anyhow!("board {board_id} not found"));
            }
        }
    }

    Ok(())
}
