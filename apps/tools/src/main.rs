use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ingest_api::{initialize_headers, IngestContext, HEADER_ROW};
use shared::domain::HEADER_TITLES;
use storage::{Sheet, Storage};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/sheet.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the column titles into row 1, replacing any existing header.
    InitHeaders,
    /// Print one row, labelled with the column titles.
    ShowRow { row: u64 },
    LastRow,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::InitHeaders => {
            let ctx = IngestContext::new(Arc::new(storage));
            initialize_headers(&ctx).await?;
            println!("wrote {} column titles to row {HEADER_ROW}", HEADER_TITLES.len());
        }
        Command::ShowRow { row } => match storage.read_row(row).await? {
            Some(cells) => {
                for (title, cell) in HEADER_TITLES.iter().zip(&cells) {
                    println!("{title}: {cell}");
                }
                if cells.len() != HEADER_TITLES.len() {
                    println!("(row has {} cells)", cells.len());
                }
            }
            None => println!("row {row} is empty"),
        },
        Command::LastRow => {
            println!("last_row={}", storage.last_row().await?);
        }
    }

    Ok(())
}
