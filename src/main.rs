//! Two Duel - Unified CLI
//!
//! Runs the duel server or prints a one-off problem.

#![warn(missing_docs)]

mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;
use two_duel::{
    AppState, Backends, ChannelGateway, DuelService, MemoryQueue, MemoryStore, RoomStore,
    ServerConfig, SqliteStore, UserStore, problem,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,two_duel=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, host, port } => run_server(config, host, port).await,
        Command::Problem { length } => print_problem(length),
    }
}

/// Run the duel server
#[instrument(skip_all, fields(config_path = %config_path.display()))]
async fn run_server(
    config_path: std::path::PathBuf,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let config = ServerConfig::load(&config_path)?.with_listen(host, port);
    info!(
        host = %config.host(),
        port = config.port(),
        store = %config.store(),
        "Starting Two Duel server"
    );

    let (rooms, users): (Arc<dyn RoomStore>, Arc<dyn UserStore>) = if config.uses_memory_store() {
        let store = Arc::new(MemoryStore::new());
        (store.clone() as Arc<dyn RoomStore>, store as Arc<dyn UserStore>)
    } else {
        let store = Arc::new(SqliteStore::open(config.store().clone()).await?);
        (store.clone() as Arc<dyn RoomStore>, store as Arc<dyn UserStore>)
    };

    let gateway = Arc::new(ChannelGateway::new());
    let service = DuelService::new(
        Backends {
            rooms,
            users,
            queue: Arc::new(MemoryQueue::new()),
            gateway: gateway.clone(),
        },
        config.matchmaking().clone(),
    );

    let state = AppState::new(Arc::new(service), gateway);
    two_duel::serve(state, config.host(), *config.port()).await?;

    info!("Server stopped");
    Ok(())
}

/// Print one problem as JSON
fn print_problem(length: usize) -> Result<()> {
    let puzzle = problem::generate(length)?;
    println!("{}", serde_json::json!({ "problem": puzzle.terms() }));
    Ok(())
}
