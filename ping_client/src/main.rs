//! Standalone game binary.
//!
//! Usage:
//!   cargo run -p ping_client -- [--config speed-ping.json] [--probe-addr www.google.com:80]
//!
//! After a short intro the game waits for input; each round sends one probe
//! request, rates the round trip and updates the local top-5 ranking.
//!
//! Console commands:
//!   <Enter> | go  - Start the speed test
//!   r | again     - Play another round
//!   reset         - Clear the local ranking
//!   help          - List commands
//!   q | quit      - Exit

use std::env;
use std::io::BufRead;
use std::sync::Arc;

use anyhow::Context;
use ping_client::args::parse_args;
use ping_client::input::{parse_command, Command, HELP};
use ping_client::{TerminalFeedback, TerminalView};
use ping_shared::game::GameController;
use ping_shared::probe::HttpProbe;
use ping_shared::ranking::RankingStore;
use ping_shared::storage::FileStore;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let cfg = parse_args(&args).context("parse arguments")?;
    info!(probe = %cfg.probe_addr, data_dir = %cfg.data_dir, "Starting speed-ping");

    let ranking = RankingStore::load(FileStore::new(&cfg.data_dir));
    info!(entries = ranking.entries().len(), best = ?ranking.best(), "Ranking loaded");

    let probe = Arc::new(HttpProbe::from_config(&cfg));
    let controller = GameController::new(
        cfg,
        probe,
        Box::new(TerminalFeedback::new(std::io::stdout())),
        Box::new(TerminalView::new(std::io::stdout())),
        ranking,
    );
    let input = controller.input();

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        loop {
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => {
                    input.shutdown();
                    break;
                }
                Ok(_) => {}
            }
            match parse_command(&line) {
                Some(Command::Help) => {
                    for entry in HELP {
                        println!("{entry}");
                    }
                }
                Some(cmd) => {
                    if !cmd.dispatch(&input) {
                        break;
                    }
                }
                None => println!("Unknown command {:?}. Type 'help'.", line.trim()),
            }
        }
    });

    let ranking = controller.run().await;
    info!(best = ?ranking.best(), "Bye");
    Ok(())
}
