//! Arena node.
//!
//! Runs the engine over the in-memory ledger and speaks JSON lines on
//! stdin/stdout. Logs go to stderr.
//!
//! ```text
//! arena-node [--config <path.json>]
//! ```

mod config;
mod heartbeat;
mod logging;
mod transport;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info};

use arena_engine::{Engine, Gateway};
use arena_ledger::InMemoryLedger;
use arena_types::constants::VERSION;

use crate::config::NodeConfig;

const OUTBOUND_BUFFER: usize = 1_024;

fn config_path() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    args.windows(2)
        .find(|w| w[0] == "--config" || w[0] == "-c")
        .map(|w| PathBuf::from(&w[1]))
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match NodeConfig::load(config_path().as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arena-node: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init_logging(&config.log);
    info!(version = VERSION, "arena-node starting");

    let ledger = Arc::new(InMemoryLedger::with_starting_balance(config.starting_balance));
    let engine = match Engine::new(config.engine.clone(), ledger) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            error!(error = %e, "engine failed to start");
            return ExitCode::FAILURE;
        }
    };
    let gateway = Gateway::new(engine.clone());

    let (out_tx, out_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let writer = tokio::spawn(transport::write_lines(out_rx, tokio::io::stdout()));
    let forwarder = tokio::spawn(transport::forward_notifications(
        engine.subscribe(),
        out_tx.clone(),
    ));
    let beats = heartbeat::spawn_heartbeat(
        engine.notifier().clone(),
        engine.config().heartbeat_interval(),
    );

    let input = BufReader::new(tokio::io::stdin());
    let served = tokio::select! {
        r = transport::serve(gateway, input, out_tx) => r,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received");
            Ok(())
        }
    };

    beats.abort();
    forwarder.abort();
    // Writer ends once every sender is gone.
    let _ = forwarder.await;
    let written = writer.await;

    if let Err(e) = served {
        error!(error = %e, "transport failed");
        return ExitCode::FAILURE;
    }
    if let Ok(Err(e)) = written {
        error!(error = %e, "output failed");
        return ExitCode::FAILURE;
    }
    let stats = engine.store().stats();
    info!(?stats, "arena-node stopped");
    ExitCode::SUCCESS
}
