//! Stablemon - multi-exchange stablecoin quote monitor
//!
//! Main entry point

use std::io::{self, IsTerminal};

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stablemon_core::QuoteRow;
use stablemon_monitor::{runner, settings, Board};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(io::stderr)
        .init();

    info!("Starting stablemon v{}", env!("CARGO_PKG_VERSION"));

    let config = settings::load()?;
    let pair = config.trading_pair()?;

    // Setup shutdown channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    // Fired by the sink when stdout goes away
    let (output_closed_tx, output_closed_rx) = tokio::sync::oneshot::channel::<()>();

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let output_closed = async {
            if output_closed_rx.await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C");
            }
            _ = terminate => {
                info!("Received termination signal");
            }
            _ = output_closed => {
                info!("Output closed");
            }
        }

        let _ = shutdown_tx.send(());
    });

    info!("Press Ctrl+C to stop");

    let interactive = io::stdout().is_terminal();
    let mut board = Board::new(pair);
    let mut output_closed_tx = Some(output_closed_tx);
    let mut write_failed = false;

    let sink = move |rows: Vec<QuoteRow>| {
        board.observe(&rows);
        let result = board.write_to(&mut io::stdout().lock(), &rows, interactive);
        match result {
            Ok(()) => write_failed = false,
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                if let Some(tx) = output_closed_tx.take() {
                    warn!("Stdout closed, stopping");
                    let _ = tx.send(());
                }
            }
            Err(e) => {
                if !write_failed {
                    warn!("Failed to write quote board: {}", e);
                }
                write_failed = true;
            }
        }
    };

    if let Err(e) = runner::run(&config, shutdown_rx, sink).await {
        error!("Monitor error: {:#}", e);
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}
