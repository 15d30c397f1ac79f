//! Drives either feed mode and hands each update's rows to a sink

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::info;

use stablemon_core::{FeedMode, MonitorConfig, QuoteRow};
use stablemon_price_feed::{AdapterRegistry, EngineConfig, PollingEngine, QuoteStateTracker};

/// Snapshots buffered between the engine and the sink
const SNAPSHOT_BUFFER: usize = 16;

/// Run the configured mode until `shutdown` fires
pub async fn run<F>(
    config: &MonitorConfig,
    shutdown: oneshot::Receiver<()>,
    sink: F,
) -> anyhow::Result<()>
where
    F: FnMut(Vec<QuoteRow>),
{
    match config.mode {
        FeedMode::Live => run_live(config, AdapterRegistry::with_defaults(), shutdown, sink).await,
        FeedMode::Simulated => run_simulated(config, shutdown, sink).await,
    }
}

/// Poll real sources through `registry`
pub async fn run_live<F>(
    config: &MonitorConfig,
    registry: AdapterRegistry,
    shutdown: oneshot::Receiver<()>,
    mut sink: F,
) -> anyhow::Result<()>
where
    F: FnMut(Vec<QuoteRow>),
{
    let engine_config = EngineConfig::from_monitor(config)?;

    // Blocking HTTP clients must not be created on a runtime thread
    let ids = config.sources.clone();
    let http = config.http.clone();
    let adapters = tokio::task::spawn_blocking(move || registry.build(&ids, &http)).await??;

    let engine = Arc::new(PollingEngine::new(engine_config, adapters)?);
    let (updates_tx, mut updates_rx) = mpsc::channel(SNAPSHOT_BUFFER);

    let handle = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.run(updates_tx, shutdown).await }
    });

    while let Some(snapshot) = updates_rx.recv().await {
        sink(snapshot.rows(Utc::now()));
    }

    handle.await?;
    info!("Live feed stopped: {:?}", engine.stats());
    Ok(())
}

/// Advance the simulated tracker on a fixed cadence
pub async fn run_simulated<F>(
    config: &MonitorConfig,
    mut shutdown: oneshot::Receiver<()>,
    mut sink: F,
) -> anyhow::Result<()>
where
    F: FnMut(Vec<QuoteRow>),
{
    let policy = config.simulation.clone();
    let tracker = match config.seed {
        Some(seed) => QuoteStateTracker::seeded(&config.sources, policy, seed)?,
        None => QuoteStateTracker::from_entropy(&config.sources, policy)?,
    };
    let active = config.active_set();

    info!(
        "Starting simulated feed: {} sources ({} active), every {:?}",
        config.sources.len(),
        active.len(),
        config.refresh_interval()
    );

    let mut ticker = tokio::time::interval(config.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Simulated feed shutdown requested");
                break;
            }
            _ = ticker.tick() => sink(tracker.refresh(&active)),
        }
    }

    info!("Simulated feed stopped: {:?}", tracker.stats());
    Ok(())
}
