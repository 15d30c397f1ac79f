//! Polling engine - fans one fetch per source out on every tick and joins them
//! into a complete snapshot

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use stablemon_core::{
    AdapterError, CoreError, CoreResult, MonitorConfig, Quote, Snapshot, TradingPair,
};

use crate::feeds::SourceAdapter;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pair: TradingPair,
    /// Sleep between the end of one cycle and the start of the next
    pub refresh_interval: Duration,
    /// Optional per-call limit
    pub call_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pair: TradingPair::default(),
            refresh_interval: Duration::from_secs(1),
            call_timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn from_monitor(config: &MonitorConfig) -> CoreResult<Self> {
        Ok(Self {
            pair: config.trading_pair()?,
            refresh_interval: config.refresh_interval(),
            call_timeout: config.call_timeout(),
        })
    }
}

/// Multi-source polling engine. Holds no per-source state between cycles.
pub struct PollingEngine {
    config: EngineConfig,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    cycles: AtomicU64,
    running: AtomicBool,
}

impl PollingEngine {
    pub fn new(config: EngineConfig, adapters: Vec<Arc<dyn SourceAdapter>>) -> CoreResult<Self> {
        if adapters.is_empty() {
            return Err(CoreError::InvalidConfig("engine needs at least one adapter".into()));
        }

        let mut seen = HashSet::new();
        for adapter in &adapters {
            if !seen.insert(adapter.source_id().to_string()) {
                return Err(CoreError::DuplicateSource(adapter.source_id().to_string()));
            }
        }

        Ok(Self {
            config,
            adapters,
            cycles: AtomicU64::new(0),
            running: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Source ids in emission order
    pub fn source_ids(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.source_id().to_string()).collect()
    }

    /// Run one cycle: every source is fetched concurrently and the snapshot holds
    /// exactly one quote per source, in adapter order.
    pub async fn poll_once(&self) -> Snapshot {
        let started_at = Utc::now();
        let start = Instant::now();

        let quotes = join_all(self.adapters.iter().map(|adapter| {
            fetch_quote(
                Arc::clone(adapter),
                self.config.pair.clone(),
                self.config.call_timeout,
            )
        }))
        .await;

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = Snapshot {
            cycle,
            started_at,
            quotes,
        };

        debug!(
            "Cycle {} completed in {:?}: {} ok, {} errors of {} sources",
            cycle,
            start.elapsed(),
            snapshot.ok_count(),
            snapshot.error_count(),
            snapshot.len()
        );

        snapshot
    }

    /// Poll until `shutdown` fires (or its sender is dropped) or the receiver of
    /// `updates_tx` goes away.
    ///
    /// A cycle interrupted by shutdown is discarded, never sent partially.
    pub async fn run(
        &self,
        updates_tx: mpsc::Sender<Snapshot>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        info!(
            "Starting polling engine: {} sources, pair {}, every {:?}",
            self.adapters.len(),
            self.config.pair,
            self.config.refresh_interval
        );
        self.running.store(true, Ordering::SeqCst);

        loop {
            let snapshot = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Polling engine shutdown requested mid-cycle");
                    break;
                }
                snapshot = self.poll_once() => snapshot,
            };

            // A consumer that stops draining must not block shutdown
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Polling engine shutdown requested while delivering");
                    break;
                }
                sent = updates_tx.send(snapshot) => {
                    if sent.is_err() {
                        debug!("Snapshot channel closed");
                        break;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Polling engine shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.config.refresh_interval) => {}
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Polling engine stopped after {} cycles", self.cycles.load(Ordering::Relaxed));
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            source_count: self.adapters.len(),
            cycles_completed: self.cycles.load(Ordering::Relaxed),
            running: self.is_running(),
        }
    }
}

/// Engine statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub source_count: usize,
    pub cycles_completed: u64,
    pub running: bool,
}

/// Fetch one source. Never fails: every adapter failure, a panicking call, and a
/// timed-out call all become an error quote carrying the measured latency.
async fn fetch_quote(
    adapter: Arc<dyn SourceAdapter>,
    pair: TradingPair,
    call_timeout: Option<Duration>,
) -> Quote {
    let source_id = adapter.source_id().to_string();
    let captured_at = Utc::now();
    let start = Instant::now();

    let task = tokio::task::spawn_blocking(move || adapter.fetch_top_of_book(&pair));

    let outcome = match call_timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined.map_err(|e| AdapterError::Panicked(e.to_string())),
            Err(_) => Err(AdapterError::Timeout(limit)),
        },
        None => task.await.map_err(|e| AdapterError::Panicked(e.to_string())),
    }
    .and_then(|result| result);

    let latency = start.elapsed();

    match outcome {
        Ok(book) => Quote::from_book(source_id, &book, captured_at, latency),
        Err(e) => {
            warn!("Source {} failed after {:?}: {}", source_id, latency, e);
            Quote::failed(source_id, e.to_string(), captured_at, latency)
        }
    }
}
