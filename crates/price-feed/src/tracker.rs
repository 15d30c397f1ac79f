//! Per-source quote state tracking for simulation mode
//!
//! Advances a fresh/stale/error state machine for every configured source without
//! any network I/O. Sources the caller leaves out of the active set are demoted to
//! stale and keep their last prices; active sources either error (with the policy's
//! probability) or receive a new synthetic quote.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use stablemon_core::{
    age_since, spread, CoreError, CoreResult, QuoteRow, RowStatus, SimulationPolicy,
    SourceStatus,
};

/// Last known state of one source
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrackedSourceState {
    pub last_bid: Option<f64>,
    pub last_ask: Option<f64>,
    pub last_updated_at: DateTime<Utc>,
    pub status: SourceStatus,
}

impl TrackedSourceState {
    fn to_row(&self, source_id: &str, now: DateTime<Utc>) -> QuoteRow {
        let status = RowStatus::from(self.status);
        QuoteRow {
            source_id: source_id.to_string(),
            bid: self.last_bid,
            ask: self.last_ask,
            spread: spread(self.last_bid, self.last_ask),
            age: age_since(self.last_updated_at, now),
            latency: None,
            status,
            error_detail: (status == RowStatus::Error).then(|| "simulated source error".to_string()),
        }
    }
}

/// Simulated quote state for a fixed set of sources.
///
/// Each source's read-modify-write happens under its map shard lock, so concurrent
/// refreshes never tear a single source's state. Output order is construction order.
pub struct QuoteStateTracker {
    policy: SimulationPolicy,
    order: Vec<String>,
    states: DashMap<String, TrackedSourceState>,
    rng: Mutex<StdRng>,
    refresh_count: AtomicU64,
}

impl QuoteStateTracker {
    /// Seed every source with a fresh synthetic quote at `now`
    pub fn new(
        sources: &[String],
        policy: SimulationPolicy,
        mut rng: StdRng,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        policy.validate()?;
        if sources.is_empty() {
            return Err(CoreError::InvalidConfig("tracker needs at least one source".into()));
        }

        let states = DashMap::new();
        let mut order = Vec::with_capacity(sources.len());
        for source in sources {
            if states.contains_key(source) {
                return Err(CoreError::DuplicateSource(source.clone()));
            }
            let (bid, ask) = generate_price(&mut rng, &policy);
            states.insert(
                source.clone(),
                TrackedSourceState {
                    last_bid: Some(bid),
                    last_ask: Some(ask),
                    last_updated_at: now,
                    status: SourceStatus::Fresh,
                },
            );
            order.push(source.clone());
        }

        Ok(Self {
            policy,
            order,
            states,
            rng: Mutex::new(rng),
            refresh_count: AtomicU64::new(0),
        })
    }

    /// Deterministic tracker for tests and reproducible demos
    pub fn seeded(sources: &[String], policy: SimulationPolicy, seed: u64) -> CoreResult<Self> {
        Self::new(sources, policy, StdRng::seed_from_u64(seed), Utc::now())
    }

    pub fn from_entropy(sources: &[String], policy: SimulationPolicy) -> CoreResult<Self> {
        Self::new(sources, policy, StdRng::from_entropy(), Utc::now())
    }

    pub fn policy(&self) -> &SimulationPolicy {
        &self.policy
    }

    pub fn source_ids(&self) -> &[String] {
        &self.order
    }

    /// Advance every source once against the wall clock
    pub fn refresh(&self, active: &HashSet<String>) -> Vec<QuoteRow> {
        self.refresh_at(active, Utc::now())
    }

    /// Advance every source once as of `now` and return one row per source
    pub fn refresh_at(&self, active: &HashSet<String>, now: DateTime<Utc>) -> Vec<QuoteRow> {
        for id in active.iter().filter(|id| !self.states.contains_key(*id)) {
            debug!("Ignoring untracked active source {}", id);
        }

        let rows = self
            .order
            .iter()
            .filter_map(|id| {
                let mut state = self.states.get_mut(id)?;
                if active.contains(id) {
                    self.advance(&mut state, now);
                } else {
                    // Demotion is persisted; prices and timestamp are left alone
                    state.status = SourceStatus::Stale;
                }
                Some(state.to_row(id, now))
            })
            .collect();

        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        rows
    }

    /// Current rows without advancing any state
    pub fn rows_at(&self, now: DateTime<Utc>) -> Vec<QuoteRow> {
        self.order
            .iter()
            .filter_map(|id| self.states.get(id).map(|state| state.to_row(id, now)))
            .collect()
    }

    fn advance(&self, state: &mut TrackedSourceState, now: DateTime<Utc>) {
        let mut rng = self.rng.lock();

        if rng.gen::<f64>() < self.policy.error_probability {
            state.last_bid = None;
            state.last_ask = None;
            state.status = SourceStatus::Error;
        } else {
            let (bid, ask) = generate_price(&mut rng, &self.policy);
            state.last_bid = Some(bid);
            state.last_ask = Some(ask);
            state.status = SourceStatus::Fresh;
        }
        state.last_updated_at = now;
    }

    #[cfg(test)]
    pub(crate) fn state(&self, source_id: &str) -> Option<TrackedSourceState> {
        self.states.get(source_id).map(|s| s.clone())
    }

    pub fn stats(&self) -> TrackerStats {
        let mut stats = TrackerStats {
            source_count: self.order.len(),
            refresh_count: self.refresh_count.load(Ordering::Relaxed),
            ..Default::default()
        };
        for entry in self.states.iter() {
            match entry.value().status {
                SourceStatus::Fresh => stats.fresh += 1,
                SourceStatus::Stale => stats.stale += 1,
                SourceStatus::Error => stats.error += 1,
            }
        }
        stats
    }
}

/// Tracker statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub source_count: usize,
    pub refresh_count: u64,
    pub fresh: usize,
    pub stale: usize,
    pub error: usize,
}

/// Synthetic `(bid, ask)`, both rounded to 6 decimals. The spread is only ever
/// added, so `ask >= bid`.
fn generate_price(rng: &mut StdRng, policy: &SimulationPolicy) -> (f64, f64) {
    let base = policy.base_price
        + rng.gen_range(-policy.price_jitter..=policy.price_jitter);
    let spread = rng.gen_range(policy.spread_min..=policy.spread_max);
    (round6(base), round6(base + spread))
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
