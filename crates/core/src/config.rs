//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::{CoreError, CoreResult, TradingPair};

/// Bounds for the refresh interval, inclusive
pub const MIN_REFRESH_INTERVAL_MS: u64 = 250;
pub const MAX_REFRESH_INTERVAL_MS: u64 = 10_000;

/// Upper bound for the simulated base price
pub const MAX_BASE_PRICE: f64 = 1e6;

/// Where snapshots come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Poll the configured exchanges
    #[default]
    Live,
    /// Synthetic quotes from the state tracker, no network I/O
    Simulated,
}

/// HTTP settings shared by the REST adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: concat!("stablemon/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Knobs for synthetic quote generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationPolicy {
    pub base_price: f64,
    /// Base price is drawn from `[base_price - jitter, base_price + jitter]`
    pub price_jitter: f64,
    pub spread_min: f64,
    pub spread_max: f64,
    /// Chance that an active source errors on a refresh
    pub error_probability: f64,
}

impl Default for SimulationPolicy {
    fn default() -> Self {
        Self {
            base_price: 1.0,
            price_jitter: 0.0005,
            spread_min: 0.00005,
            spread_max: 0.0004,
            error_probability: 0.03,
        }
    }
}

impl SimulationPolicy {
    pub fn validate(&self) -> CoreResult<()> {
        let finite = [
            self.base_price,
            self.price_jitter,
            self.spread_min,
            self.spread_max,
            self.error_probability,
        ]
        .iter()
        .all(|v| v.is_finite());

        if !finite {
            return Err(CoreError::InvalidConfig("simulation policy values must be finite".into()));
        }
        if !(0.0..=1.0).contains(&self.error_probability) {
            return Err(CoreError::InvalidConfig(format!(
                "error_probability {} not in [0, 1]",
                self.error_probability
            )));
        }
        if self.price_jitter < 0.0 {
            return Err(CoreError::InvalidConfig("price_jitter must be >= 0".into()));
        }
        if self.spread_min < 0.0 || self.spread_min > self.spread_max {
            return Err(CoreError::InvalidConfig(format!(
                "spread range [{}, {}] is invalid",
                self.spread_min, self.spread_max
            )));
        }
        if self.base_price <= self.price_jitter {
            return Err(CoreError::InvalidConfig(
                "base_price must exceed price_jitter so prices stay positive".into(),
            ));
        }
        // Keeps every sampling range and base + jitter + spread finite
        if self.base_price > MAX_BASE_PRICE {
            return Err(CoreError::InvalidConfig(format!(
                "base_price {} exceeds {}",
                self.base_price, MAX_BASE_PRICE
            )));
        }
        if self.spread_max >= self.base_price {
            return Err(CoreError::InvalidConfig(format!(
                "spread_max {} must be below base_price {}",
                self.spread_max, self.base_price
            )));
        }
        Ok(())
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub pair: String,
    pub sources: Vec<String>,
    pub mode: FeedMode,
    pub refresh_interval_ms: u64,
    /// Per-call limit; none means each call runs to completion
    pub call_timeout_ms: Option<u64>,
    /// Simulation mode only; defaults to every source
    pub active_sources: Option<Vec<String>>,
    pub seed: Option<u64>,
    pub http: HttpConfig,
    pub simulation: SimulationPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pair: "USDT/USDC".to_string(),
            sources: vec![
                "binance".to_string(),
                "kraken".to_string(),
                "coinbase".to_string(),
            ],
            mode: FeedMode::Live,
            refresh_interval_ms: 1_000,
            call_timeout_ms: None,
            active_sources: None,
            seed: None,
            http: HttpConfig::default(),
            simulation: SimulationPolicy::default(),
        }
    }
}

impl MonitorConfig {
    pub fn trading_pair(&self) -> CoreResult<TradingPair> {
        self.pair.parse()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Active subset for simulation mode, spelled as in `sources`.
    /// Active ids match case-insensitively; unmatched ids are dropped.
    pub fn active_set(&self) -> HashSet<String> {
        match &self.active_sources {
            Some(active) => active
                .iter()
                .filter_map(|id| self.configured_source(id))
                .map(str::to_string)
                .collect(),
            None => self.sources.iter().cloned().collect(),
        }
    }

    /// Configured spelling of `id`, matched case-insensitively
    pub fn configured_source(&self, id: &str) -> Option<&str> {
        self.sources
            .iter()
            .find(|source| source.to_lowercase() == id.to_lowercase())
            .map(String::as_str)
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.trading_pair()?;

        if self.sources.is_empty() {
            return Err(CoreError::InvalidConfig("at least one source is required".into()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.trim().is_empty() {
                return Err(CoreError::InvalidConfig("source ids must not be blank".into()));
            }
            if !seen.insert(source.to_lowercase()) {
                return Err(CoreError::DuplicateSource(source.clone()));
            }
        }

        if !(MIN_REFRESH_INTERVAL_MS..=MAX_REFRESH_INTERVAL_MS).contains(&self.refresh_interval_ms) {
            return Err(CoreError::InvalidConfig(format!(
                "refresh_interval_ms {} outside {}..={}",
                self.refresh_interval_ms, MIN_REFRESH_INTERVAL_MS, MAX_REFRESH_INTERVAL_MS
            )));
        }

        if self.call_timeout_ms == Some(0) {
            return Err(CoreError::InvalidConfig("call_timeout_ms must be > 0".into()));
        }

        if self.http.timeout_ms == 0 {
            return Err(CoreError::InvalidConfig("http.timeout_ms must be > 0".into()));
        }

        if let Some(active) = &self.active_sources {
            if let Some(unknown) = active.iter().find(|a| self.configured_source(a).is_none()) {
                return Err(CoreError::UnknownSource(unknown.clone()));
            }
        }

        self.simulation.validate()
    }
}
