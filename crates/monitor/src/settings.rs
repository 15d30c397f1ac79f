//! Configuration loading: optional TOML file, then `STABLEMON_*` environment

use anyhow::Context;
use config::{Config, Environment, File};
use std::env;
use tracing::info;

use stablemon_core::MonitorConfig;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "STABLEMON_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "stablemon.toml";
pub const ENV_PREFIX: &str = "STABLEMON";

/// `STABLEMON_REFRESH_INTERVAL_MS=500`, `STABLEMON_SOURCES=binance,kraken`,
/// `STABLEMON_SIMULATION__ERROR_PROBABILITY=0.1`
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("sources")
        .with_list_parse_key("active_sources")
        .try_parsing(true)
}

/// Load from the default locations and validate
pub fn load() -> anyhow::Result<MonitorConfig> {
    let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from(&path, environment())
}

/// Layer `path` (if it exists) under `env` and validate the result
pub fn load_from(path: &str, env: Environment) -> anyhow::Result<MonitorConfig> {
    let config: MonitorConfig = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(env)
        .build()
        .with_context(|| format!("reading configuration from {}", path))?
        .try_deserialize()
        .context("parsing configuration")?;

    config.validate().context("invalid configuration")?;

    info!(
        "Loaded configuration: pair={} mode={:?} sources={:?} interval={}ms",
        config.pair, config.mode, config.sources, config.refresh_interval_ms
    );
    Ok(config)
}
