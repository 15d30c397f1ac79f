//! Source id -> adapter constructor mapping, resolved once at startup

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use stablemon_core::{CoreError, CoreResult, HttpConfig};

use crate::feeds::{BinanceAdapter, CoinbaseAdapter, KrakenAdapter, SourceAdapter};

/// Builds an adapter for the given source id
pub type AdapterFactory =
    Arc<dyn Fn(&str, &HttpConfig) -> CoreResult<Arc<dyn SourceAdapter>> + Send + Sync>;

/// Explicit registry of known sources
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: HashMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in exchange adapter
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("binance", |id, http| {
            Ok(Arc::new(BinanceAdapter::new(id, http)?) as Arc<dyn SourceAdapter>)
        });
        registry.register("kraken", |id, http| {
            Ok(Arc::new(KrakenAdapter::new(id, http)?) as Arc<dyn SourceAdapter>)
        });
        registry.register("coinbase", |id, http| {
            Ok(Arc::new(CoinbaseAdapter::new(id, http)?) as Arc<dyn SourceAdapter>)
        });
        registry
    }

    /// Register (or replace) a factory. Ids are matched case-insensitively.
    pub fn register<F>(&mut self, source_id: &str, factory: F)
    where
        F: Fn(&str, &HttpConfig) -> CoreResult<Arc<dyn SourceAdapter>> + Send + Sync + 'static,
    {
        self.factories
            .insert(source_id.to_lowercase(), Arc::new(factory));
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.factories.contains_key(&source_id.to_lowercase())
    }

    /// Known ids, sorted
    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Build one adapter per id, in order. Fails on the first unknown id.
    ///
    /// The built-in adapters own a blocking HTTP client, so call this outside
    /// of an async context (e.g. inside `spawn_blocking`).
    pub fn build(
        &self,
        source_ids: &[String],
        http: &HttpConfig,
    ) -> CoreResult<Vec<Arc<dyn SourceAdapter>>> {
        source_ids
            .iter()
            .map(|id| {
                let factory = self
                    .factories
                    .get(&id.to_lowercase())
                    .ok_or_else(|| CoreError::UnknownSource(id.clone()))?;
                let adapter = factory(id, http)?;
                info!("Built adapter for {}", id);
                Ok(adapter)
            })
            .collect()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("sources", &self.source_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stablemon_core::{AdapterResult, TopOfBook, TradingPair};

    struct NullAdapter(String);

    impl SourceAdapter for NullAdapter {
        fn source_id(&self) -> &str {
            &self.0
        }

        fn fetch_top_of_book(&self, _pair: &TradingPair) -> AdapterResult<TopOfBook> {
            Ok(TopOfBook::empty())
        }
    }

    fn null_registry() -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        for id in ["alpha", "beta"] {
            registry.register(id, |id, _| Ok(Arc::new(NullAdapter(id.to_string())) as Arc<dyn SourceAdapter>));
        }
        registry
    }

    #[test]
    fn test_defaults_registered() {
        let registry = AdapterRegistry::with_defaults();
        assert_eq!(registry.source_ids(), vec!["binance", "coinbase", "kraken"]);
        assert!(registry.contains("Binance"));
        assert!(!registry.contains("bitstamp"));
    }

    #[test]
    fn test_build_defaults() {
        let registry = AdapterRegistry::with_defaults();
        let ids = vec!["kraken".to_string(), "Binance".to_string()];
        let adapters = registry.build(&ids, &HttpConfig::default()).unwrap();

        assert_eq!(adapters.len(), 2);
        assert_eq!(adapters[0].source_id(), "kraken");
        assert_eq!(adapters[1].source_id(), "Binance");
    }

    #[test]
    fn test_build_preserves_order() {
        let registry = null_registry();
        let ids = vec!["beta".to_string(), "alpha".to_string()];
        let adapters = registry.build(&ids, &HttpConfig::default()).unwrap();

        let built: Vec<&str> = adapters.iter().map(|a| a.source_id()).collect();
        assert_eq!(built, vec!["beta", "alpha"]);
    }

    #[test]
    fn test_unknown_source_fails() {
        let registry = null_registry();
        let ids = vec!["alpha".to_string(), "gamma".to_string(), "delta".to_string()];

        match registry.build(&ids, &HttpConfig::default()) {
            Err(CoreError::UnknownSource(id)) => assert_eq!(id, "gamma"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected failure"),
        }
    }
}
