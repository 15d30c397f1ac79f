use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use stablemon_core::{RowStatus, SimulationPolicy};
use stablemon_price_feed::QuoteStateTracker;

const SOURCES: [&str; 5] = ["binance", "okx", "bybit", "kraken", "coinbase"];

fn sources() -> Vec<String> {
    SOURCES.iter().map(|s| s.to_string()).collect()
}

fn is_rounded(value: f64) -> bool {
    ((value * 1e6).round() - value * 1e6).abs() < 1e-6
}

proptest! {
    #[test]
    fn rows_cover_every_source_and_keep_invariants(
        seed in any::<u64>(),
        masks in prop::collection::vec(0u8..32, 1..20),
    ) {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let tracker = QuoteStateTracker::new(
            &sources(),
            SimulationPolicy { error_probability: 0.2, ..Default::default() },
            StdRng::seed_from_u64(seed),
            t0,
        ).unwrap();

        for (step, mask) in masks.iter().enumerate() {
            let active: HashSet<String> = SOURCES
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, s)| s.to_string())
                .collect();
            let now = t0 + Duration::seconds(step as i64 + 1);
            let before = tracker.rows_at(now);
            let rows = tracker.refresh_at(&active, now);

            prop_assert_eq!(rows.len(), SOURCES.len());
            for (i, row) in rows.iter().enumerate() {
                prop_assert_eq!(&row.source_id, SOURCES[i]);
                prop_assert_eq!(row.bid.is_some(), row.ask.is_some());

                if let (Some(bid), Some(ask)) = (row.bid, row.ask) {
                    prop_assert!(ask >= bid);
                    prop_assert_eq!(row.spread, Some(ask - bid));
                } else {
                    prop_assert_eq!(row.spread, None);
                }

                if active.contains(&row.source_id) {
                    prop_assert!(matches!(row.status, RowStatus::Ok | RowStatus::Error));
                    prop_assert_eq!(row.age, std::time::Duration::ZERO);
                    if row.status == RowStatus::Ok {
                        prop_assert!(is_rounded(row.bid.unwrap()));
                        prop_assert!(is_rounded(row.ask.unwrap()));
                    } else {
                        prop_assert!(row.bid.is_none());
                    }
                } else {
                    prop_assert_eq!(row.status, RowStatus::Stale);
                    prop_assert_eq!(row.bid, before[i].bid);
                    prop_assert_eq!(row.ask, before[i].ask);
                    prop_assert_eq!(row.age, before[i].age);
                }
            }
        }
    }
}
