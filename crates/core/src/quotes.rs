//! Quote, snapshot and display row types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{PriceLevel, QuoteStatus, RowStatus, TopOfBook};

/// Result of polling one source once.
///
/// `bid` and `ask` are both present or both absent, and `error_detail` is present
/// exactly when `status` is `Error`. Build through [`Quote::from_book`] or
/// [`Quote::failed`] to keep that true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub source_id: String,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    /// Wall clock at issuance
    pub captured_at: DateTime<Utc>,
    /// Issuance to completion, failures included
    pub latency: Duration,
    pub status: QuoteStatus,
    pub error_detail: Option<String>,
}

impl Quote {
    /// Build from a successful adapter call
    pub fn from_book(
        source_id: impl Into<String>,
        book: &TopOfBook,
        captured_at: DateTime<Utc>,
        latency: Duration,
    ) -> Self {
        let source_id = source_id.into();

        let invalid = |side: &str, level: &Option<PriceLevel>| match level {
            Some(l) if !l.is_valid() => Some(format!("Invalid response: {} price {}", side, l.price)),
            _ => None,
        };
        if let Some(detail) = invalid("bid", &book.bid).or_else(|| invalid("ask", &book.ask)) {
            return Self::failed(source_id, detail, captured_at, latency);
        }

        match (book.bid, book.ask) {
            (Some(bid), Some(ask)) => Self {
                source_id,
                bid: Some(bid.price),
                ask: Some(ask.price),
                captured_at,
                latency,
                status: QuoteStatus::Ok,
                error_detail: None,
            },
            _ => Self {
                source_id,
                bid: None,
                ask: None,
                captured_at,
                latency,
                status: QuoteStatus::Empty,
                error_detail: None,
            },
        }
    }

    /// Build from a failed adapter call
    pub fn failed(
        source_id: impl Into<String>,
        detail: impl Into<String>,
        captured_at: DateTime<Utc>,
        latency: Duration,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            bid: None,
            ask: None,
            captured_at,
            latency,
            status: QuoteStatus::Error,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == QuoteStatus::Ok
    }

    pub fn spread(&self) -> Option<f64> {
        spread(self.bid, self.ask)
    }

    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }
}

/// One complete polling cycle: exactly one quote per configured source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 1-based cycle number
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub quotes: Vec<Quote>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn get(&self, source_id: &str) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.source_id == source_id)
    }

    pub fn ok_count(&self) -> usize {
        self.count(QuoteStatus::Ok)
    }

    pub fn error_count(&self) -> usize {
        self.count(QuoteStatus::Error)
    }

    fn count(&self, status: QuoteStatus) -> usize {
        self.quotes.iter().filter(|q| q.status == status).count()
    }

    pub fn rows(&self, now: DateTime<Utc>) -> Vec<QuoteRow> {
        self.quotes.iter().map(|q| QuoteRow::from_quote(q, now)).collect()
    }
}

/// Display row derived from a quote or a tracked source state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow {
    pub source_id: String,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub spread: Option<f64>,
    pub age: Duration,
    pub latency: Option<Duration>,
    pub status: RowStatus,
    pub error_detail: Option<String>,
}

impl QuoteRow {
    pub fn from_quote(quote: &Quote, now: DateTime<Utc>) -> Self {
        Self {
            source_id: quote.source_id.clone(),
            bid: quote.bid,
            ask: quote.ask,
            spread: quote.spread(),
            age: age_since(quote.captured_at, now),
            latency: Some(quote.latency),
            status: quote.status.into(),
            error_detail: quote.error_detail.clone(),
        }
    }

    pub fn age_secs(&self) -> f64 {
        self.age.as_secs_f64()
    }
}

/// `ask - bid` when both sides are known
pub fn spread(bid: Option<f64>, ask: Option<f64>) -> Option<f64> {
    match (bid, ask) {
        (Some(bid), Some(ask)) => Some(ask - bid),
        _ => None,
    }
}

/// Elapsed time from `then` to `now`, floored at zero
pub fn age_since(then: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - then).to_std().unwrap_or(Duration::ZERO)
}
