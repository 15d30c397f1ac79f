//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Trading pair, e.g. `USDT/USDC`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.trim().to_uppercase(),
            quote: quote.trim().to_uppercase(),
        }
    }

    /// Symbol without separator (`USDTUSDC`)
    pub fn concat(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// Symbol with a dash (`USDT-USDC`)
    pub fn dashed(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| CoreError::InvalidPair(s.to_string()))?;

        let pair = TradingPair::new(base, quote);
        let valid = |side: &str| !side.is_empty() && side.chars().all(|c| c.is_ascii_alphanumeric());

        if !valid(&pair.base) || !valid(&pair.quote) {
            return Err(CoreError::InvalidPair(s.to_string()));
        }
        Ok(pair)
    }
}

impl TryFrom<String> for TradingPair {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TradingPair> for String {
    fn from(pair: TradingPair) -> Self {
        pair.to_string()
    }
}

impl Default for TradingPair {
    fn default() -> Self {
        TradingPair::new("USDT", "USDC")
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Best level of one side of the book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub amount: f64,
}

impl PriceLevel {
    pub fn new(price: f64, amount: f64) -> Self {
        Self { price, amount }
    }

    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Top of book as returned by a source adapter.
/// Either side may be absent when the book has no depth there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TopOfBook {
    pub bid: Option<PriceLevel>,
    pub ask: Option<PriceLevel>,
}

impl TopOfBook {
    pub fn new(bid: Option<PriceLevel>, ask: Option<PriceLevel>) -> Self {
        Self { bid, ask }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_two_sided(&self) -> bool {
        self.bid.is_some() && self.ask.is_some()
    }
}

/// Outcome of one poll of one source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    /// Both sides present
    Ok,
    /// Source answered but one or both sides had no depth
    Empty,
    /// Source failed
    Error,
}

impl QuoteStatus {
    pub fn name(&self) -> &'static str {
        match self {
            QuoteStatus::Ok => "ok",
            QuoteStatus::Empty => "empty",
            QuoteStatus::Error => "error",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Freshness of a tracked source between refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Fresh,
    Stale,
    Error,
}

impl SourceStatus {
    pub fn name(&self) -> &'static str {
        match self {
            SourceStatus::Fresh => "fresh",
            SourceStatus::Stale => "stale",
            SourceStatus::Error => "error",
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Status shown on a display row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RowStatus {
    Ok,
    Empty,
    Stale,
    Error,
}

impl RowStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RowStatus::Ok => "OK",
            RowStatus::Empty => "EMPTY",
            RowStatus::Stale => "STALE",
            RowStatus::Error => "ERROR",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, RowStatus::Ok | RowStatus::Empty)
    }
}

impl From<QuoteStatus> for RowStatus {
    fn from(status: QuoteStatus) -> Self {
        match status {
            QuoteStatus::Ok => RowStatus::Ok,
            QuoteStatus::Empty => RowStatus::Empty,
            QuoteStatus::Error => RowStatus::Error,
        }
    }
}

impl From<SourceStatus> for RowStatus {
    fn from(status: SourceStatus) -> Self {
        match status {
            SourceStatus::Fresh => RowStatus::Ok,
            SourceStatus::Stale => RowStatus::Stale,
            SourceStatus::Error => RowStatus::Error,
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
