//! Source adapters: one blocking top-of-book call per exchange

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use stablemon_core::{
    AdapterError, AdapterResult, CoreError, CoreResult, HttpConfig, PriceLevel, TopOfBook,
    TradingPair,
};

/// A single remote quote source.
///
/// `fetch_top_of_book` blocks the calling thread; the polling engine runs it on
/// the blocking pool so sources never wait on each other.
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> &str;
    fn fetch_top_of_book(&self, pair: &TradingPair) -> AdapterResult<TopOfBook>;
}

const BINANCE_URL: &str = "https://api.binance.com";
const KRAKEN_URL: &str = "https://api.kraken.com";
const COINBASE_URL: &str = "https://api.exchange.coinbase.com";

/// Longest error body kept in an `AdapterError::Http`
const MAX_ERROR_BODY: usize = 200;

/// Build the blocking HTTP client used by the REST adapters.
///
/// Must not be called from inside an async context.
pub fn http_client(config: &HttpConfig) -> CoreResult<Client> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| CoreError::InvalidConfig(format!("HTTP client: {}", e)))
}

/// GET a URL and return the body, mapping transport and status failures
fn get_body(client: &Client, url: &str, query: &[(&str, String)], timeout: Duration) -> AdapterResult<String> {
    let response = client.get(url).query(query).send().map_err(|e| {
        if e.is_timeout() {
            AdapterError::Timeout(timeout)
        } else {
            AdapterError::Network(e.to_string())
        }
    })?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AdapterError::RateLimited);
    }

    let body = response
        .text()
        .map_err(|e| AdapterError::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(AdapterError::Http {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        });
    }

    debug!("GET {} -> {} bytes", url, body.len());
    Ok(body)
}

fn invalid(msg: impl Into<String>) -> AdapterError {
    AdapterError::InvalidResponse(msg.into())
}

fn parse_decimal(s: &str) -> AdapterResult<f64> {
    s.parse::<f64>()
        .map_err(|_| invalid(format!("not a number: {:?}", s)))
}

fn parse_number(value: &Value) -> AdapterResult<f64> {
    match value {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid(format!("not a number: {}", n))),
        other => Err(invalid(format!("not a number: {}", other))),
    }
}

/// `[price, amount, ...]` as sent by Kraken and Coinbase
fn parse_level(entry: &[Value]) -> AdapterResult<PriceLevel> {
    match entry {
        [price, amount, ..] => Ok(PriceLevel::new(parse_number(price)?, parse_number(amount)?)),
        _ => Err(invalid("price level needs price and amount")),
    }
}

fn best_level(levels: &[Vec<Value>]) -> AdapterResult<Option<PriceLevel>> {
    levels.first().map(|entry| parse_level(entry)).transpose()
}

// ---------------------------------------------------------------------------
// Binance
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceBookTicker {
    bid_price: String,
    bid_qty: String,
    ask_price: String,
    ask_qty: String,
}

/// Parse a `/api/v3/ticker/bookTicker` body
pub fn parse_binance_book(body: &str) -> AdapterResult<TopOfBook> {
    let ticker: BinanceBookTicker =
        serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;

    // Binance reports an empty side as zero price and zero quantity
    let side = |price: &str, qty: &str| -> AdapterResult<Option<PriceLevel>> {
        let price = parse_decimal(price)?;
        let qty = parse_decimal(qty)?;
        if price == 0.0 && qty == 0.0 {
            Ok(None)
        } else {
            Ok(Some(PriceLevel::new(price, qty)))
        }
    };

    Ok(TopOfBook::new(
        side(&ticker.bid_price, &ticker.bid_qty)?,
        side(&ticker.ask_price, &ticker.ask_qty)?,
    ))
}

pub struct BinanceAdapter {
    source_id: String,
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl BinanceAdapter {
    pub fn new(source_id: impl Into<String>, config: &HttpConfig) -> CoreResult<Self> {
        Ok(Self {
            source_id: source_id.into(),
            base_url: BINANCE_URL.to_string(),
            client: http_client(config)?,
            timeout: config.timeout(),
        })
    }
}

impl SourceAdapter for BinanceAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn fetch_top_of_book(&self, pair: &TradingPair) -> AdapterResult<TopOfBook> {
        let url = format!("{}/api/v3/ticker/bookTicker", self.base_url);
        let body = get_body(&self.client, &url, &[("symbol", pair.concat())], self.timeout)?;
        parse_binance_book(&body)
    }
}

// ---------------------------------------------------------------------------
// Kraken
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct KrakenResponse {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: HashMap<String, KrakenBook>,
}

#[derive(Debug, Deserialize)]
struct KrakenBook {
    #[serde(default)]
    asks: Vec<Vec<Value>>,
    #[serde(default)]
    bids: Vec<Vec<Value>>,
}

/// Parse a `/0/public/Depth` body
pub fn parse_kraken_book(body: &str) -> AdapterResult<TopOfBook> {
    let response: KrakenResponse =
        serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;

    if !response.error.is_empty() {
        if response.error.iter().any(|e| e.contains("Rate limit") || e.contains("Too many requests")) {
            return Err(AdapterError::RateLimited);
        }
        return Err(AdapterError::Other(response.error.join("; ")));
    }

    // Kraken keys the book by its own pair name, which may differ from the request
    let book = response
        .result
        .into_values()
        .next()
        .ok_or_else(|| invalid("empty result"))?;

    Ok(TopOfBook::new(best_level(&book.bids)?, best_level(&book.asks)?))
}

pub struct KrakenAdapter {
    source_id: String,
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl KrakenAdapter {
    pub fn new(source_id: impl Into<String>, config: &HttpConfig) -> CoreResult<Self> {
        Ok(Self {
            source_id: source_id.into(),
            base_url: KRAKEN_URL.to_string(),
            client: http_client(config)?,
            timeout: config.timeout(),
        })
    }
}

impl SourceAdapter for KrakenAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn fetch_top_of_book(&self, pair: &TradingPair) -> AdapterResult<TopOfBook> {
        let url = format!("{}/0/public/Depth", self.base_url);
        let query = [("pair", pair.concat()), ("count", "1".to_string())];
        let body = get_body(&self.client, &url, &query, self.timeout)?;
        parse_kraken_book(&body)
    }
}

// ---------------------------------------------------------------------------
// Coinbase
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CoinbaseBook {
    #[serde(default)]
    bids: Vec<Vec<Value>>,
    #[serde(default)]
    asks: Vec<Vec<Value>>,
}

/// Parse a `/products/{id}/book?level=1` body
pub fn parse_coinbase_book(body: &str) -> AdapterResult<TopOfBook> {
    let book: CoinbaseBook = serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;
    Ok(TopOfBook::new(best_level(&book.bids)?, best_level(&book.asks)?))
}

pub struct CoinbaseAdapter {
    source_id: String,
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl CoinbaseAdapter {
    pub fn new(source_id: impl Into<String>, config: &HttpConfig) -> CoreResult<Self> {
        Ok(Self {
            source_id: source_id.into(),
            base_url: COINBASE_URL.to_string(),
            client: http_client(config)?,
            timeout: config.timeout(),
        })
    }
}

impl SourceAdapter for CoinbaseAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn fetch_top_of_book(&self, pair: &TradingPair) -> AdapterResult<TopOfBook> {
        let url = format!("{}/products/{}/book", self.base_url, pair.dashed());
        let body = get_body(&self.client, &url, &[("level", "1".to_string())], self.timeout)?;
        parse_coinbase_book(&body)
    }
}
