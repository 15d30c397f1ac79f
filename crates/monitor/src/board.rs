//! Text quote board: renders rows as a table and logs status transitions

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use stablemon_core::{QuoteRow, RowStatus, TradingPair};

/// Minimum gap between "Updated quotes" summary lines
pub const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

const PLACEHOLDER: &str = "-";

/// A source whose status differs from the previous update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub source_id: String,
    /// `None` on the first update seen for the source
    pub from: Option<RowStatus>,
    pub to: RowStatus,
}

/// Presenter state across updates
pub struct Board {
    pair: TradingPair,
    last_status: HashMap<String, RowStatus>,
    last_summary: Option<Instant>,
    updates: u64,
}

impl Board {
    pub fn new(pair: TradingPair) -> Self {
        Self {
            pair,
            last_status: HashMap::new(),
            last_summary: None,
            updates: 0,
        }
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn observe(&mut self, rows: &[QuoteRow]) -> Vec<StatusChange> {
        self.observe_at(rows, Instant::now())
    }

    /// Record an update and log what changed since the previous one
    pub fn observe_at(&mut self, rows: &[QuoteRow], now: Instant) -> Vec<StatusChange> {
        self.updates += 1;
        let mut changes = Vec::new();

        for row in rows {
            let previous = self.last_status.insert(row.source_id.clone(), row.status);
            if previous == Some(row.status) {
                continue;
            }

            match row.status {
                RowStatus::Error => warn!(
                    "{} went to ERROR: {}",
                    row.source_id,
                    row.error_detail.as_deref().unwrap_or("unknown error")
                ),
                RowStatus::Stale => warn!("{} is STALE", row.source_id),
                status if previous.is_some() => {
                    info!("{} recovered: {}", row.source_id, status.label())
                }
                _ => {}
            }

            changes.push(StatusChange {
                source_id: row.source_id.clone(),
                from: previous,
                to: row.status,
            });
        }

        let due = self
            .last_summary
            .map_or(true, |at| now.saturating_duration_since(at) >= SUMMARY_INTERVAL);
        if due {
            let live = rows.iter().filter(|r| r.status != RowStatus::Stale).count();
            info!("Updated quotes for {} sources", live);
            self.last_summary = Some(now);
        }

        changes
    }

    /// Render rows in their given order
    pub fn render(&self, rows: &[QuoteRow]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} top of book", self.pair);
        let _ = writeln!(
            out,
            "{:<12} {:>10} {:>10} {:>10} {:>8} {:>12} {:<7} {}",
            "Exchange", "Bid", "Ask", "Spread", "Age (s)", "Latency (ms)", "Status", "Error"
        );

        for row in rows {
            let latency = row
                .latency
                .map(|l| format!("{:.1}", l.as_secs_f64() * 1000.0))
                .unwrap_or_else(|| PLACEHOLDER.to_string());
            let _ = writeln!(
                out,
                "{:<12} {:>10} {:>10} {:>10} {:>8.1} {:>12} {:<7} {}",
                row.source_id,
                price(row.bid),
                price(row.ask),
                price(row.spread),
                row.age_secs(),
                latency,
                row.status.label(),
                row.error_detail.as_deref().unwrap_or(PLACEHOLDER)
            );
        }

        out
    }

    /// Write the rendered table to `out`, optionally clearing the terminal first
    pub fn write_to<W: io::Write>(&self, out: &mut W, rows: &[QuoteRow], clear: bool) -> io::Result<()> {
        if clear {
            // Clear screen, cursor home
            out.write_all(b"\x1B[2J\x1B[H")?;
        }
        writeln!(out, "{}", self.render(rows))?;
        out.flush()
    }
}

fn price(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.6}", v))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, status: RowStatus) -> QuoteRow {
        let priced = matches!(status, RowStatus::Ok | RowStatus::Stale);
        QuoteRow {
            source_id: id.to_string(),
            bid: priced.then_some(0.9998),
            ask: priced.then_some(1.0002),
            spread: priced.then_some(0.0004),
            age: Duration::from_millis(1500),
            latency: Some(Duration::from_millis(42)),
            status,
            error_detail: (status == RowStatus::Error).then(|| "HTTP 503: unavailable".to_string()),
        }
    }

    #[test]
    fn test_render_formats_values() {
        let board = Board::new(TradingPair::default());
        let table = board.render(&[row("binance", RowStatus::Ok), row("kraken", RowStatus::Error)]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("USDT/USDC"));
        assert!(lines[1].starts_with("Exchange"));

        assert!(lines[2].starts_with("binance"));
        assert!(lines[2].contains("0.999800"));
        assert!(lines[2].contains("1.000200"));
        assert!(lines[2].contains("0.000400"));
        assert!(lines[2].contains("42.0"));
        assert!(lines[2].contains("OK"));

        assert!(lines[3].starts_with("kraken"));
        assert!(lines[3].contains("ERROR"));
        assert!(lines[3].ends_with("HTTP 503: unavailable"));
        assert!(!lines[3].contains("0.999800"));
    }

    #[test]
    fn test_render_placeholders() {
        let board = Board::new(TradingPair::default());
        let mut empty = row("coinbase", RowStatus::Empty);
        empty.latency = None;

        let table = board.render(&[empty]);
        let line = table.lines().nth(2).unwrap();
        let fields: Vec<&str> = line.split_whitespace().collect();

        assert_eq!(fields, vec!["coinbase", "-", "-", "-", "1.5", "-", "EMPTY", "-"]);
    }

    struct ClosedPipe;

    impl io::Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_to() {
        let board = Board::new(TradingPair::default());
        let rows = [row("binance", RowStatus::Ok)];

        let mut plain = Vec::new();
        board.write_to(&mut plain, &rows, false).unwrap();
        let text = String::from_utf8(plain).unwrap();
        assert!(text.starts_with("USDT/USDC"));
        assert!(text.contains("binance"));

        let mut cleared = Vec::new();
        board.write_to(&mut cleared, &rows, true).unwrap();
        assert!(cleared.starts_with(b"\x1B[2J\x1B[H"));
    }

    #[test]
    fn test_write_to_reports_closed_output() {
        let board = Board::new(TradingPair::default());
        let err = board
            .write_to(&mut ClosedPipe, &[row("binance", RowStatus::Ok)], false)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_observe_reports_transitions() {
        let mut board = Board::new(TradingPair::default());
        let start = Instant::now();

        let first = board.observe_at(&[row("a", RowStatus::Ok), row("b", RowStatus::Ok)], start);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|c| c.from.is_none()));

        let unchanged = board.observe_at(&[row("a", RowStatus::Ok), row("b", RowStatus::Ok)], start);
        assert!(unchanged.is_empty());

        let changed = board.observe_at(&[row("a", RowStatus::Ok), row("b", RowStatus::Stale)], start);
        assert_eq!(
            changed,
            vec![StatusChange {
                source_id: "b".into(),
                from: Some(RowStatus::Ok),
                to: RowStatus::Stale,
            }]
        );

        let recovered = board.observe_at(&[row("b", RowStatus::Ok)], start);
        assert_eq!(recovered[0].from, Some(RowStatus::Stale));
        assert_eq!(board.updates(), 4);
    }

    #[test]
    fn test_summary_is_throttled() {
        let mut board = Board::new(TradingPair::default());
        let start = Instant::now();
        let rows = [row("a", RowStatus::Ok)];

        board.observe_at(&rows, start);
        assert_eq!(board.last_summary, Some(start));

        board.observe_at(&rows, start + Duration::from_secs(2));
        assert_eq!(board.last_summary, Some(start));

        let later = start + SUMMARY_INTERVAL;
        board.observe_at(&rows, later);
        assert_eq!(board.last_summary, Some(later));
    }
}
