//! InfluxDB line protocol records, as accepted by QuestDB's ILP listener.

use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};

pub const POOL_TABLE: &str = "pool";
pub const FINANCIAL_TABLE: &str = "financial";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolMetric {
    pub location: String,
    pub balance: f64,
    pub shares: i64,
    /// Defaults to the moment the line is rendered.
    pub timestamp: Option<SystemTime>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialMetric {
    pub location: String,
    pub ethereum_usd: f64,
    pub balance_eth: f64,
    pub balance_usd: f64,
    pub balance_btc: f64,
    pub timestamp: Option<SystemTime>,
}

impl FinancialMetric {
    pub fn priced(location: &str, balance_eth: f64, price_usd: f64, price_btc: f64) -> Self {
        Self {
            location: location.to_string(),
            ethereum_usd: price_usd,
            balance_eth,
            balance_usd: price_usd * balance_eth,
            balance_btc: price_btc * balance_eth,
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    Pool(PoolMetric),
    Financial(FinancialMetric),
}

impl Metric {
    pub fn table(&self) -> &'static str {
        match self {
            Metric::Pool(_) => POOL_TABLE,
            Metric::Financial(_) => FINANCIAL_TABLE,
        }
    }

    pub fn to_line(&self) -> String {
        match self {
            Metric::Pool(m) => m.to_line(self.table()),
            Metric::Financial(m) => m.to_line(self.table()),
        }
    }
}

impl PoolMetric {
    pub fn to_line(&self, table: &str) -> String {
        format!(
            "{},Location={} Balance={},Shares={}i {}\n",
            table,
            escape_tag(&self.location),
            float_no_trail(self.balance),
            self.shares,
            unix_nanos(self.timestamp)
        )
    }
}

impl FinancialMetric {
    pub fn to_line(&self, table: &str) -> String {
        let mut line = format!("{},Location={} ", table, escape_tag(&self.location));
        let fields = [
            ("EthereumUSD", self.ethereum_usd),
            ("BalanceETH", self.balance_eth),
            ("BalanceUSD", self.balance_usd),
            ("BalanceBTC", self.balance_btc),
        ];
        for (i, (name, value)) in fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            let _ = write!(line, "{name}={}", float_no_trail(*value));
        }
        let _ = writeln!(line, " {}", unix_nanos(self.timestamp));
        line
    }
}

/// Accumulates rendered lines into one write.
#[derive(Debug, Default)]
pub struct Payload {
    buf: BytesMut,
    lines: usize,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metric: &Metric) {
        self.buf.put_slice(metric.to_line().as_bytes());
        self.lines += 1;
    }

    pub fn len(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Twelve decimals, trailing zeros (and a bare trailing point) removed.
pub fn float_no_trail(v: f64) -> String {
    let s = format!("{v:.12}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "" | "-" | "-0" => "0".to_string(),
        _ => s.to_string(),
    }
}

fn escape_tag(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn unix_nanos(ts: Option<SystemTime>) -> u128 {
    ts.unwrap_or_else(SystemTime::now)
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}
