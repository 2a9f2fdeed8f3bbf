//! Depth snapshot feed over the scorekeeper HTTP endpoint.
//!
//! One GET per symbol per tick, fanned out by the coordinator. The request
//! timeout is tight (200ms): a snapshot that misses its tick is worthless,
//! the next tick fetches a fresh one.

use std::time::Duration;

use serde_json::Value;

use crate::config;
use crate::types::{MarketLevel, MarketSnapshot, OrderBook};

pub struct SnapshotClient {
    http: reqwest::Client,
    base_url: String,
}

impl SnapshotClient {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config::HTTP_TIMEOUT_MS))
            .build()
            .expect("reqwest client");
        Self { http, base_url }
    }

    /// Fetch one depth snapshot. Timeouts, HTTP errors and bad JSON come back
    /// as Err; the caller drops the symbol for the tick.
    pub async fn fetch(
        &self,
        symbol: &'static str,
        depth: usize,
    ) -> Result<MarketSnapshot, String> {
        let url = format!("{}/orderbook/{}?depth={}", self.base_url, symbol, depth);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("orderbook {}: {}", symbol, e))?;
        if !resp.status().is_success() {
            return Err(format!("orderbook {}: HTTP {}", symbol, resp.status()));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| format!("orderbook {} body: {}", symbol, e))?;
        Ok(parse_snapshot(
            symbol,
            &body,
            depth,
            chrono::Utc::now().timestamp_millis(),
        ))
    }
}

/// Build a snapshot from the endpoint's JSON. Level entries accept `price`/`p`
/// and `quantity`/`qty`/`size`; entries without a readable price are skipped,
/// a missing size reads as zero.
pub fn parse_snapshot(
    symbol: &'static str,
    body: &Value,
    depth: usize,
    ts_ms: i64,
) -> MarketSnapshot {
    MarketSnapshot {
        symbol,
        book: OrderBook {
            bids: parse_levels(body.get("bids"), depth),
            asks: parse_levels(body.get("asks"), depth),
        },
        ts_ms,
    }
}

fn parse_levels(side: Option<&Value>, depth: usize) -> Vec<MarketLevel> {
    side.and_then(Value::as_array)
        .map(|entries| entries.iter().take(depth).filter_map(parse_level).collect())
        .unwrap_or_default()
}

fn parse_level(entry: &Value) -> Option<MarketLevel> {
    let price = number(entry.get("price").or_else(|| entry.get("p"))?)?;
    let size = entry
        .get("quantity")
        .or_else(|| entry.get("qty"))
        .or_else(|| entry.get("size"))
        .and_then(number)
        .unwrap_or(0.0);
    Some(MarketLevel {
        price,
        size: size as i64,
    })
}

fn number(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}
