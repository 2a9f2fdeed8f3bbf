//! Layered passive quote generation.
//!
//! `build_ladders` is a pure function of one snapshot plus the scaling inputs
//! the coordinator derives each tick. Degenerate inputs never error; they
//! produce empty ladders and the symbol simply goes unquoted for the tick.

use crate::config::{self, SymbolConfig};
use crate::types::{MarketSnapshot, OrderLevel, Side};

/// Per-tick pricing inputs for one symbol.
#[derive(Clone, Copy, Debug)]
pub struct QuoteContext {
    pub fair_value: f64,
    pub volatility_bps: f64,
    pub inventory_skew_bps: f64,
    pub spread_scale: f64,
    pub size_scale: f64,
    pub bid_size_scale: f64,
    pub ask_size_scale: f64,
}

impl Default for QuoteContext {
    fn default() -> Self {
        Self {
            fair_value: 0.0,
            volatility_bps: 0.0,
            inventory_skew_bps: 0.0,
            spread_scale: 1.0,
            size_scale: 1.0,
            bid_size_scale: 1.0,
            ask_size_scale: 1.0,
        }
    }
}

/// Whole-bps skew proportional to inventory usage, truncated toward zero.
/// Positive when long (bids pull back), negative when short.
pub fn compute_inventory_skew(position: i64, limit: i64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    let ratio = (position as f64 / limit as f64).clamp(-1.0, 1.0);
    (config::INVENTORY_SKEW_BPS * ratio).trunc()
}

/// Build the bid and ask ladders for one symbol.
///
/// The anchor is the supplied fair value when positive, otherwise the snapshot
/// mid. Level offsets grow linearly; level sizes grow geometrically. The maker
/// edge tightens both sides symmetrically, floored at 1 bps from the anchor.
pub fn build_ladders(
    snapshot: &MarketSnapshot,
    ctx: &QuoteContext,
    cfg: &SymbolConfig,
) -> (Vec<OrderLevel>, Vec<OrderLevel>) {
    let mid = if ctx.fair_value > 0.0 {
        ctx.fair_value
    } else {
        snapshot.book.mid().unwrap_or(0.0)
    };
    if mid <= 0.0 {
        return (Vec::new(), Vec::new());
    }

    let base_spread = cfg.base_spread_bps * ctx.spread_scale + ctx.volatility_bps;
    let level_step = cfg.level_spread_step_bps * ctx.spread_scale;
    let maker_edge = config::EFFECTIVE_MAKER_EDGE_BPS / 2.0;

    let mut bids = Vec::with_capacity(cfg.max_levels);
    let mut asks = Vec::with_capacity(cfg.max_levels);

    let mut current_size = cfg.base_size.max(1);
    for level_index in 0..cfg.max_levels {
        let offset_bps = base_spread + level_index as f64 * level_step;
        let base_size = ((current_size as f64 * ctx.size_scale) as i64).max(1);
        let bid_size = ((base_size as f64 * ctx.bid_size_scale) as i64).max(1);
        let ask_size = ((base_size as f64 * ctx.ask_size_scale) as i64).max(1);

        let bid_bps = offset_bps + ctx.inventory_skew_bps.max(0.0);
        let ask_bps = offset_bps + (-ctx.inventory_skew_bps).max(0.0);

        bids.push(OrderLevel {
            symbol: snapshot.symbol,
            side: Side::Bid,
            level_index,
            price: price_from_bps(mid, bid_bps - maker_edge, Side::Bid),
            size: bid_size,
        });
        asks.push(OrderLevel {
            symbol: snapshot.symbol,
            side: Side::Ask,
            level_index,
            price: price_from_bps(mid, ask_bps - maker_edge, Side::Ask),
            size: ask_size,
        });

        current_size = ((current_size as f64 * cfg.size_multiplier) as i64).max(1);
    }

    (bids, asks)
}

/// Dollar notional a set of levels would rest on the book.
pub fn estimate_notional(levels: &[OrderLevel]) -> f64 {
    levels.iter().map(|l| l.price * l.size as f64).sum()
}

fn price_from_bps(mid: f64, bps: f64, side: Side) -> f64 {
    let effective_bps = bps.max(1.0);
    let delta = mid * (effective_bps / 10_000.0);
    match side {
        Side::Bid => (mid - delta).max(0.01),
        Side::Ask => mid + delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketLevel, OrderBook};

    fn snapshot(symbol: &'static str, bid: f64, ask: f64) -> MarketSnapshot {
        MarketSnapshot {
            symbol,
            book: OrderBook {
                bids: vec![MarketLevel { price: bid, size: 100 }],
                asks: vec![MarketLevel { price: ask, size: 100 }],
            },
            ts_ms: 0,
        }
    }

    fn ctx(fair: f64, vol: f64) -> QuoteContext {
        QuoteContext {
            fair_value: fair,
            volatility_bps: vol,
            ..QuoteContext::default()
        }
    }

    /// Scenario: default config, fair 100, primed volatility 15 bps, no skew.
    /// Expected: 6 levels per side, all prices positive, all sizes >= 1, and the
    /// innermost bid sits at 100 * (1 - (15 + 15 - 3.5)/10000) = 99.735.
    #[test]
    fn test_cold_start_ladder_shape() {
        let snap = snapshot("ETF", 99.99, 100.01);
        let (bids, asks) = build_ladders(&snap, &ctx(100.0, 15.0), &config::DEFAULT_SYMBOL_CONFIG);
        assert_eq!(bids.len(), 6);
        assert_eq!(asks.len(), 6);
        for l in bids.iter().chain(asks.iter()) {
            assert!(l.price > 0.0);
            assert!(l.size >= 1);
        }
        assert!((bids[0].price - 99.735).abs() < 1e-9, "inner bid = {}", bids[0].price);
        assert!((asks[0].price - 100.265).abs() < 1e-9, "inner ask = {}", asks[0].price);
    }

    /// Scenario: ladder sizes with base 400 and multiplier 1.5.
    /// Expected: geometric growth 400, 600, 900, 1350, 2025, 3037 (truncated).
    #[test]
    fn test_geometric_size_growth() {
        let snap = snapshot("XYZ", 99.0, 101.0);
        let (bids, _) = build_ladders(&snap, &ctx(100.0, 5.0), &config::DEFAULT_SYMBOL_CONFIG);
        let sizes: Vec<i64> = bids.iter().map(|l| l.size).collect();
        assert_eq!(sizes, vec![400, 600, 900, 1350, 2025, 3037]);
    }

    /// Scenario: long inventory produces a positive skew of 8 bps.
    /// Expected: every bid is lower than the unskewed baseline, asks are unchanged.
    #[test]
    fn test_positive_skew_pulls_bids_back() {
        let snap = snapshot("ETF", 99.0, 101.0);
        let base = ctx(100.0, 10.0);
        let skewed = QuoteContext {
            inventory_skew_bps: 8.0,
            ..base
        };
        let (bids_base, asks_base) = build_ladders(&snap, &base, &config::DEFAULT_SYMBOL_CONFIG);
        let (bids_skew, asks_skew) = build_ladders(&snap, &skewed, &config::DEFAULT_SYMBOL_CONFIG);
        for (b, s) in bids_base.iter().zip(bids_skew.iter()) {
            assert!(s.price < b.price, "skewed bid should be lower: {} vs {}", s.price, b.price);
        }
        for (a, s) in asks_base.iter().zip(asks_skew.iter()) {
            assert_eq!(a.price, s.price);
        }
    }

    /// Scenario: short inventory produces a negative skew of -8 bps.
    /// Expected: every ask is higher than the unskewed baseline, bids are unchanged.
    #[test]
    fn test_negative_skew_pulls_asks_back() {
        let snap = snapshot("ETF", 99.0, 101.0);
        let base = ctx(100.0, 10.0);
        let skewed = QuoteContext {
            inventory_skew_bps: -8.0,
            ..base
        };
        let (bids_base, asks_base) = build_ladders(&snap, &base, &config::DEFAULT_SYMBOL_CONFIG);
        let (bids_skew, asks_skew) = build_ladders(&snap, &skewed, &config::DEFAULT_SYMBOL_CONFIG);
        for (a, s) in asks_base.iter().zip(asks_skew.iter()) {
            assert!(s.price > a.price);
        }
        for (b, s) in bids_base.iter().zip(bids_skew.iter()) {
            assert_eq!(b.price, s.price);
        }
    }

    /// Scenario: zero fair value and an empty book.
    /// Expected: no levels on either side.
    #[test]
    fn test_degenerate_inputs_yield_empty_ladders() {
        let snap = MarketSnapshot {
            symbol: "DEF",
            book: OrderBook::default(),
            ts_ms: 0,
        };
        let (bids, asks) = build_ladders(&snap, &ctx(0.0, 5.0), &config::DEFAULT_SYMBOL_CONFIG);
        assert!(bids.is_empty());
        assert!(asks.is_empty());
    }

    /// Scenario: fair value absent but the snapshot has a valid mid.
    /// Expected: the ladder anchors on the snapshot mid (100.0).
    #[test]
    fn test_snapshot_mid_fallback() {
        let snap = snapshot("ABC", 99.0, 101.0);
        let (bids, asks) = build_ladders(&snap, &ctx(0.0, 5.0), &config::DEFAULT_SYMBOL_CONFIG);
        assert!(!bids.is_empty());
        assert!(bids[0].price < 100.0);
        assert!(asks[0].price > 100.0);
    }

    /// Scenario: spread so tight that offset minus maker edge goes below 1 bps.
    /// Expected: the 1 bps floor keeps the quote away from the anchor on both sides.
    #[test]
    fn test_maker_edge_floor() {
        let tight = SymbolConfig {
            base_size: 10,
            size_multiplier: 1.0,
            base_spread_bps: 2.0,
            level_spread_step_bps: 0.0,
            max_levels: 1,
        };
        let snap = snapshot("ETF", 99.99, 100.01);
        // offset 2 bps, edge 3.5 bps → floored to 1 bps from the anchor
        let (bids, asks) = build_ladders(&snap, &ctx(100.0, 0.0), &tight);
        assert!((bids[0].price - 99.99).abs() < 1e-9);
        assert!((asks[0].price - 100.01).abs() < 1e-9);
    }

    /// Scenario: bid size scale 1.8 and ask size scale 0.5 at base size 400.
    /// Expected: innermost bid size 720, innermost ask size 200.
    #[test]
    fn test_side_size_scales_applied() {
        let snap = snapshot("ETF", 99.0, 101.0);
        let c = QuoteContext {
            fair_value: 100.0,
            volatility_bps: 5.0,
            bid_size_scale: 1.8,
            ask_size_scale: 0.5,
            ..QuoteContext::default()
        };
        let (bids, asks) = build_ladders(&snap, &c, &config::DEFAULT_SYMBOL_CONFIG);
        assert_eq!(bids[0].size, 720);
        assert_eq!(asks[0].size, 200);
    }

    /// Scenario: size scale small enough to push computed sizes below one unit.
    /// Expected: all sizes clamp to the 1-lot minimum.
    #[test]
    fn test_size_floor() {
        let snap = snapshot("ETF", 99.0, 101.0);
        let c = QuoteContext {
            fair_value: 100.0,
            volatility_bps: 5.0,
            size_scale: 0.0001,
            ..QuoteContext::default()
        };
        let (bids, asks) = build_ladders(&snap, &c, &config::DEFAULT_SYMBOL_CONFIG);
        assert!(bids.iter().all(|l| l.size == 1));
        assert!(asks.iter().all(|l| l.size == 1));
    }

    /// Scenario: inventory skew from positions at 0%, 50%, 100% and 150% of limit.
    /// Expected: 0, 4, 8 and 8 bps (clamped), with sign following the position.
    #[test]
    fn test_inventory_skew_scaling() {
        assert_eq!(compute_inventory_skew(0, 25_000), 0.0);
        assert_eq!(compute_inventory_skew(12_500, 25_000), 4.0);
        assert_eq!(compute_inventory_skew(25_000, 25_000), 8.0);
        assert_eq!(compute_inventory_skew(37_500, 25_000), 8.0);
        assert_eq!(compute_inventory_skew(-12_500, 25_000), -4.0);
        assert_eq!(compute_inventory_skew(10, 0), 0.0);
    }

    /// Scenario: notional of two levels, 100 lots at $10 and 50 lots at $20.
    /// Expected: 1000 + 1000 = 2000 dollars.
    #[test]
    fn test_estimate_notional() {
        let levels = vec![
            OrderLevel { symbol: "ETF", side: Side::Bid, level_index: 0, price: 10.0, size: 100 },
            OrderLevel { symbol: "ETF", side: Side::Bid, level_index: 1, price: 20.0, size: 50 },
        ];
        assert!((estimate_notional(&levels) - 2000.0).abs() < 1e-9);
    }
}
