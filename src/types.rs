// ─── Market Data ───

/// One price level of an order book side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarketLevel {
    pub price: f64,
    pub size: i64,
}

/// Depth snapshot: bids descending, asks ascending.
#[derive(Clone, Debug, Default)]
pub struct OrderBook {
    pub bids: Vec<MarketLevel>,
    pub asks: Vec<MarketLevel>,
}

impl OrderBook {
    /// Mid price, defined only when both sides are non-empty.
    #[inline]
    pub fn mid(&self) -> Option<f64> {
        match (self.bids.first(), self.asks.first()) {
            (Some(b), Some(a)) => Some((b.price + a.price) / 2.0),
            _ => None,
        }
    }
}

/// Immutable depth snapshot for one symbol.
#[derive(Clone, Debug)]
pub struct MarketSnapshot {
    pub symbol: &'static str,
    pub book: OrderBook,
    pub ts_ms: i64,
}

// ─── Orders ───

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Bid => write!(f, "BID"),
            Side::Ask => write!(f, "ASK"),
        }
    }
}

/// A desired resting quote at one ladder level.
#[derive(Clone, Copy, Debug)]
pub struct OrderLevel {
    pub symbol: &'static str,
    pub side: Side,
    pub level_index: usize,
    pub price: f64,
    pub size: i64,
}

/// A live order we placed, mirrored locally.
#[derive(Clone, Debug)]
pub struct OrderInfo {
    pub symbol: &'static str,
    pub side: Side,
    pub level_index: usize,
    pub price: f64,
    pub size: i64,
    pub order_id: u64,
    pub placed_ms: i64,
}

// ─── Positions & PnL ───

/// Signed inventory with entry VWAP. VWAP is 0 only while flat before the
/// first fill; after crossing through zero it reseeds to the last fill price.
#[derive(Clone, Copy, Debug)]
pub struct PositionState {
    pub symbol: &'static str,
    pub position: i64,
    pub vwap: f64,
}

impl PositionState {
    pub fn new(symbol: &'static str) -> Self {
        Self {
            symbol,
            position: 0,
            vwap: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PnLState {
    pub realized: f64,
    pub unrealized: f64,
    pub equity_high_watermark: f64,
}

impl PnLState {
    #[inline]
    pub fn equity(&self) -> f64 {
        self.realized + self.unrealized
    }

    #[inline]
    pub fn update_high_watermark(&mut self) {
        self.equity_high_watermark = self.equity_high_watermark.max(self.equity());
    }
}

// ─── Fills ───

/// Execution report delivered by the gateway. Quantity is always positive;
/// the side tells which way our resting order traded.
#[derive(Clone, Copy, Debug)]
pub struct Fill {
    pub symbol: &'static str,
    pub side: Side,
    pub size: i64,
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario: flip each side with `opposite()`.
    /// Expected: Bid↔Ask round-trips back to itself.
    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
        assert_eq!(Side::Bid.opposite().opposite(), Side::Bid);
    }

    /// Scenario: book with best bid 99 and best ask 101.
    /// Expected: mid = 100.
    #[test]
    fn test_mid_both_sides() {
        let book = OrderBook {
            bids: vec![MarketLevel { price: 99.0, size: 10 }],
            asks: vec![MarketLevel { price: 101.0, size: 5 }],
        };
        assert_eq!(book.mid(), Some(100.0));
    }

    /// Scenario: book with only bids, then an entirely empty book.
    /// Expected: mid is undefined (None) in both cases.
    #[test]
    fn test_mid_one_sided() {
        let book = OrderBook {
            bids: vec![MarketLevel { price: 99.0, size: 10 }],
            asks: vec![],
        };
        assert_eq!(book.mid(), None);
        assert_eq!(OrderBook::default().mid(), None);
    }

    /// Scenario: realized 10, unrealized -4, watermark updated twice with a dip in between.
    /// Expected: high watermark holds the peak equity (10) after equity falls to 6.
    #[test]
    fn test_high_watermark_holds_peak() {
        let mut pnl = PnLState {
            realized: 10.0,
            unrealized: 0.0,
            equity_high_watermark: 0.0,
        };
        pnl.update_high_watermark();
        assert_eq!(pnl.equity_high_watermark, 10.0);
        pnl.unrealized = -4.0;
        pnl.update_high_watermark();
        assert_eq!(pnl.equity_high_watermark, 10.0);
    }
}
