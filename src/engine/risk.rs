//! Inventory and drawdown risk engine.
//!
//! All functions here are pure: the coordinator owns the state and calls in
//! once per tick with the current mid map.

use std::collections::HashMap;

use crate::config;
use crate::types::{PnLState, PositionState};

/// Sum of absolute dollar exposure across symbols with a known mid.
pub fn compute_dollar_exposure(
    positions: &HashMap<&'static str, PositionState>,
    mid_map: &HashMap<&'static str, f64>,
) -> f64 {
    positions
        .iter()
        .filter_map(|(symbol, state)| {
            mid_map
                .get(symbol)
                .map(|mid| (state.position as f64 * mid).abs())
        })
        .sum()
}

/// Mark open positions to the current mids and advance the high watermark.
pub fn update_unrealized_pnl(
    pnl: &mut PnLState,
    positions: &HashMap<&'static str, PositionState>,
    mid_map: &HashMap<&'static str, f64>,
) {
    let mut unrealized = 0.0;
    for (symbol, state) in positions {
        if let Some(mid) = mid_map.get(symbol) {
            unrealized += state.position as f64 * (mid - state.vwap);
        }
    }
    pnl.unrealized = unrealized;
    pnl.update_high_watermark();
}

/// Fractional equity drop from the high watermark; 0 until the watermark is
/// positive.
pub fn compute_drawdown_pct(pnl: &PnLState) -> f64 {
    if pnl.equity_high_watermark <= 0.0 {
        return 0.0;
    }
    let drop = pnl.equity_high_watermark - pnl.equity();
    if drop <= 0.0 {
        return 0.0;
    }
    drop / pnl.equity_high_watermark
}

/// Map drawdown to `(spread_scale, size_scale, throttled)`.
///
/// Below the soft stop quoting is unrestricted. At or above the hard stop the
/// agent stops quoting entirely. In between, a squared severity curve keeps
/// the response gentle near the soft threshold and aggressive near the hard
/// one.
pub fn drawdown_adjustments(drawdown_pct: f64) -> (f64, f64, bool) {
    let limits = config::RISK_LIMITS;
    if drawdown_pct >= limits.hard_stop_pct {
        return (2.0, 0.0, true);
    }
    if drawdown_pct <= limits.drawdown_stop_pct {
        return (1.0, 1.0, false);
    }
    let severity = ((drawdown_pct - limits.drawdown_stop_pct)
        / (limits.hard_stop_pct - limits.drawdown_stop_pct))
        .clamp(0.0, 1.0);
    let curved = severity * severity;
    let spread_scale = 1.0 + curved * config::DRAWDOWN_SPREAD_MULT;
    let size_scale = (1.0 - curved * config::DRAWDOWN_SIZE_REDUCTION).max(0.2);
    (spread_scale, size_scale, false)
}
