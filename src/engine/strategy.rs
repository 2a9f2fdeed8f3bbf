//! Strategy coordinator.
//!
//! Single task that owns every piece of mutable trading state: positions,
//! PnL, the per-symbol volatility EWMAs and mid history, and the embedded
//! ladder manager. Each 10ms tick refreshes depth snapshots concurrently,
//! folds queued fills into positions, re-derives the risk scales, computes
//! the ETF/basket mispricing, and drives the ladders in priority order.
//! Fills arrive over a channel from the gateway reader and are always fully
//! applied before the next tick's risk math runs.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::config;
use crate::engine::ladder::OrderLadderManager;
use crate::engine::quote::{self, QuoteContext};
use crate::engine::risk;
use crate::feeds::snapshots::SnapshotClient;
use crate::gateway::OrderTransport;
use crate::types::{Fill, MarketSnapshot, PnLState, PositionState, Side};

pub const SNAPSHOT_DEPTH: usize = 10;

pub struct Strategy {
    snapshots: SnapshotClient,
    ladders: Arc<OrderLadderManager>,
    positions: HashMap<&'static str, PositionState>,
    pnl: PnLState,
    market: HashMap<&'static str, MarketSnapshot>,
    volatility_bps: HashMap<&'static str, f64>,
    last_mid: HashMap<&'static str, f64>,
    fill_rx: mpsc::UnboundedReceiver<Fill>,
    last_telemetry: Option<Instant>,
    posted_notional: f64,
}

impl Strategy {
    pub fn new(
        transport: Arc<dyn OrderTransport>,
        snapshots: SnapshotClient,
        fill_rx: mpsc::UnboundedReceiver<Fill>,
    ) -> Self {
        let positions = config::ALL_SYMBOLS
            .iter()
            .map(|&symbol| (symbol, PositionState::new(symbol)))
            .collect();
        // Volatility primes at the base spread so the first quotes are not
        // artificially tight before any mid history exists.
        let volatility_bps = config::ALL_SYMBOLS
            .iter()
            .map(|&symbol| (symbol, config::symbol_config(symbol).base_spread_bps))
            .collect();
        Self {
            snapshots,
            ladders: Arc::new(OrderLadderManager::new(transport)),
            positions,
            pnl: PnLState::default(),
            market: HashMap::new(),
            volatility_bps,
            last_mid: HashMap::new(),
            fill_rx,
            last_telemetry: None,
            posted_notional: 0.0,
        }
    }

    /// Run the tick loop until the surrounding task is cancelled.
    pub async fn run(&mut self) {
        eprintln!(
            "[ENGINE] Quoting {:?} at {:.0} Hz | budget {}/s | limits pos={} exp=${:.0}",
            config::ALL_SYMBOLS,
            1.0 / config::LOOP_DELAY_SECONDS,
            config::MAX_ACTIONS_PER_SECOND,
            config::RISK_LIMITS.max_position,
            config::RISK_LIMITS.max_dollar_exposure,
        );
        loop {
            let tick_start = Instant::now();
            self.tick().await;
            self.sleep_remainder(tick_start).await;
        }
    }

    /// Best-effort teardown: pull every resting order.
    pub async fn shutdown(&self) {
        eprintln!("[ENGINE] Shutting down, cancelling all orders");
        self.ladders.cancel_all().await;
    }

    async fn tick(&mut self) {
        self.drain_fills();
        self.refresh_order_books().await;

        let mid_map = self.mid_map();
        if mid_map.is_empty() {
            return;
        }

        risk::update_unrealized_pnl(&mut self.pnl, &self.positions, &mid_map);
        let drawdown_pct = risk::compute_drawdown_pct(&self.pnl);
        let (spread_scale, mut size_scale, throttled) = risk::drawdown_adjustments(drawdown_pct);
        let exposure = risk::compute_dollar_exposure(&self.positions, &mid_map);
        size_scale *= exposure_size_scale(exposure);
        size_scale *= resting_notional_scale(&mid_map);

        if throttled || size_scale == 0.0 {
            self.ladders.cancel_all().await;
            return;
        }

        let synthetic_fair = compute_synthetic_fair(&mid_map);
        let mispricing_bps = compute_mispricing_bps(&mid_map, synthetic_fair);
        self.quote_all(&mid_map, synthetic_fair, spread_scale, size_scale, mispricing_bps)
            .await;
        self.maybe_log_telemetry(mispricing_bps, exposure, drawdown_pct, size_scale);
    }

    /// Fold every fill observed since the previous tick into positions and
    /// realized PnL.
    fn drain_fills(&mut self) {
        while let Ok(fill) = self.fill_rx.try_recv() {
            self.apply_fill(fill);
        }
    }

    /// Position/VWAP folding for one execution.
    ///
    /// The closing portion of a reducing fill realizes PnL against the entry
    /// VWAP. Same-direction fills blend the VWAP size-weighted; a partial
    /// reduction leaves it untouched; crossing through (or landing on) zero
    /// reseeds it at the fill price.
    fn apply_fill(&mut self, fill: Fill) {
        let state = match self.positions.get_mut(fill.symbol) {
            Some(state) => state,
            None => return,
        };
        let signed = match fill.side {
            Side::Bid => fill.size,
            Side::Ask => -fill.size,
        };
        let pre = state.position;

        if pre > 0 && signed < 0 {
            let closing = pre.min(signed.abs()) as f64;
            self.pnl.realized += closing * (fill.price - state.vwap);
        } else if pre < 0 && signed > 0 {
            let closing = pre.abs().min(signed) as f64;
            self.pnl.realized += closing * (state.vwap - fill.price);
        }

        let new_position = pre + signed;

        let extends = pre == 0 || (pre > 0) == (signed > 0);
        if extends {
            let total = pre.abs() + signed.abs();
            if total > 0 {
                state.vwap = (state.vwap * pre.abs() as f64 + fill.price * signed.abs() as f64)
                    / total as f64;
            }
        } else if new_position == 0 {
            state.vwap = fill.price;
        } else if (new_position > 0) == (signed > 0) {
            // Crossed through zero: the residual lot opened at this fill.
            state.vwap = fill.price;
        }

        state.position = new_position;
        eprintln!(
            "[ENGINE] Fill {} {} {} @ {:.2} | pos={} vwap={:.2} realized=${:.0}",
            fill.symbol, fill.side, fill.size, fill.price, new_position, state.vwap, self.pnl.realized,
        );
    }

    /// Fetch a depth snapshot for every symbol concurrently; a failed fetch
    /// leaves the previous snapshot in place and skips the symbol's
    /// volatility update for this tick.
    async fn refresh_order_books(&mut self) {
        let fetches = config::ALL_SYMBOLS
            .iter()
            .map(|&symbol| self.snapshots.fetch(symbol, SNAPSHOT_DEPTH));
        let results = join_all(fetches).await;
        for (&symbol, result) in config::ALL_SYMBOLS.iter().zip(results) {
            match result {
                Ok(snapshot) => {
                    let mid = snapshot.book.mid();
                    self.market.insert(symbol, snapshot);
                    self.update_volatility(symbol, mid);
                }
                Err(e) => {
                    eprintln!("[MD] Snapshot {} failed: {}", symbol, e);
                }
            }
        }
    }

    fn mid_map(&self) -> HashMap<&'static str, f64> {
        self.market
            .iter()
            .filter_map(|(&symbol, snapshot)| snapshot.book.mid().map(|mid| (symbol, mid)))
            .collect()
    }

    /// EWMA of absolute tick-to-tick mid moves, in bps.
    fn update_volatility(&mut self, symbol: &'static str, mid: Option<f64>) {
        let mid = match mid {
            Some(m) if m > 0.0 => m,
            _ => return,
        };
        let previous = self.last_mid.insert(symbol, mid);
        let previous = match previous {
            Some(p) if p > 0.0 => p,
            _ => {
                let primed = self
                    .volatility_bps
                    .get(symbol)
                    .copied()
                    .unwrap_or(config::VOL_FLOOR_BPS)
                    .max(config::VOL_FLOOR_BPS);
                self.volatility_bps.insert(symbol, primed);
                return;
            }
        };
        let move_bps = (mid - previous).abs() / previous * 10_000.0;
        let alpha = config::VOL_SMOOTHING_ALPHA;
        let prior = self.volatility_bps.get(symbol).copied().unwrap_or(move_bps);
        self.volatility_bps
            .insert(symbol, (1.0 - alpha) * prior + alpha * move_bps);
    }

    /// Build and sync ladders for every quotable symbol, highest priority
    /// first. The ETF anchors on the synthetic fair; constituents anchor on
    /// their own mid.
    async fn quote_all(
        &mut self,
        mid_map: &HashMap<&'static str, f64>,
        synthetic_fair: Option<f64>,
        spread_scale: f64,
        size_scale: f64,
        mispricing_bps: f64,
    ) {
        let mut symbols = config::ALL_SYMBOLS.to_vec();
        symbols.sort_by(|&a, &b| {
            let pa = self.symbol_priority(a, mispricing_bps);
            let pb = self.symbol_priority(b, mispricing_bps);
            pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut jobs = Vec::with_capacity(symbols.len());
        let mut posted = 0.0;
        for symbol in symbols {
            let snapshot = match self.market.get(symbol) {
                Some(s) => s,
                None => continue,
            };
            let fair_value = if symbol == config::ETF_SYMBOL {
                synthetic_fair
            } else {
                mid_map.get(symbol).copied()
            };
            let fair_value = match fair_value {
                Some(f) => f,
                None => continue,
            };

            let position = self.positions.get(symbol).map_or(0, |p| p.position);
            let inventory_skew =
                quote::compute_inventory_skew(position, config::RISK_LIMITS.max_position);
            let (bid_size_scale, ask_size_scale) = side_size_scales(symbol, mispricing_bps);
            let ctx = QuoteContext {
                fair_value,
                volatility_bps: self
                    .volatility_bps
                    .get(symbol)
                    .copied()
                    .unwrap_or(config::VOL_FLOOR_BPS)
                    .max(1.0),
                inventory_skew_bps: inventory_skew,
                spread_scale: spread_scale * spread_scale_adjust(symbol, mispricing_bps),
                size_scale,
                bid_size_scale,
                ask_size_scale,
            };
            let (bids, asks) = quote::build_ladders(snapshot, &ctx, &config::symbol_config(symbol));
            posted += quote::estimate_notional(&bids) + quote::estimate_notional(&asks);
            jobs.push((symbol, bids, asks));
        }
        self.posted_notional = posted;

        let ladders = &self.ladders;
        join_all(jobs.iter().map(|job| ladders.sync_symbol(job.0, &job.1, &job.2))).await;
    }

    /// Symbols with the largest weighted mispricing or the heaviest inventory
    /// are synced first; the ETF gets a flat bonus as the primary instrument.
    fn symbol_priority(&self, symbol: &'static str, mispricing_bps: f64) -> f64 {
        let mut mispricing_component = mispricing_bps.abs();
        if symbol != config::ETF_SYMBOL {
            mispricing_component *= config::synthetic_weight(symbol);
        }
        let inventory_ratio = self.positions.get(symbol).map_or(0.0, |p| {
            p.position.abs() as f64 / config::RISK_LIMITS.max_position.max(1) as f64
        });
        let mut priority = mispricing_component + inventory_ratio * config::INVENTORY_PRIORITY_WEIGHT;
        if symbol == config::ETF_SYMBOL {
            priority += 10.0;
        }
        priority
    }

    fn maybe_log_telemetry(
        &mut self,
        mispricing_bps: f64,
        exposure: f64,
        drawdown_pct: f64,
        size_scale: f64,
    ) {
        let now = Instant::now();
        if let Some(last) = self.last_telemetry {
            if now.duration_since(last).as_secs_f64() < config::TELEMETRY_INTERVAL_SECONDS {
                return;
            }
        }
        self.last_telemetry = Some(now);
        eprintln!(
            "[ENGINE] mispricing={:.1}bps exposure=${:.0} drawdown={:.2}% size_scale={:.2} posted=${:.0} realized=${:.0} unrealized=${:.0}",
            mispricing_bps,
            exposure,
            drawdown_pct * 100.0,
            size_scale,
            self.posted_notional,
            self.pnl.realized,
            self.pnl.unrealized,
        );
    }

    async fn sleep_remainder(&self, tick_start: Instant) {
        let elapsed = tick_start.elapsed().as_secs_f64();
        let delay = config::LOOP_DELAY_SECONDS - elapsed;
        if delay > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }
    }
}

// ─── Pure per-tick derivations ───

/// Weighted sum of constituent mids. Weights of missing constituents are
/// dropped without renormalizing; the mispricing formula divides the level
/// out. With no constituents at all, the ETF's own mid is the fair.
pub fn compute_synthetic_fair(mid_map: &HashMap<&'static str, f64>) -> Option<f64> {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for &(symbol, weight) in &config::SYNTHETIC_WEIGHTS {
        if let Some(mid) = mid_map.get(symbol) {
            total += weight * mid;
            weight_sum += weight;
        }
    }
    if weight_sum == 0.0 {
        return mid_map.get(config::ETF_SYMBOL).copied();
    }
    Some(total)
}

/// Relative deviation of the ETF mid from the synthetic fair, in bps.
pub fn compute_mispricing_bps(
    mid_map: &HashMap<&'static str, f64>,
    synthetic_fair: Option<f64>,
) -> f64 {
    let fair = match synthetic_fair {
        Some(f) if f > 0.0 => f,
        _ => return 0.0,
    };
    match mid_map.get(config::ETF_SYMBOL) {
        Some(&etf_mid) if etf_mid > 0.0 => (etf_mid - fair) / fair * 10_000.0,
        _ => 0.0,
    }
}

/// How strongly to lean into a mispricing, in [0, 1]. Constituents respond in
/// proportion to their basket weight.
pub fn mispricing_intensity(mispricing_bps: f64, weight: f64) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let base = (mispricing_bps.abs() / config::MISPRICING_INTENSITY_BPS.max(1.0)).min(1.0);
    (base * weight).clamp(0.0, 1.0)
}

/// Widen quotes when mispricing is large to cut adverse selection.
pub fn spread_scale_adjust(symbol: &str, mispricing_bps: f64) -> f64 {
    let weight = if symbol == config::ETF_SYMBOL {
        1.0
    } else {
        config::synthetic_weight(symbol)
    };
    1.0 + mispricing_intensity(mispricing_bps, weight) * config::MISPRICING_SPREAD_WIDEN
}

/// Per-side size lean for a mispricing: rich ETF → sell ETF, buy basket; the
/// pattern mirrors when the ETF is cheap. Returns (bid_scale, ask_scale).
pub fn side_size_scales(symbol: &str, mispricing_bps: f64) -> (f64, f64) {
    let weight = if symbol == config::ETF_SYMBOL {
        1.0
    } else {
        config::synthetic_weight(symbol)
    };
    if mispricing_bps == 0.0 || weight <= 0.0 {
        return (1.0, 1.0);
    }
    let intensity = mispricing_intensity(mispricing_bps, weight);
    let bonus = 1.0 + intensity * config::MISPRICING_SIZE_BONUS;
    let penalty = (1.0 - intensity * config::MISPRICING_SIZE_PENALTY).max(0.5);
    if symbol == config::ETF_SYMBOL {
        if mispricing_bps > 0.0 {
            (penalty, bonus)
        } else {
            (bonus, penalty)
        }
    } else if mispricing_bps > 0.0 {
        (bonus, penalty)
    } else {
        (penalty, bonus)
    }
}

/// Shrink quoting when dollar exposure breaches its cap, floored at 25%.
pub fn exposure_size_scale(exposure: f64) -> f64 {
    let limit = config::RISK_LIMITS.max_dollar_exposure;
    if exposure <= 0.0 || exposure <= limit {
        return 1.0;
    }
    (limit / exposure).clamp(0.25, 1.0)
}

/// Ratio of the target resting notional to what the configured ladders would
/// post at current mids, clamped to [0.5, 3.0].
pub fn resting_notional_scale(mid_map: &HashMap<&'static str, f64>) -> f64 {
    let mut base = 0.0;
    for &symbol in &config::ALL_SYMBOLS {
        let cfg = config::symbol_config(symbol);
        let mid = match mid_map.get(symbol) {
            Some(&m) => m,
            None => continue,
        };
        let mut size_sum = 0.0;
        let mut size = cfg.base_size;
        for _ in 0..cfg.max_levels {
            size_sum += size as f64;
            size = ((size as f64 * cfg.size_multiplier) as i64).max(1);
        }
        base += 2.0 * mid * size_sum;
    }
    if base <= 0.0 {
        return 1.0;
    }
    (config::TARGET_RESTING_NOTIONAL / base).clamp(0.5, 3.0)
}
