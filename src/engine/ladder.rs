//! Quote ladder actuator.
//!
//! Reconciles desired ladders against the live-order mirror while spending a
//! rolling one-second action budget shared by every place, replace and cancel.
//! One lock covers an entire `sync_symbol` or `cancel_all`, so the mirror and
//! the budget counters are never observed mid-reconcile.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::config;
use crate::gateway::OrderTransport;
use crate::types::{OrderInfo, OrderLevel, Side};

type LevelKey = (&'static str, Side, usize);

struct LadderState {
    /// Flat mirror of every live order keyed by (symbol, side, level).
    active: HashMap<LevelKey, OrderInfo>,
    window_start: Instant,
    actions_this_window: u32,
}

pub struct OrderLadderManager {
    transport: Arc<dyn OrderTransport>,
    state: Mutex<LadderState>,
}

/// Relative distance between two prices in bps; infinite if either side is
/// non-positive so degenerate quotes always refresh.
pub fn bps_distance(a: f64, b: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        return f64::INFINITY;
    }
    let mid = (a + b) / 2.0;
    (a - b).abs() / mid * 10_000.0
}

impl OrderLadderManager {
    pub fn new(transport: Arc<dyn OrderTransport>) -> Self {
        Self {
            transport,
            state: Mutex::new(LadderState {
                active: HashMap::new(),
                window_start: Instant::now(),
                actions_this_window: 0,
            }),
        }
    }

    /// Reconcile one symbol: place missing levels, refresh moved ones, cancel
    /// levels no longer desired. Individual transport failures drop the mirror
    /// entry and are retried by the next sync; they never abort the batch.
    pub async fn sync_symbol(
        &self,
        symbol: &'static str,
        bids: &[OrderLevel],
        asks: &[OrderLevel],
    ) {
        let mut state = self.state.lock().await;
        self.sync_side(&mut state, symbol, Side::Bid, bids).await;
        self.sync_side(&mut state, symbol, Side::Ask, asks).await;
        let bid_indexes: HashSet<usize> = bids.iter().map(|l| l.level_index).collect();
        let ask_indexes: HashSet<usize> = asks.iter().map(|l| l.level_index).collect();
        self.prune_levels(&mut state, symbol, Side::Bid, &bid_indexes).await;
        self.prune_levels(&mut state, symbol, Side::Ask, &ask_indexes).await;
    }

    /// Cancel every live order and clear the mirror.
    pub async fn cancel_all(&self) {
        let mut state = self.state.lock().await;
        let orders: Vec<OrderInfo> = state.active.values().cloned().collect();
        state.active.clear();
        for info in orders {
            Self::reserve_action_slot(&mut state).await;
            if let Err(e) = self.transport.cancel_order(&info).await {
                eprintln!("[LADDER] cancel_all {} #{} failed: {}", info.symbol, info.order_id, e);
            }
        }
    }

    /// Snapshot of the live mirror, for telemetry and teardown checks.
    pub async fn open_orders(&self) -> Vec<OrderInfo> {
        self.state.lock().await.active.values().cloned().collect()
    }

    async fn sync_side(
        &self,
        state: &mut LadderState,
        symbol: &'static str,
        side: Side,
        desired: &[OrderLevel],
    ) {
        for level in desired {
            let key: LevelKey = (symbol, side, level.level_index);
            match state.active.get(&key).cloned() {
                None => {
                    Self::reserve_action_slot(state).await;
                    match self.transport.place_order(level).await {
                        Ok(info) => {
                            state.active.insert(key, info);
                        }
                        Err(e) => {
                            eprintln!(
                                "[LADDER] place {} {} L{} failed: {}",
                                symbol, side, level.level_index, e
                            );
                        }
                    }
                }
                Some(existing) if needs_refresh(&existing, level) => {
                    Self::reserve_action_slot(state).await;
                    match self.transport.replace_order(&existing, level).await {
                        Ok(info) => {
                            state.active.insert(key, info);
                        }
                        Err(e) => {
                            state.active.remove(&key);
                            eprintln!(
                                "[LADDER] replace {} {} L{} failed: {}",
                                symbol, side, level.level_index, e
                            );
                        }
                    }
                }
                Some(_) => {}
            }
        }
    }

    async fn prune_levels(
        &self,
        state: &mut LadderState,
        symbol: &'static str,
        side: Side,
        desired_indexes: &HashSet<usize>,
    ) {
        let stale: Vec<LevelKey> = state
            .active
            .keys()
            .filter(|(s, sd, idx)| *s == symbol && *sd == side && !desired_indexes.contains(idx))
            .cloned()
            .collect();
        for key in stale {
            if let Some(info) = state.active.remove(&key) {
                Self::reserve_action_slot(state).await;
                if let Err(e) = self.transport.cancel_order(&info).await {
                    eprintln!(
                        "[LADDER] cancel {} {} L{} failed: {}",
                        symbol, side, key.2, e
                    );
                }
            }
        }
    }

    /// Take one token from the rolling one-second window, waiting out the
    /// remainder of the window when the budget is spent.
    async fn reserve_action_slot(state: &mut LadderState) {
        loop {
            let now = Instant::now();
            let elapsed = now.duration_since(state.window_start);
            if elapsed >= Duration::from_secs(1) {
                state.window_start = now;
                state.actions_this_window = 0;
            }
            if state.actions_this_window < config::MAX_ACTIONS_PER_SECOND {
                state.actions_this_window += 1;
                return;
            }
            let wait = Duration::from_secs(1).saturating_sub(elapsed);
            tokio::time::sleep(wait).await;
        }
    }
}

fn needs_refresh(existing: &OrderInfo, desired: &OrderLevel) -> bool {
    if existing.size != desired.size {
        return true;
    }
    bps_distance(existing.price, desired.price) >= config::MIN_MOVE_TO_REFRESH_BPS
}
