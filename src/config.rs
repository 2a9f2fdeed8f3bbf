/// Per-symbol ladder configuration.
#[derive(Clone, Copy, Debug)]
pub struct SymbolConfig {
    pub base_size: i64,
    pub size_multiplier: f64,
    pub base_spread_bps: f64,
    pub level_spread_step_bps: f64,
    pub max_levels: usize,
}

/// Hard limits enforced by the risk engine.
#[derive(Clone, Copy, Debug)]
pub struct RiskLimits {
    pub max_position: i64,
    pub max_dollar_exposure: f64,
    pub drawdown_stop_pct: f64,
    pub hard_stop_pct: f64,
}

pub const ETF_SYMBOL: &str = "ETF";
pub const BASKET_SYMBOLS: [&str; 3] = ["XYZ", "ABC", "DEF"];
pub const ALL_SYMBOLS: [&str; 4] = [ETF_SYMBOL, "XYZ", "ABC", "DEF"];

/// Basket composition of the ETF. Weights are fixed by the exchange listing.
pub const SYNTHETIC_WEIGHTS: [(&str, f64); 3] = [("XYZ", 0.5), ("ABC", 0.3), ("DEF", 0.2)];

pub const LOOP_DELAY_SECONDS: f64 = 0.01; // 100 Hz target
pub const MIN_MOVE_TO_REFRESH_BPS: f64 = 2.0;
pub const MAX_ACTIONS_PER_SECOND: u32 = 95;

pub const MAKER_REBATE_BPS: f64 = 2.0;
pub const TAKER_FEE_BPS: f64 = 5.0;
pub const EFFECTIVE_MAKER_EDGE_BPS: f64 = MAKER_REBATE_BPS + TAKER_FEE_BPS;

pub const RISK_LIMITS: RiskLimits = RiskLimits {
    max_position: 25_000,
    max_dollar_exposure: 5_000_000.0,
    drawdown_stop_pct: 0.15,
    hard_stop_pct: 0.25,
};

pub const NOTIONAL_CAPITAL: f64 = 1_000_000.0;
pub const TARGET_NOTIONAL_UTILIZATION: f64 = 0.8;
pub const TARGET_RESTING_NOTIONAL: f64 = NOTIONAL_CAPITAL * TARGET_NOTIONAL_UTILIZATION;

pub const VOL_SMOOTHING_ALPHA: f64 = 0.2;
pub const VOL_FLOOR_BPS: f64 = 5.0;

pub const INVENTORY_SKEW_BPS: f64 = 8.0;
/// Priority boost (bps-equivalent) per 100% of position limit in use.
pub const INVENTORY_PRIORITY_WEIGHT: f64 = 120.0;

pub const MISPRICING_INTENSITY_BPS: f64 = 40.0;
pub const MISPRICING_SIZE_BONUS: f64 = 0.8;
pub const MISPRICING_SIZE_PENALTY: f64 = 0.5;
pub const MISPRICING_SPREAD_WIDEN: f64 = 0.25;

pub const DRAWDOWN_SPREAD_MULT: f64 = 1.5;
pub const DRAWDOWN_SIZE_REDUCTION: f64 = 0.7;

pub const TELEMETRY_INTERVAL_SECONDS: f64 = 1.0;

pub const HTTP_TIMEOUT_MS: u64 = 200;

pub const EXCHANGE_HOST: &str = "159.65.173.202";
pub const GATEWAY_PORT: u16 = 9001;
pub const SCOREKEEPER_HTTP_PORT: u16 = 8081;

pub const TEAM_TOKEN_ENV: &str = "DELTA_TOKEN";
pub const DEFAULT_TEAM_TOKEN: &str = "shortinggpa-129asfasd301";

/// On-wire prices are integer ticks: cents per dollar.
pub const ORDER_PRICE_SCALE: f64 = 100.0;

/// Same ladder shape for every symbol in the universe.
pub const DEFAULT_SYMBOL_CONFIG: SymbolConfig = SymbolConfig {
    base_size: 400,
    size_multiplier: 1.5,
    base_spread_bps: 15.0,
    level_spread_step_bps: 15.0,
    max_levels: 6,
};

pub fn symbol_config(_symbol: &str) -> SymbolConfig {
    DEFAULT_SYMBOL_CONFIG
}

/// Basket weight of a constituent; 0.0 for symbols outside the basket.
pub fn synthetic_weight(symbol: &str) -> f64 {
    SYNTHETIC_WEIGHTS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map_or(0.0, |(_, w)| *w)
}

pub fn scorekeeper_base_url() -> String {
    format!("http://{}:{}", EXCHANGE_HOST, SCOREKEEPER_HTTP_PORT)
}

/// Team token from the environment, falling back to the built-in default.
pub fn team_token() -> String {
    std::env::var(TEAM_TOKEN_ENV).unwrap_or_else(|_| DEFAULT_TEAM_TOKEN.to_string())
}
