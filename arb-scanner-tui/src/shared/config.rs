//! Runtime configuration for the scanner dashboard.
//!
//! Defaults mirror the backend this client was built against and every value
//! can be overridden through environment variables (see [`ScannerConfig::from_env`]).

use crate::shared::error::ScannerError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Sources the backend is known to publish, in display order.
/// `pyth` is the oracle feed; everything else is an exchange market.
pub const KNOWN_SOURCES: [&str; 10] = [
    "binance_futures",
    "bybit_futures",
    "hyperliquid_futures",
    "kraken_futures",
    "okx_futures",
    "gate_futures",
    "paradex_futures",
    "binance_spot",
    "bybit_spot",
    "pyth",
];

pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";
pub const DEFAULT_SYMBOL: &str = "BTCUSDT";
pub const DEFAULT_MAX_HISTORY_POINTS: usize = 1000;
pub const DEFAULT_MAX_OPPORTUNITIES: usize = 50;
pub const DEFAULT_MIN_PROFIT_PCT: f64 = 0.05;
pub const DEFAULT_PREFS_DIR: &str = ".arb-scanner";

/// Opportunities younger than this are highlighted as fresh
pub const FRESHNESS_WINDOW_MS: i64 = 5_000;

/// Exponential reconnect backoff: `min(base * factor^n, max_delay)` for attempt `n`
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub factor: u32,
    pub max_delay: Duration,
    /// No attempt is scheduled once this many have been made without a successful open
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1_000),
            factor: 2,
            max_delay: Duration::from_millis(30_000),
            max_attempts: 10,
        }
    }
}

impl BackoffPolicy {
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Delay before attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = (self.factor as u64).saturating_pow(attempt);
        let millis = (self.base_delay.as_millis() as u64).saturating_mul(multiplier);
        Duration::from_millis(millis).min(self.max_delay)
    }
}

/// Connection Manager configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket server URL
    pub url: String,
    /// Ping interval to keep connection alive
    pub ping_interval: Duration,
    /// Maximum channel buffer size for decoded events
    pub channel_buffer_size: usize,
    pub backoff: BackoffPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            ping_interval: Duration::from_secs(30),
            channel_buffer_size: 10_000,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl ConnectionConfig {
    /// Create a new configuration with custom URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Coalescing window per view; slower or more expensive views wait longer
#[derive(Debug, Clone, PartialEq)]
pub struct RenderIntervals {
    pub chart: Duration,
    pub source_list: Duration,
    pub opportunity_table: Duration,
    pub spread_matrix: Duration,
}

impl Default for RenderIntervals {
    fn default() -> Self {
        Self {
            chart: Duration::from_millis(100),
            source_list: Duration::from_millis(100),
            opportunity_table: Duration::from_millis(250),
            spread_matrix: Duration::from_millis(300),
        }
    }
}

/// Top level dashboard configuration
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub connection: ConnectionConfig,
    pub symbol: String,
    pub sources: Vec<String>,
    pub max_history_points: usize,
    pub max_opportunities: usize,
    pub min_profit_pct: f64,
    /// Directory holding persisted client-side preferences
    pub prefs_dir: PathBuf,
    pub flush_delay: Duration,
    pub render_intervals: RenderIntervals,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            symbol: DEFAULT_SYMBOL.to_string(),
            sources: KNOWN_SOURCES.iter().map(|s| s.to_string()).collect(),
            max_history_points: DEFAULT_MAX_HISTORY_POINTS,
            max_opportunities: DEFAULT_MAX_OPPORTUNITIES,
            min_profit_pct: DEFAULT_MIN_PROFIT_PCT,
            prefs_dir: PathBuf::from(DEFAULT_PREFS_DIR),
            flush_delay: Duration::from_millis(50),
            render_intervals: RenderIntervals::default(),
        }
    }
}

impl ScannerConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    ///
    /// `WS_URL`, `SYMBOL`, `SOURCES` (comma separated), `MAX_HISTORY_POINTS`,
    /// `MAX_OPPORTUNITIES`, `MIN_PROFIT_PCT`, `PREFS_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let url = lookup("WS_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| defaults.connection.url.clone());

        let symbol = lookup("SYMBOL")
            .map(|v| v.trim().to_uppercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| defaults.symbol.clone());

        let sources = lookup("SOURCES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| defaults.sources.clone());

        let max_history_points = parse_capacity(
            &lookup,
            "MAX_HISTORY_POINTS",
            defaults.max_history_points,
        );
        let max_opportunities =
            parse_capacity(&lookup, "MAX_OPPORTUNITIES", defaults.max_opportunities);

        let min_profit_pct = parse_or(&lookup, "MIN_PROFIT_PCT", defaults.min_profit_pct);
        let min_profit_pct = if min_profit_pct.is_finite() && min_profit_pct >= 0.0 {
            min_profit_pct
        } else {
            warn!(min_profit_pct, "MIN_PROFIT_PCT must be a non-negative number, using default");
            defaults.min_profit_pct
        };

        let prefs_dir = lookup("PREFS_DIR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| defaults.prefs_dir.clone());

        Self {
            connection: ConnectionConfig::new(url),
            symbol,
            sources,
            max_history_points,
            max_opportunities,
            min_profit_pct,
            prefs_dir,
            ..defaults
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_history_points(mut self, max: usize) -> Self {
        self.max_history_points = max;
        self
    }

    pub fn with_max_opportunities(mut self, max: usize) -> Self {
        self.max_opportunities = max;
        self
    }

    pub fn with_min_profit_pct(mut self, pct: f64) -> Self {
        self.min_profit_pct = pct;
        self
    }

    pub fn with_prefs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prefs_dir = dir.into();
        self
    }

    pub fn with_render_intervals(mut self, intervals: RenderIntervals) -> Self {
        self.render_intervals = intervals;
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable value, using default");
            default
        }),
        None => default,
    }
}

fn parse_capacity<F>(lookup: &F, key: &str, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    match validate_capacity(key, parse_or(lookup, key, default)) {
        Ok(value) => value,
        Err(error) => {
            warn!(%error, "using default");
            default
        }
    }
}

fn validate_capacity(key: &str, value: usize) -> Result<usize, ScannerError> {
    if value == 0 {
        return Err(ScannerError::InvalidConfig(format!("{key} must be at least 1")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_backoff_delays_double_and_cap() {
        let policy = BackoffPolicy::default();
        let delays: Vec<u128> = (1..=6).map(|n| policy.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![2_000, 4_000, 8_000, 16_000, 30_000, 30_000]);
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(200), Duration::from_millis(30_000));
    }

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert_eq!(config.connection.url, "ws://localhost:8080/ws");
        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.sources.len(), KNOWN_SOURCES.len());
        assert_eq!(config.max_history_points, 1000);
        assert_eq!(config.max_opportunities, 50);
        assert_eq!(config.flush_delay, Duration::from_millis(50));
        assert_eq!(config.render_intervals.spread_matrix, Duration::from_millis(300));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = ScannerConfig::from_lookup(lookup_from(&[
            ("WS_URL", "ws://10.0.0.2:9000/ws"),
            ("SYMBOL", " ethusdt "),
            ("SOURCES", "Binance_Futures, pyth,,"),
            ("MAX_HISTORY_POINTS", "500"),
            ("MAX_OPPORTUNITIES", "25"),
            ("MIN_PROFIT_PCT", "0.1"),
        ]));

        assert_eq!(config.connection.url, "ws://10.0.0.2:9000/ws");
        assert_eq!(config.symbol, "ETHUSDT");
        assert_eq!(config.sources, vec!["binance_futures", "pyth"]);
        assert_eq!(config.max_history_points, 500);
        assert_eq!(config.max_opportunities, 25);
        assert_eq!(config.min_profit_pct, 0.1);
    }

    #[test]
    fn test_config_invalid_values_fall_back() {
        let config = ScannerConfig::from_lookup(lookup_from(&[
            ("MAX_HISTORY_POINTS", "0"),
            ("MAX_OPPORTUNITIES", "lots"),
            ("MIN_PROFIT_PCT", "-1"),
            ("SOURCES", " , "),
        ]));

        assert_eq!(config.max_history_points, DEFAULT_MAX_HISTORY_POINTS);
        assert_eq!(config.max_opportunities, DEFAULT_MAX_OPPORTUNITIES);
        assert_eq!(config.min_profit_pct, DEFAULT_MIN_PROFIT_PCT);
        assert_eq!(config.sources.len(), KNOWN_SOURCES.len());
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new("ws://localhost:8080")
            .with_ping_interval(Duration::from_secs(15))
            .with_channel_buffer_size(500)
            .with_backoff(BackoffPolicy::default().with_max_attempts(3));

        assert_eq!(config.url, "ws://localhost:8080");
        assert_eq!(config.ping_interval, Duration::from_secs(15));
        assert_eq!(config.channel_buffer_size, 500);
        assert_eq!(config.backoff.max_attempts, 3);
    }
}
