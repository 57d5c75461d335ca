//! Rendering-independent view models computed by the dashboard on refresh

use crate::shared::history::AlignedSeries;
use crate::shared::ledger::Opportunity;
use crate::shared::registry::{display_name, SourceSnapshot};
use itertools::Itertools;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Metric plotted by the chart panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartMetric {
    #[default]
    Price,
    Cvd,
}

impl ChartMetric {
    pub fn toggle(self) -> Self {
        match self {
            ChartMetric::Price => ChartMetric::Cvd,
            ChartMetric::Cvd => ChartMetric::Price,
        }
    }

    pub fn title(self, symbol: &str) -> String {
        match self {
            ChartMetric::Price => format!("Price Chart - {symbol} (Live)"),
            ChartMetric::Cvd => format!("CVD Chart - {symbol} (Live)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub source: String,
    pub enabled: bool,
    /// `(seconds since epoch, value)`; empty when the source is disabled
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub title: String,
    pub metric: ChartMetric,
    /// Number of aligned timestamps across all sources
    pub samples: usize,
    pub series: Vec<ChartSeries>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl ChartView {
    pub fn empty(metric: ChartMetric, symbol: &str) -> Self {
        Self {
            title: metric.title(symbol),
            metric,
            samples: 0,
            series: Vec::new(),
            x_bounds: [0.0, 1.0],
            y_bounds: [0.0, 1.0],
        }
    }

    /// One series per aligned slot; disabled sources keep their slot with no points
    pub fn build<F>(metric: ChartMetric, symbol: &str, aligned: &AlignedSeries, is_enabled: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let series: Vec<ChartSeries> = aligned
            .series
            .keys()
            .map(|source| {
                let enabled = is_enabled(source);
                ChartSeries {
                    source: source.clone(),
                    enabled,
                    points: if enabled {
                        aligned.points(source)
                    } else {
                        Vec::new()
                    },
                }
            })
            .collect();

        let (x_bounds, y_bounds) = bounds(&series);
        Self {
            title: metric.title(symbol),
            metric,
            samples: aligned.len(),
            series,
            x_bounds,
            y_bounds,
        }
    }

    pub fn visible(&self) -> impl Iterator<Item = &ChartSeries> {
        self.series.iter().filter(|s| !s.points.is_empty())
    }
}

fn bounds(series: &[ChartSeries]) -> ([f64; 2], [f64; 2]) {
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y = [f64::INFINITY, f64::NEG_INFINITY];
    for (t, v) in series.iter().flat_map(|s| s.points.iter()) {
        x = [x[0].min(*t), x[1].max(*t)];
        y = [y[0].min(*v), y[1].max(*v)];
    }

    if !x[0].is_finite() {
        return ([0.0, 1.0], [0.0, 1.0]);
    }
    if x[0] == x[1] {
        x = [x[0] - 1.0, x[1] + 1.0];
    }

    // 0.1% of the visible range, never flatter than 0.01
    let padding = ((y[1] - y[0]) * 0.001).max(0.01);
    (x, [y[0] - padding, y[1] + padding])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One line of the source list
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub source: String,
    pub display_name: String,
    pub enabled: bool,
    /// `None` until the source has quoted the active symbol
    pub price: Option<f64>,
    pub change: f64,
    pub percent_change: f64,
    pub direction: Direction,
    pub age_ms: Option<i64>,
}

impl SourceRow {
    pub fn new(source: &str, enabled: bool, snapshot: Option<&SourceSnapshot>, now_ms: i64) -> Self {
        let change = snapshot.map(|s| s.absolute_change).unwrap_or_default();
        Self {
            source: source.to_string(),
            display_name: display_name(source),
            enabled,
            price: snapshot.map(|s| s.price),
            change,
            percent_change: snapshot.map(|s| s.percent_change).unwrap_or_default(),
            direction: if change >= 0.0 {
                Direction::Up
            } else {
                Direction::Down
            },
            age_ms: snapshot.map(|s| now_ms - s.last_update),
        }
    }
}

/// One line of the alert table
#[derive(Debug, Clone, PartialEq)]
pub struct OpportunityRow {
    pub opportunity: Opportunity,
    pub fresh: bool,
    pub age_ms: i64,
}

impl OpportunityRow {
    pub fn new(opportunity: &Opportunity, now_ms: i64) -> Self {
        Self {
            opportunity: opportunity.clone(),
            fresh: opportunity.is_fresh(now_ms),
            age_ms: opportunity.age_ms(now_ms),
        }
    }
}

/// `"Connected: BINANCE FUTURES, PYTH"` or `"No sources connected"`
pub fn connected_summary<'a, I>(sources: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let names = sources
        .into_iter()
        .map(|s| display_name(s).to_uppercase())
        .join(", ");

    if names.is_empty() {
        "No sources connected".to_string()
    } else {
        format!("Connected: {names}")
    }
}

/// Frames drawn during the trailing second
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    frames: VecDeque<Instant>,
}

impl FpsCounter {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, now: Instant) {
        self.frames.push_back(now);
        self.evict(now);
    }

    pub fn fps(&mut self, now: Instant) -> usize {
        self.evict(now);
        self.frames.len()
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.frames.front() {
            if now.duration_since(*front) >= Self::WINDOW {
                self.frames.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::history::TimeSeriesStore;

    fn assert_close(actual: [f64; 2], expected: [f64; 2]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_chart_title() {
        assert_eq!(ChartMetric::Price.title("BTCUSDT"), "Price Chart - BTCUSDT (Live)");
        assert_eq!(ChartMetric::Cvd.title("ETHUSDT"), "CVD Chart - ETHUSDT (Live)");
        assert_eq!(ChartMetric::Price.toggle(), ChartMetric::Cvd);
    }

    #[test]
    fn test_chart_disabled_source_keeps_empty_slot() {
        let mut store = TimeSeriesStore::new(100);
        store.register("pyth");
        store.append("a", 100.0, Some(1_000.0), 0);
        store.append("b", 200.0, Some(2_000.0), 0);

        let chart = ChartView::build(ChartMetric::Price, "BTCUSDT", &store.aligned(), |s| s != "b");
        let sources: Vec<&str> = chart.series.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(sources, vec!["pyth", "a", "b"]);
        assert!(chart.series[0].points.is_empty());
        assert_eq!(chart.series[1].points, vec![(1.0, 100.0), (2.0, 100.0)]);
        assert!(!chart.series[2].enabled);
        assert!(chart.series[2].points.is_empty());
        assert_eq!(chart.visible().count(), 1);
        assert_eq!(chart.samples, 2);

        // bounds follow visible points only
        assert_eq!(chart.x_bounds, [1.0, 2.0]);
        assert_close(chart.y_bounds, [99.99, 100.01]);
    }

    #[test]
    fn test_chart_bounds_padding() {
        let mut store = TimeSeriesStore::new(100);
        store.append("a", 1_000.0, Some(1_000.0), 0);
        store.append("a", 11_000.0, Some(1_000.0), 0);
        store.append("a", 11_000.0, Some(3_000.0), 0);
        store.append("b", 1_000.0, Some(2_000.0), 0);

        let chart = ChartView::build(ChartMetric::Price, "BTCUSDT", &store.aligned(), |_| true);
        assert_eq!(chart.x_bounds, [1.0, 3.0]);
        assert_close(chart.y_bounds, [990.0, 11_010.0]);

        let empty = ChartView::build(ChartMetric::Cvd, "X", &TimeSeriesStore::new(1).aligned(), |_| true);
        assert_eq!(empty.x_bounds, [0.0, 1.0]);
        assert_eq!(empty, ChartView::empty(ChartMetric::Cvd, "X"));
    }

    #[test]
    fn test_source_row_without_quote() {
        let row = SourceRow::new("binance_futures", false, None, 10);
        assert_eq!(row.display_name, "binance futures");
        assert_eq!(row.price, None);
        assert_eq!(row.age_ms, None);
        assert_eq!(row.direction, Direction::Up);
    }

    #[test]
    fn test_connected_summary() {
        assert_eq!(connected_summary(Vec::<&str>::new()), "No sources connected");
        assert_eq!(
            connected_summary(["binance_futures", "pyth"]),
            "Connected: BINANCE FUTURES, PYTH"
        );
    }

    #[test]
    fn test_fps_counter_window() {
        let start = Instant::now();
        let mut fps = FpsCounter::new();
        for i in 0..30 {
            fps.record(start + Duration::from_millis(i * 50));
        }
        // frames at 0..=1450ms, window ends at 1450ms: 500..=1450 remain
        assert_eq!(fps.fps(start + Duration::from_millis(1_450)), 20);
        assert_eq!(fps.fps(start + Duration::from_secs(10)), 0);
    }
}
