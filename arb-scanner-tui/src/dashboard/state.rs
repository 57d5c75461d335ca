//! Dashboard state: composes the pipeline components for one active symbol and
//! owns the cached view models the terminal widgets draw from.

use super::views::{connected_summary, ChartMetric, ChartView, OpportunityRow, SourceRow};
use crate::shared::batcher::FlushBatch;
use crate::shared::config::ScannerConfig;
use crate::shared::history::TimeSeriesStore;
use crate::shared::ledger::{OpportunityLedger, SortDirection, SortField};
use crate::shared::preferences::PreferenceStore;
use crate::shared::registry::SourceRegistry;
use crate::shared::scheduler::{RenderScheduler, ViewKind};
use crate::shared::spreads::{SpreadGrid, SpreadMatrixBuilder};
use crate::shared::types::{InboundEvent, StreamEvent};
use crate::shared::websocket::ConnectionStatus;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info};

/// Paired monotonic and wall-clock reading. Scheduling uses `instant`,
/// data freshness uses `epoch_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Now {
    pub instant: Instant,
    pub epoch_ms: i64,
}

impl Now {
    pub fn current() -> Self {
        Self {
            instant: Instant::now(),
            epoch_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Per-symbol pipeline state plus user settings
pub struct Dashboard {
    symbol: String,
    registry: SourceRegistry,
    prices: TimeSeriesStore,
    cvd: TimeSeriesStore,
    ledger: OpportunityLedger,
    spreads: SpreadMatrixBuilder,
    scheduler: RenderScheduler,

    min_profit_pct: f64,
    sort_field: SortField,
    sort_direction: SortDirection,
    chart_metric: ChartMetric,
    status: ConnectionStatus,
    events_processed: u64,

    // Cached views, rebuilt on refresh
    chart: ChartView,
    source_rows: Vec<SourceRow>,
    opportunity_rows: Vec<OpportunityRow>,
    spread_grid: SpreadGrid,
}

impl Dashboard {
    pub fn new(config: &ScannerConfig, store: Box<dyn PreferenceStore>) -> Self {
        let registry = SourceRegistry::new(config.sources.iter().cloned(), store);
        let mut prices = TimeSeriesStore::new(config.max_history_points);
        let mut cvd = TimeSeriesStore::new(config.max_history_points);
        for source in registry.sources() {
            prices.register(&source);
            cvd.register(&source);
        }

        let symbol = normalize_symbol(&config.symbol);
        let mut dashboard = Self {
            chart: ChartView::empty(ChartMetric::Price, &symbol),
            spread_grid: SpreadGrid::default(),
            symbol,
            registry,
            prices,
            cvd,
            ledger: OpportunityLedger::new(config.max_opportunities),
            spreads: SpreadMatrixBuilder::new(),
            scheduler: RenderScheduler::new(config.render_intervals.clone()),
            min_profit_pct: config.min_profit_pct.max(0.0),
            sort_field: SortField::Timestamp,
            sort_direction: SortDirection::Descending,
            chart_metric: ChartMetric::Price,
            status: ConnectionStatus::default(),
            events_processed: 0,
            source_rows: Vec::new(),
            opportunity_rows: Vec::new(),
        };
        dashboard.refresh_all(Now::current().epoch_ms);
        dashboard
    }

    /// Dispatch a flushed batch: prices, then opportunities, then the latest
    /// spread snapshot, then everything else. Requests one source-list and
    /// one chart refresh per batch.
    pub fn apply_batch(&mut self, batch: FlushBatch, now: Now) {
        if batch.is_empty() {
            return;
        }
        self.events_processed += batch.len() as u64;

        for inbound in batch.prices {
            self.apply_price_event(inbound);
        }

        let has_opportunities = !batch.opportunities.is_empty();
        for opportunity in batch.opportunities {
            self.ledger.record(opportunity);
        }

        let has_spreads = !batch.spreads.is_empty();
        for stamped in batch.spreads {
            self.spreads.ingest(stamped.payload, stamped.received_at_ms);
        }

        for inbound in batch.others {
            self.apply_other_event(inbound);
        }

        self.scheduler.request(ViewKind::SourceList, now.instant);
        self.scheduler.request(ViewKind::Chart, now.instant);
        if has_opportunities {
            self.scheduler.request(ViewKind::OpportunityTable, now.instant);
        }
        if has_spreads {
            self.scheduler.request(ViewKind::SpreadMatrix, now.instant);
        }
    }

    fn apply_price_event(&mut self, inbound: InboundEvent) {
        let received_at = inbound.received_at_ms;
        match inbound.event {
            StreamEvent::Prices { prices } => {
                let Some(quotes) = prices.get(&self.symbol) else {
                    return;
                };
                for (source, price) in quotes {
                    self.record_price(source, *price, None, received_at);
                }
            }
            StreamEvent::PriceUpdate(update) => {
                if update.symbol != self.symbol {
                    return;
                }
                self.record_price(&update.source, update.price, update.timestamp, received_at);
            }
            other => debug!(kind = ?other.kind(), "Unexpected event in price partition"),
        }
    }

    fn record_price(&mut self, source: &str, price: f64, timestamp_ms: Option<f64>, received_at: i64) {
        // registry and history must agree on which quotes exist
        if !price.is_finite() || timestamp_ms.is_some_and(|t| !t.is_finite()) {
            debug!(source, price, ?timestamp_ms, "Dropping non-finite quote");
            return;
        }
        self.registry
            .record_quote(source, price, timestamp_ms.map(|t| t as i64), received_at);
        self.prices.append(source, price, timestamp_ms, received_at);
        self.cvd.register(source);
    }

    fn apply_other_event(&mut self, inbound: InboundEvent) {
        match inbound.event {
            StreamEvent::CvdUpdate(update) => {
                if update.symbol == self.symbol {
                    self.cvd
                        .append(&update.source, update.cvd, update.timestamp, inbound.received_at_ms);
                    self.prices.register(&update.source);
                }
            }
            StreamEvent::Unknown => debug!("Ignoring unknown stream event"),
            other => debug!(kind = ?other.kind(), "Unexpected event in other partition"),
        }
    }

    /// Rebuild every view whose throttle deadline has passed
    pub fn run_due(&mut self, now: Now) -> Vec<ViewKind> {
        let due = self.scheduler.take_due(now.instant);
        for view in &due {
            self.refresh(*view, now.epoch_ms);
        }
        due
    }

    /// Throttled refresh of a single view (eg/ freshness decay on idle ticks)
    pub fn request_refresh(&mut self, view: ViewKind, now: Now) -> bool {
        self.scheduler.request(view, now.instant)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Switch the active symbol, clearing every per-symbol component.
    /// Returns `false` when the input is empty or already active.
    pub fn change_symbol(&mut self, symbol: &str, now: Now) -> bool {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() || symbol == self.symbol {
            return false;
        }

        info!(from = %self.symbol, to = %symbol, "Changing symbol");
        self.symbol = symbol;
        self.registry.clear();
        self.prices.clear();
        self.cvd.clear();
        self.ledger.clear();
        self.spreads.clear();
        self.scheduler.force_all();
        self.refresh_all(now.epoch_ms);
        true
    }

    /// Flip and persist `source`, refreshing every view immediately
    pub fn toggle_source(&mut self, source: &str, now: Now) -> bool {
        let enabled = self.registry.toggle(source);
        self.scheduler.force_all();
        self.refresh_all(now.epoch_ms);
        enabled
    }

    /// Toggle the n-th source of the source list (0-based)
    pub fn toggle_source_at(&mut self, index: usize, now: Now) -> Option<(String, bool)> {
        let source = self.registry.sources().into_iter().nth(index)?;
        let enabled = self.toggle_source(&source, now);
        Some((source, enabled))
    }

    pub fn set_min_profit(&mut self, pct: f64, now: Now) {
        let pct = if pct.is_finite() { pct.max(0.0) } else { 0.0 };
        // keep keyboard steps on a 0.01 grid
        self.min_profit_pct = (pct * 100.0).round() / 100.0;
        self.scheduler.request(ViewKind::OpportunityTable, now.instant);
        self.scheduler.request(ViewKind::SpreadMatrix, now.instant);
    }

    pub fn adjust_min_profit(&mut self, delta: f64, now: Now) {
        self.set_min_profit(self.min_profit_pct + delta, now);
    }

    /// Same field flips direction, a new field starts descending
    pub fn set_sort(&mut self, field: SortField, now: Now) {
        if field == self.sort_field {
            self.sort_direction = self.sort_direction.flip();
        } else {
            self.sort_field = field;
            self.sort_direction = SortDirection::Descending;
        }
        self.scheduler.request(ViewKind::OpportunityTable, now.instant);
    }

    pub fn cycle_sort_field(&mut self, now: Now) {
        self.set_sort(self.sort_field.next(), now);
    }

    pub fn toggle_sort_direction(&mut self, now: Now) {
        self.set_sort(self.sort_field, now);
    }

    pub fn clear_opportunities(&mut self, now: Now) {
        info!(cleared = self.ledger.len(), "Clearing opportunities");
        self.ledger.clear();
        self.scheduler.request(ViewKind::OpportunityTable, now.instant);
    }

    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    pub fn toggle_chart_metric(&mut self, now: Now) {
        self.chart_metric = self.chart_metric.toggle();
        self.scheduler.force(ViewKind::Chart);
        self.refresh(ViewKind::Chart, now.epoch_ms);
    }

    fn refresh_all(&mut self, now_ms: i64) {
        for view in ViewKind::ALL {
            self.refresh(view, now_ms);
        }
    }

    fn refresh(&mut self, view: ViewKind, now_ms: i64) {
        let registry = &self.registry;
        let is_enabled = |source: &str| registry.is_enabled(source);

        match view {
            ViewKind::Chart => {
                let store = match self.chart_metric {
                    ChartMetric::Price => &self.prices,
                    ChartMetric::Cvd => &self.cvd,
                };
                self.chart =
                    ChartView::build(self.chart_metric, &self.symbol, &store.aligned(), is_enabled);
            }
            ViewKind::SourceList => {
                self.source_rows = registry
                    .sources()
                    .iter()
                    .map(|s| SourceRow::new(s, registry.is_enabled(s), registry.get(s), now_ms))
                    .collect();
            }
            ViewKind::OpportunityTable => {
                self.opportunity_rows = self
                    .ledger
                    .query(self.min_profit_pct, is_enabled, self.sort_field, self.sort_direction)
                    .into_iter()
                    .map(|o| OpportunityRow::new(o, now_ms))
                    .collect();
            }
            ViewKind::SpreadMatrix => {
                self.spread_grid = self.spreads.render(&self.symbol, is_enabled, self.min_profit_pct);
            }
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn min_profit_pct(&self) -> f64 {
        self.min_profit_pct
    }

    pub fn sort(&self) -> (SortField, SortDirection) {
        (self.sort_field, self.sort_direction)
    }

    pub fn chart_metric(&self) -> ChartMetric {
        self.chart_metric
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn chart(&self) -> &ChartView {
        &self.chart
    }

    pub fn source_rows(&self) -> &[SourceRow] {
        &self.source_rows
    }

    pub fn opportunity_rows(&self) -> &[OpportunityRow] {
        &self.opportunity_rows
    }

    pub fn spread_grid(&self) -> &SpreadGrid {
        &self.spread_grid
    }

    /// Sources that have quoted the active symbol
    pub fn connected_summary(&self) -> String {
        connected_summary(self.registry.snapshots().map(|(source, _)| source))
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn price_history(&self) -> &TimeSeriesStore {
        &self.prices
    }

    pub fn cvd_history(&self) -> &TimeSeriesStore {
        &self.cvd
    }

    pub fn ledger(&self) -> &OpportunityLedger {
        &self.ledger
    }

    pub fn spreads(&self) -> &SpreadMatrixBuilder {
        &self.spreads
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::batcher::MessageBatcher;
    use crate::shared::preferences::{MemoryStore, ENABLED_SOURCES_KEY};
    use crate::shared::types::{CvdUpdate, OpportunityPayload, PriceUpdate, SpreadsPayload};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn config() -> ScannerConfig {
        ScannerConfig::default()
            .with_sources(["a", "b", "c"])
            .with_symbol("btcusdt")
            .with_max_history_points(100)
            .with_max_opportunities(10)
            .with_min_profit_pct(0.05)
    }

    fn dashboard() -> (Dashboard, MemoryStore) {
        let store = MemoryStore::new();
        (Dashboard::new(&config(), Box::new(store.clone())), store)
    }

    fn at(start: Instant, offset_ms: u64, epoch_ms: i64) -> Now {
        Now {
            instant: start + Duration::from_millis(offset_ms),
            epoch_ms,
        }
    }

    fn price(symbol: &str, source: &str, price: f64, timestamp: Option<f64>) -> InboundEvent {
        InboundEvent::new(
            StreamEvent::PriceUpdate(PriceUpdate {
                symbol: symbol.to_string(),
                source: source.to_string(),
                price,
                timestamp,
            }),
            1_000,
        )
    }

    fn opportunity(buy: &str, sell: &str, profit_pct: f64, timestamp: i64) -> InboundEvent {
        InboundEvent::new(
            StreamEvent::Arbitrage {
                opportunity: OpportunityPayload {
                    symbol: "BTCUSDT".to_string(),
                    buy_source: buy.to_string(),
                    buy_price: 100.0,
                    sell_source: sell.to_string(),
                    sell_price: 100.0 + profit_pct,
                    profit_pct,
                    timestamp,
                },
            },
            timestamp,
        )
    }

    fn spreads(symbol: &str) -> InboundEvent {
        let mut spreads = BTreeMap::new();
        spreads.insert("a".to_string(), BTreeMap::from([("b".to_string(), 0.2)]));
        spreads.insert("b".to_string(), BTreeMap::from([("a".to_string(), -0.2)]));
        InboundEvent::new(
            StreamEvent::Spreads(SpreadsPayload {
                symbol: symbol.to_string(),
                spreads,
                prices: BTreeMap::new(),
            }),
            1_000,
        )
    }

    fn batch(events: Vec<InboundEvent>) -> FlushBatch {
        let now = Instant::now();
        let mut batcher = MessageBatcher::new(Duration::from_millis(50));
        for event in events {
            batcher.enqueue(event, now);
        }
        batcher.flush()
    }

    #[test]
    fn test_new_dashboard_normalizes_symbol_and_lists_sources() {
        let (dashboard, _) = dashboard();
        assert_eq!(dashboard.symbol(), "BTCUSDT");
        assert_eq!(dashboard.chart().title, "Price Chart - BTCUSDT (Live)");
        let rows: Vec<&str> = dashboard.source_rows().iter().map(|r| r.source.as_str()).collect();
        assert_eq!(rows, vec!["a", "b", "c"]);
        assert_eq!(dashboard.connected_summary(), "No sources connected");
    }

    #[test]
    fn test_apply_batch_updates_components_and_throttles_views() {
        let start = Instant::now();
        let (mut dashboard, _) = dashboard();

        dashboard.apply_batch(
            batch(vec![
                price("BTCUSDT", "a", 100.0, Some(1_000.0)),
                price("BTCUSDT", "b", 101.0, None),
                price("ETHUSDT", "c", 3_000.0, None),
                opportunity("a", "b", 0.1, 1_000),
                spreads("BTCUSDT"),
            ]),
            at(start, 0, 1_000),
        );

        assert_eq!(dashboard.registry().len(), 2);
        assert!(dashboard.registry().get("c").is_none());
        assert_eq!(dashboard.price_history().len("a"), 1);
        assert_eq!(dashboard.ledger().len(), 1);
        assert!(dashboard.spreads().snapshot("BTCUSDT").is_some());
        assert_eq!(dashboard.events_processed(), 5);

        // views are not rebuilt until their deadline
        assert!(dashboard.opportunity_rows().is_empty());
        assert_eq!(dashboard.next_deadline(), Some(start + Duration::from_millis(100)));

        let due = dashboard.run_due(at(start, 100, 1_100));
        assert_eq!(due, vec![ViewKind::Chart, ViewKind::SourceList]);
        assert_eq!(dashboard.source_rows()[0].price, Some(100.0));
        assert_eq!(dashboard.chart().visible().count(), 2);

        let due = dashboard.run_due(at(start, 300, 1_300));
        assert_eq!(due, vec![ViewKind::OpportunityTable, ViewKind::SpreadMatrix]);
        assert_eq!(dashboard.opportunity_rows().len(), 1);
        assert!(dashboard.opportunity_rows()[0].fresh);
        assert_eq!(dashboard.spread_grid().sources, vec!["a", "b"]);
        assert_eq!(
            dashboard.connected_summary(),
            "Connected: A, B"
        );
    }

    #[test]
    fn test_non_finite_quote_reaches_neither_store() {
        let start = Instant::now();
        let (mut dashboard, _) = dashboard();

        dashboard.apply_batch(
            batch(vec![
                price("BTCUSDT", "a", f64::NAN, Some(1_000.0)),
                price("BTCUSDT", "b", 101.0, Some(f64::INFINITY)),
                price("BTCUSDT", "c", 102.0, Some(1_000.0)),
            ]),
            at(start, 0, 1_000),
        );

        assert!(dashboard.registry().get("a").is_none());
        assert!(dashboard.registry().get("b").is_none());
        assert_eq!(dashboard.price_history().len("a"), 0);
        assert_eq!(dashboard.price_history().len("b"), 0);
        assert_eq!(dashboard.registry().len(), 1);
        assert_eq!(dashboard.price_history().len("c"), 1);
    }

    #[test]
    fn test_price_snapshot_uses_active_symbol_only() {
        let start = Instant::now();
        let (mut dashboard, _) = dashboard();
        let mut prices = BTreeMap::new();
        prices.insert(
            "BTCUSDT".to_string(),
            BTreeMap::from([("a".to_string(), 100.0), ("pyth".to_string(), 0.0)]),
        );
        prices.insert("ETHUSDT".to_string(), BTreeMap::from([("b".to_string(), 1.0)]));

        dashboard.apply_batch(
            batch(vec![InboundEvent::new(StreamEvent::Prices { prices }, 5_000)]),
            at(start, 0, 5_000),
        );

        assert_eq!(dashboard.registry().get("a").unwrap().last_update, 5_000);
        // zero is a real price
        assert_eq!(dashboard.registry().get("pyth").unwrap().price, 0.0);
        assert!(dashboard.registry().get("b").is_none());
    }

    #[test]
    fn test_cvd_feeds_separate_history() {
        let start = Instant::now();
        let (mut dashboard, _) = dashboard();
        dashboard.apply_batch(
            batch(vec![InboundEvent::new(
                StreamEvent::CvdUpdate(CvdUpdate {
                    symbol: "BTCUSDT".to_string(),
                    source: "a".to_string(),
                    cvd: -12.5,
                    timestamp: Some(2_000.0),
                }),
                2_000,
            )]),
            at(start, 0, 2_000),
        );

        assert_eq!(dashboard.cvd_history().len("a"), 1);
        assert_eq!(dashboard.price_history().len("a"), 0);
        assert!(dashboard.registry().is_empty());

        dashboard.toggle_chart_metric(at(start, 1, 2_001));
        assert_eq!(dashboard.chart().title, "CVD Chart - BTCUSDT (Live)");
        assert_eq!(dashboard.chart().visible().count(), 1);
    }

    #[test]
    fn test_change_symbol_clears_everything() {
        let start = Instant::now();
        let (mut dashboard, _) = dashboard();
        dashboard.apply_batch(
            batch(vec![
                price("BTCUSDT", "a", 100.0, None),
                opportunity("a", "b", 0.1, 1_000),
                spreads("BTCUSDT"),
            ]),
            at(start, 0, 1_000),
        );

        assert!(!dashboard.change_symbol("  btcusdt ", at(start, 1, 1_001)));
        assert!(!dashboard.change_symbol("   ", at(start, 1, 1_001)));
        assert!(dashboard.change_symbol(" ethusdt", at(start, 2, 1_002)));

        assert_eq!(dashboard.symbol(), "ETHUSDT");
        assert!(dashboard.registry().is_empty());
        assert_eq!(dashboard.price_history().total_points(), 0);
        assert!(dashboard.ledger().is_empty());
        assert!(dashboard.spreads().is_empty());
        assert!(dashboard.opportunity_rows().is_empty());
        assert!(dashboard.spread_grid().is_empty());
        assert!(dashboard.source_rows().iter().all(|r| r.price.is_none()));
        assert_eq!(dashboard.chart().title, "Price Chart - ETHUSDT (Live)");
        assert_eq!(dashboard.next_deadline(), None);
    }

    #[test]
    fn test_toggle_source_refreshes_immediately_and_persists() {
        let start = Instant::now();
        let (mut dashboard, store) = dashboard();
        dashboard.apply_batch(
            batch(vec![
                price("BTCUSDT", "a", 100.0, None),
                price("BTCUSDT", "b", 100.0, None),
                opportunity("a", "b", 0.1, 1_000),
            ]),
            at(start, 0, 1_000),
        );

        let toggled = dashboard.toggle_source_at(1, at(start, 1, 1_001));
        assert_eq!(toggled, Some(("b".to_string(), false)));

        // no deadline wait needed
        assert!(dashboard.opportunity_rows().is_empty());
        assert!(!dashboard.source_rows()[1].enabled);
        let b = dashboard.chart().series.iter().find(|s| s.source == "b").unwrap();
        assert!(b.points.is_empty());
        assert_eq!(dashboard.next_deadline(), None);
        assert!(store.get(ENABLED_SOURCES_KEY).unwrap().contains(r#""b":false"#));

        assert!(dashboard.toggle_source("b", at(start, 2, 1_002)));
        assert_eq!(dashboard.opportunity_rows().len(), 1);
        assert!(dashboard.toggle_source_at(99, at(start, 3, 1_003)).is_none());
    }

    #[test]
    fn test_min_profit_threshold_is_clamped_and_throttled() {
        let start = Instant::now();
        let (mut dashboard, _) = dashboard();
        dashboard.apply_batch(
            batch(vec![
                opportunity("a", "b", 0.04, 1_000),
                opportunity("a", "b", 0.06, 1_000),
            ]),
            at(start, 0, 1_000),
        );
        dashboard.run_due(at(start, 250, 1_250));
        assert_eq!(dashboard.opportunity_rows().len(), 1);

        dashboard.adjust_min_profit(-0.01, at(start, 400, 1_400));
        assert!((dashboard.min_profit_pct() - 0.04).abs() < 1e-12);
        assert_eq!(dashboard.opportunity_rows().len(), 1);
        dashboard.run_due(at(start, 700, 1_700));
        assert_eq!(dashboard.opportunity_rows().len(), 2);

        dashboard.set_min_profit(-5.0, at(start, 800, 1_800));
        assert_eq!(dashboard.min_profit_pct(), 0.0);
    }

    #[test]
    fn test_sort_selection_rules() {
        let start = Instant::now();
        let (mut dashboard, _) = dashboard();
        assert_eq!(dashboard.sort(), (SortField::Timestamp, SortDirection::Descending));

        dashboard.set_sort(SortField::Timestamp, at(start, 0, 0));
        assert_eq!(dashboard.sort(), (SortField::Timestamp, SortDirection::Ascending));

        dashboard.set_sort(SortField::ProfitPct, at(start, 0, 0));
        assert_eq!(dashboard.sort(), (SortField::ProfitPct, SortDirection::Descending));

        dashboard.toggle_sort_direction(at(start, 0, 0));
        assert_eq!(dashboard.sort(), (SortField::ProfitPct, SortDirection::Ascending));

        dashboard.cycle_sort_field(at(start, 0, 0));
        assert_eq!(dashboard.sort(), (SortField::Timestamp, SortDirection::Descending));
    }

    #[test]
    fn test_clear_opportunities() {
        let start = Instant::now();
        let (mut dashboard, _) = dashboard();
        dashboard.apply_batch(batch(vec![opportunity("a", "b", 0.1, 1_000)]), at(start, 0, 1_000));
        dashboard.run_due(at(start, 250, 1_250));
        assert_eq!(dashboard.opportunity_rows().len(), 1);

        dashboard.clear_opportunities(at(start, 300, 1_300));
        dashboard.run_due(at(start, 550, 1_550));
        assert!(dashboard.ledger().is_empty());
        assert!(dashboard.opportunity_rows().is_empty());
    }
}
