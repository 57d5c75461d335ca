//! Source Registry: one live snapshot per data source plus the persisted
//! enabled-set that every downstream view filters on.

use crate::shared::preferences::{EnabledSourceSet, PreferenceStore};
use indexmap::IndexMap;
use tracing::{info, warn};

/// Latest quote state for a single source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSnapshot {
    pub price: f64,
    pub previous_price: f64,
    /// `price - previous_price`
    pub absolute_change: f64,
    /// `100 * absolute_change / previous_price`, or 0 when `previous_price == 0`
    pub percent_change: f64,
    /// Milliseconds since epoch
    pub last_update: i64,
}

impl SourceSnapshot {
    fn first(price: f64, timestamp: i64) -> Self {
        Self::from_prices(price, price, timestamp)
    }

    fn from_prices(price: f64, previous_price: f64, timestamp: i64) -> Self {
        let absolute_change = price - previous_price;
        let percent_change = if previous_price == 0.0 {
            0.0
        } else {
            100.0 * absolute_change / previous_price
        };

        Self {
            price,
            previous_price,
            absolute_change,
            percent_change,
            last_update: timestamp,
        }
    }

    fn next(&self, price: f64, timestamp: i64) -> Self {
        Self::from_prices(price, self.price, timestamp)
    }
}

/// Human readable source name: `binance_futures` -> `binance futures`
pub fn display_name(source: &str) -> String {
    source.replace('_', " ")
}

/// Live per-source snapshots and the enabled-set
pub struct SourceRegistry {
    snapshots: IndexMap<String, SourceSnapshot>,
    enabled: EnabledSourceSet,
    store: Box<dyn PreferenceStore>,
}

impl SourceRegistry {
    /// Load the enabled-set from `store`, defaulting every `known_sources` entry to enabled
    pub fn new<I, S>(known_sources: I, store: Box<dyn PreferenceStore>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let enabled = EnabledSourceSet::load(&*store, known_sources);
        Self {
            snapshots: IndexMap::new(),
            enabled,
            store,
        }
    }

    /// Create or update the snapshot for `source`. `timestamp_ms` defaults to `now_ms`.
    pub fn record_quote(
        &mut self,
        source: &str,
        price: f64,
        timestamp_ms: Option<i64>,
        now_ms: i64,
    ) -> &SourceSnapshot {
        let timestamp = timestamp_ms.unwrap_or(now_ms);
        self.enabled.ensure(source);

        let snapshot = match self.snapshots.get(source) {
            Some(existing) => existing.next(price, timestamp),
            None => SourceSnapshot::first(price, timestamp),
        };
        let (index, _) = self.snapshots.insert_full(source.to_string(), snapshot);
        &self.snapshots[index]
    }

    pub fn get(&self, source: &str) -> Option<&SourceSnapshot> {
        self.snapshots.get(source)
    }

    /// Sources with at least one quote, in first-seen order
    pub fn snapshots(&self) -> impl Iterator<Item = (&str, &SourceSnapshot)> {
        self.snapshots.iter().map(|(s, snap)| (s.as_str(), snap))
    }

    pub fn is_enabled(&self, source: &str) -> bool {
        self.enabled.is_enabled(source)
    }

    pub fn enabled_set(&self) -> &EnabledSourceSet {
        &self.enabled
    }

    /// Every source the registry knows about (configured, persisted or quoted), in order
    pub fn sources(&self) -> Vec<String> {
        self.enabled.iter().map(|(s, _)| s.to_string()).collect()
    }

    /// Flip and persist the enabled flag for `source`. Persistence failures
    /// are logged; the in-memory state changes regardless.
    pub fn toggle(&mut self, source: &str) -> bool {
        let enabled = self.enabled.toggle(source);
        info!(source, enabled, "Source visibility toggled");
        if let Err(e) = self.enabled.save(&mut *self.store) {
            warn!(error = %e, source, "Failed to persist enabled sources");
        }
        enabled
    }

    /// Drop every snapshot (symbol change). The enabled-set is kept.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::ScannerError;
    use crate::shared::preferences::{MemoryStore, ENABLED_SOURCES_KEY};

    fn registry() -> (SourceRegistry, MemoryStore) {
        let store = MemoryStore::new();
        let registry = SourceRegistry::new(["a", "b"], Box::new(store.clone()));
        (registry, store)
    }

    #[test]
    fn test_first_quote_has_no_change() {
        let (mut registry, _) = registry();
        let snap = registry.record_quote("a", 100.0, None, 5_000).clone();
        assert_eq!(snap.previous_price, 100.0);
        assert_eq!(snap.absolute_change, 0.0);
        assert_eq!(snap.percent_change, 0.0);
        assert_eq!(snap.last_update, 5_000);
    }

    #[test]
    fn test_change_is_relative_to_previous_quote() {
        let (mut registry, _) = registry();
        registry.record_quote("a", 100.0, Some(1_000), 9_999);
        let snap = registry.record_quote("a", 101.0, Some(2_000), 9_999).clone();

        assert_eq!(snap.previous_price, 100.0);
        assert!((snap.absolute_change - 1.0).abs() < 1e-12);
        assert!((snap.percent_change - 1.0).abs() < 1e-12);
        assert_eq!(snap.last_update, 2_000);
    }

    #[test]
    fn test_zero_previous_price_yields_zero_percent() {
        let (mut registry, _) = registry();
        registry.record_quote("a", 0.0, None, 1);
        let snap = registry.record_quote("a", 5.0, None, 2).clone();
        assert_eq!(snap.absolute_change, 5.0);
        assert_eq!(snap.percent_change, 0.0);
        // zero is a real price, not "no data"
        assert_eq!(snap.previous_price, 0.0);
    }

    #[test]
    fn test_toggle_persists() {
        let (mut registry, store) = registry();
        assert!(!registry.toggle("b"));
        assert!(!registry.is_enabled("b"));
        assert!(registry.is_enabled("a"));
        assert_eq!(
            store.get(ENABLED_SOURCES_KEY).unwrap(),
            r#"{"a":true,"b":false}"#
        );

        let reloaded = SourceRegistry::new(["a", "b"], Box::new(store.clone()));
        assert!(!reloaded.is_enabled("b"));
    }

    #[test]
    fn test_toggle_survives_store_failure() {
        struct FailingStore;
        impl PreferenceStore for FailingStore {
            fn load(&self, _key: &str) -> Result<Option<String>, ScannerError> {
                Ok(None)
            }
            fn save(&mut self, _key: &str, _value: &str) -> Result<(), ScannerError> {
                Err(ScannerError::Preferences("disk full".to_string()))
            }
        }

        let mut registry = SourceRegistry::new(["a"], Box::new(FailingStore));
        assert!(!registry.toggle("a"));
        assert!(!registry.is_enabled("a"));
    }

    #[test]
    fn test_clear_keeps_enabled_set() {
        let (mut registry, _) = registry();
        registry.record_quote("a", 1.0, None, 1);
        registry.record_quote("new_source", 2.0, None, 1);
        registry.toggle("a");
        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.get("a").is_none());
        assert!(!registry.is_enabled("a"));
        assert_eq!(registry.sources(), vec!["a", "b", "new_source"]);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("binance_futures"), "binance futures");
        assert_eq!(display_name("pyth"), "pyth");
    }
}
