//! Spread Matrix Builder: last-write-wins spread snapshot per symbol and the
//! classified grid shown in the matrix panel.

use crate::shared::types::{SpreadTable, SpreadsPayload};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Latest pairwise spreads for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadSnapshot {
    pub spreads: SpreadTable,
    pub prices: BTreeMap<String, f64>,
    /// Milliseconds since epoch at receipt
    pub timestamp: i64,
}

impl SpreadSnapshot {
    pub fn spread(&self, buy: &str, sell: &str) -> Option<f64> {
        self.spreads.get(buy).and_then(|row| row.get(sell)).copied()
    }

    /// Every source named anywhere in the snapshot, alphabetical
    fn sources(&self) -> BTreeSet<&str> {
        let mut sources: BTreeSet<&str> = self.prices.keys().map(|s| s.as_str()).collect();
        for (buy, row) in &self.spreads {
            sources.insert(buy.as_str());
            sources.extend(row.keys().map(|s| s.as_str()));
        }
        sources
    }
}

/// Classification of one matrix cell against the min-profit threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellClass {
    /// Diagonal or no data
    Neutral,
    /// `value >= threshold`
    Opportunity,
    /// `0 < value < threshold`
    Positive,
    /// `value <= 0`
    Negative,
}

impl CellClass {
    pub fn classify(value: Option<f64>, threshold: f64) -> Self {
        match value {
            None => CellClass::Neutral,
            Some(v) if v >= threshold => CellClass::Opportunity,
            Some(v) if v > 0.0 => CellClass::Positive,
            Some(_) => CellClass::Negative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadCell {
    pub value: Option<f64>,
    pub class: CellClass,
}

/// Renderable matrix: rows are buy sources, columns sell sources, same order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadGrid {
    pub symbol: String,
    pub sources: Vec<String>,
    pub prices: Vec<Option<f64>>,
    pub cells: Vec<Vec<SpreadCell>>,
    pub timestamp: Option<i64>,
}

impl SpreadGrid {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn cell(&self, buy: &str, sell: &str) -> Option<&SpreadCell> {
        let row = self.sources.iter().position(|s| s == buy)?;
        let col = self.sources.iter().position(|s| s == sell)?;
        self.cells.get(row).and_then(|r| r.get(col))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpreadMatrixBuilder {
    snapshots: HashMap<String, SpreadSnapshot>,
}

impl SpreadMatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot for the payload's symbol
    pub fn ingest(&mut self, payload: SpreadsPayload, received_at_ms: i64) {
        self.snapshots.insert(
            payload.symbol,
            SpreadSnapshot {
                spreads: payload.spreads,
                prices: payload.prices,
                timestamp: received_at_ms,
            },
        );
    }

    pub fn snapshot(&self, symbol: &str) -> Option<&SpreadSnapshot> {
        self.snapshots.get(symbol)
    }

    /// Grid for `symbol` over the sources passing `is_enabled`
    pub fn render<F>(&self, symbol: &str, is_enabled: F, threshold: f64) -> SpreadGrid
    where
        F: Fn(&str) -> bool,
    {
        let Some(snapshot) = self.snapshots.get(symbol) else {
            return SpreadGrid {
                symbol: symbol.to_string(),
                ..SpreadGrid::default()
            };
        };

        let sources: Vec<String> = snapshot
            .sources()
            .into_iter()
            .filter(|s| is_enabled(*s))
            .map(str::to_string)
            .collect();

        let cells = sources
            .iter()
            .map(|buy| {
                sources
                    .iter()
                    .map(|sell| {
                        if buy == sell {
                            return SpreadCell {
                                value: None,
                                class: CellClass::Neutral,
                            };
                        }
                        let value = snapshot.spread(buy, sell);
                        SpreadCell {
                            value,
                            class: CellClass::classify(value, threshold),
                        }
                    })
                    .collect()
            })
            .collect();

        SpreadGrid {
            symbol: symbol.to_string(),
            prices: sources.iter().map(|s| snapshot.prices.get(s).copied()).collect(),
            sources,
            cells,
            timestamp: Some(snapshot.timestamp),
        }
    }

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

    fn payload(symbol: &str, pairs: &[(&str, &str, f64)]) -> SpreadsPayload {
        let mut spreads = SpreadTable::new();
        for (buy, sell, value) in pairs {
            spreads
                .entry(buy.to_string())
                .or_default()
                .insert(sell.to_string(), *value);
        }
        SpreadsPayload {
            symbol: symbol.to_string(),
            spreads,
            prices: BTreeMap::new(),
        }
    }

    #[test]
    fn test_classification_against_threshold() {
        let mut builder = SpreadMatrixBuilder::new();
        builder.ingest(payload("BTCUSDT", &[("A", "B", 0.2), ("B", "A", -0.2)]), 1);

        let grid = builder.render("BTCUSDT", |_| true, 0.05);
        assert_eq!(grid.sources, vec!["A", "B"]);
        assert_eq!(grid.cell("A", "B").unwrap().class, CellClass::Opportunity);
        assert_eq!(grid.cell("B", "A").unwrap().class, CellClass::Negative);
        assert_eq!(grid.cell("A", "A").unwrap().class, CellClass::Neutral);
        assert_eq!(grid.cell("B", "B").unwrap().class, CellClass::Neutral);
    }

    #[test]
    fn test_classify_boundaries() {
        struct TestCase {
            value: Option<f64>,
            expected: CellClass,
        }

        let tests = vec![
            TestCase { value: None, expected: CellClass::Neutral },         // TC0
            TestCase { value: Some(0.05), expected: CellClass::Opportunity }, // TC1: at threshold
            TestCase { value: Some(0.01), expected: CellClass::Positive },  // TC2
            TestCase { value: Some(0.0), expected: CellClass::Negative },   // TC3: zero is not positive
            TestCase { value: Some(-1.0), expected: CellClass::Negative },  // TC4
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(CellClass::classify(test.value, 0.05), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_diagonal_is_neutral_even_with_data() {
        let mut builder = SpreadMatrixBuilder::new();
        builder.ingest(payload("BTCUSDT", &[("A", "A", 5.0), ("A", "B", 0.01)]), 1);

        let grid = builder.render("BTCUSDT", |_| true, 0.05);
        let diagonal = grid.cell("A", "A").unwrap();
        assert_eq!(diagonal.class, CellClass::Neutral);
        assert_eq!(diagonal.value, None);
        assert_eq!(grid.cell("A", "B").unwrap().class, CellClass::Positive);
        // B never reports as buyer
        assert_eq!(grid.cell("B", "A").unwrap().class, CellClass::Neutral);
    }

    #[test]
    fn test_disabled_sources_are_removed_from_rows_and_columns() {
        let mut builder = SpreadMatrixBuilder::new();
        builder.ingest(
            payload("BTCUSDT", &[("A", "B", 0.2), ("A", "C", 0.3), ("C", "B", 0.1)]),
            1,
        );

        let grid = builder.render("BTCUSDT", |s| s != "C", 0.05);
        assert_eq!(grid.sources, vec!["A", "B"]);
        assert_eq!(grid.cells.len(), 2);
        assert!(grid.cells.iter().all(|row| row.len() == 2));
        assert!(grid.cell("A", "C").is_none());
    }

    #[test]
    fn test_ingest_is_last_write_wins_per_symbol() {
        let mut builder = SpreadMatrixBuilder::new();
        builder.ingest(payload("BTCUSDT", &[("A", "B", 0.2)]), 1);
        builder.ingest(payload("ETHUSDT", &[("A", "B", 0.7)]), 2);
        builder.ingest(payload("BTCUSDT", &[("A", "B", -0.1)]), 3);

        assert_eq!(builder.len(), 2);
        let grid = builder.render("BTCUSDT", |_| true, 0.05);
        assert_eq!(grid.cell("A", "B").unwrap().value, Some(-0.1));
        assert_eq!(grid.timestamp, Some(3));
        assert_eq!(builder.snapshot("ETHUSDT").unwrap().spread("A", "B"), Some(0.7));
    }

    #[test]
    fn test_unknown_symbol_and_clear_render_empty() {
        let mut builder = SpreadMatrixBuilder::new();
        assert!(builder.render("BTCUSDT", |_| true, 0.05).is_empty());

        builder.ingest(payload("BTCUSDT", &[("A", "B", 0.2)]), 1);
        builder.clear();
        let grid = builder.render("BTCUSDT", |_| true, 0.05);
        assert!(grid.is_empty());
        assert_eq!(grid.timestamp, None);
    }
}
