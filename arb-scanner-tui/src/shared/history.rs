/// Bounded per-source history and multi-source time-axis alignment
///
/// Each source keeps its own insertion-ordered window (oldest dropped first).
/// [`TimeSeriesStore::aligned`] merges every window onto one shared, sorted
/// time axis and forward-fills each source so all series have equal length.
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// One observation: `(seconds since epoch, value)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    pub timestamp: f64,
    pub value: f64,
}

/// Chartable dataset produced by [`TimeSeriesStore::aligned`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSeries {
    /// Distinct timestamps across every source, ascending
    pub timestamps: Vec<f64>,
    /// One value per timestamp per source; `None` until the source's first point
    pub series: IndexMap<String, Vec<Option<f64>>>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn values(&self, source: &str) -> Option<&[Option<f64>]> {
        self.series.get(source).map(|v| v.as_slice())
    }

    /// `(timestamp, value)` pairs for `source`, skipping slots with no value yet
    pub fn points(&self, source: &str) -> Vec<(f64, f64)> {
        match self.series.get(source) {
            Some(values) => self
                .timestamps
                .iter()
                .zip(values)
                .filter_map(|(t, v)| v.map(|v| (*t, v)))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Bounded per-source history window
#[derive(Debug, Clone)]
pub struct TimeSeriesStore {
    max_points: usize,
    series: IndexMap<String, VecDeque<HistoryPoint>>,
}

impl TimeSeriesStore {
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(1),
            series: IndexMap::new(),
        }
    }

    /// Reserve a (possibly empty) slot for `source` so chart series stay stable
    pub fn register(&mut self, source: &str) {
        if !self.series.contains_key(source) {
            self.series
                .insert(source.to_string(), VecDeque::with_capacity(self.max_points));
        }
    }

    /// Append a point, evicting the oldest when over capacity.
    /// `timestamp_ms` defaults to `now_ms`.
    pub fn append(&mut self, source: &str, value: f64, timestamp_ms: Option<f64>, now_ms: i64) {
        let timestamp = timestamp_ms.unwrap_or(now_ms as f64) / 1000.0;
        if !timestamp.is_finite() || !value.is_finite() {
            debug!(source, value, timestamp, "Skipping non-finite history point");
            return;
        }
        // -0.0 and 0.0 must land on the same axis slot
        let timestamp = if timestamp == 0.0 { 0.0 } else { timestamp };

        self.register(source);
        let max_points = self.max_points;
        if let Some(window) = self.series.get_mut(source) {
            // Remove oldest entry if at capacity
            while window.len() >= max_points {
                window.pop_front();
            }
            window.push_back(HistoryPoint { timestamp, value });
        }
    }

    pub fn history(&self, source: &str) -> Option<&VecDeque<HistoryPoint>> {
        self.series.get(source)
    }

    pub fn len(&self, source: &str) -> usize {
        self.series.get(source).map(|w| w.len()).unwrap_or(0)
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|s| s.as_str())
    }

    pub fn total_points(&self) -> usize {
        self.series.values().map(|w| w.len()).sum()
    }

    /// Drop every point; registered slots are kept
    pub fn clear(&mut self) {
        for window in self.series.values_mut() {
            window.clear();
        }
    }

    /// Align every source onto the union of all timestamps, forward-filling
    /// gaps. O(T·S) for T distinct timestamps and S sources.
    pub fn aligned(&self) -> AlignedSeries {
        let timestamps: Vec<f64> = self
            .series
            .values()
            .flat_map(|w| w.iter().map(|p| p.timestamp))
            .sorted_by(|a, b| a.total_cmp(b))
            .dedup()
            .collect();

        let mut series = IndexMap::with_capacity(self.series.len());
        for (source, window) in &self.series {
            // exact-timestamp lookup; a later point at the same instant wins
            let by_time: HashMap<u64, f64> = window
                .iter()
                .map(|p| (p.timestamp.to_bits(), p.value))
                .collect();

            let mut last_known: Option<f64> = None;
            let values: Vec<Option<f64>> = timestamps
                .iter()
                .map(|t| {
                    if let Some(value) = by_time.get(&t.to_bits()) {
                        last_known = Some(*value);
                    }
                    last_known
                })
                .collect();

            series.insert(source.clone(), values);
        }

        AlignedSeries { timestamps, series }
    }
}
