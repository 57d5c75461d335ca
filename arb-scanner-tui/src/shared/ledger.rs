//! Opportunity Ledger: bounded, most-recent-first record of detected arbitrage
//! with a filtered and stably sorted projection for the alert table.

use crate::shared::config::FRESHNESS_WINDOW_MS;
use crate::shared::types::OpportunityPayload;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

static NEXT_OPPORTUNITY_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_OPPORTUNITY_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Immutable arbitrage record
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    /// Unique for the lifetime of the process
    pub id: u64,
    pub symbol: String,
    pub buy_source: String,
    pub buy_price: f64,
    pub sell_source: String,
    pub sell_price: f64,
    pub profit_pct: f64,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

impl Opportunity {
    fn from_payload(payload: OpportunityPayload) -> Self {
        Self {
            id: next_id(),
            symbol: payload.symbol,
            buy_source: payload.buy_source,
            buy_price: payload.buy_price,
            sell_source: payload.sell_source,
            sell_price: payload.sell_price,
            profit_pct: payload.profit_pct,
            timestamp: payload.timestamp,
        }
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }

    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.age_ms(now_ms) < FRESHNESS_WINDOW_MS
    }
}

/// Sortable column of the alert table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Timestamp,
    Symbol,
    BuySource,
    BuyPrice,
    SellSource,
    SellPrice,
    ProfitPct,
}

impl SortField {
    pub const ALL: [SortField; 7] = [
        SortField::Timestamp,
        SortField::Symbol,
        SortField::BuySource,
        SortField::BuyPrice,
        SortField::SellSource,
        SortField::SellPrice,
        SortField::ProfitPct,
    ];

    /// Next column in table order, wrapping
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            SortField::Timestamp => "Time",
            SortField::Symbol => "Symbol",
            SortField::BuySource => "Buy",
            SortField::BuyPrice => "Buy Price",
            SortField::SellSource => "Sell",
            SortField::SellPrice => "Sell Price",
            SortField::ProfitPct => "Profit %",
        }
    }

    fn key(self, opportunity: &Opportunity) -> SortKey {
        match self {
            SortField::Timestamp => SortKey::Instant(opportunity.timestamp),
            SortField::Symbol => SortKey::text(&opportunity.symbol),
            SortField::BuySource => SortKey::text(&opportunity.buy_source),
            SortField::BuyPrice => SortKey::Number(opportunity.buy_price),
            SortField::SellSource => SortKey::text(&opportunity.sell_source),
            SortField::SellPrice => SortKey::Number(opportunity.sell_price),
            SortField::ProfitPct => SortKey::Number(opportunity.profit_pct),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// Tagged comparison key; every field of one column yields the same variant
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Instant(i64),
    Number(f64),
    Text(String),
}

impl SortKey {
    fn text(value: &str) -> Self {
        SortKey::Text(value.to_lowercase())
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Instant(a), SortKey::Instant(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Bounded most-recent-first opportunity list
#[derive(Debug, Clone)]
pub struct OpportunityLedger {
    entries: VecDeque<Opportunity>,
    max_entries: usize,
}

impl OpportunityLedger {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries: max_entries.max(1),
        }
    }

    /// Assign an id, insert at the head and evict from the tail
    pub fn record(&mut self, payload: OpportunityPayload) -> &Opportunity {
        self.entries.push_front(Opportunity::from_payload(payload));
        self.entries.truncate(self.max_entries);
        &self.entries[0]
    }

    /// Entries with `profit_pct >= min_profit_pct` whose buy and sell sources
    /// both pass `is_enabled`, stably sorted by `field`
    pub fn query<F>(
        &self,
        min_profit_pct: f64,
        is_enabled: F,
        field: SortField,
        direction: SortDirection,
    ) -> Vec<&Opportunity>
    where
        F: Fn(&str) -> bool,
    {
        let mut rows: Vec<(SortKey, &Opportunity)> = self
            .entries
            .iter()
            .filter(|o| o.profit_pct >= min_profit_pct)
            .filter(|o| is_enabled(&o.buy_source) && is_enabled(&o.sell_source))
            .map(|o| (field.key(o), o))
            .collect();

        // sort_by is stable: ties keep ledger order
        rows.sort_by(|(a, _), (b, _)| match direction {
            SortDirection::Ascending => a.compare(b),
            SortDirection::Descending => b.compare(a),
        });

        rows.into_iter().map(|(_, o)| o).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Opportunity> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}
