/// Core data types for stream events
///
/// These types match the JSON message format broadcast by the scanner
/// backend at ws://localhost:8080/ws. Every message carries a `type`
/// discriminator; unknown discriminators decode to [`StreamEvent::Unknown`].
use crate::shared::error::ScannerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `symbol -> source -> price`
pub type PriceTable = BTreeMap<String, BTreeMap<String, f64>>;

/// `buy source -> sell source -> spread percent`
pub type SpreadTable = BTreeMap<String, BTreeMap<String, f64>>;

/// Inbound stream event, discriminated by the `type` field
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Bulk snapshot of the latest price per symbol and source
    Prices { prices: PriceTable },
    /// Incremental quote from a single source
    PriceUpdate(PriceUpdate),
    /// Cross-source arbitrage detected by the backend
    Arbitrage { opportunity: OpportunityPayload },
    /// Pairwise spread snapshot for one symbol
    Spreads(SpreadsPayload),
    /// Cumulative volume delta sample from a single source
    CvdUpdate(CvdUpdate),
    /// Any discriminator this client does not understand (eg/ "welcome")
    #[serde(other)]
    Unknown,
}

/// Incremental quote
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PriceUpdate {
    pub symbol: String,
    /// Source name (the backend spells this `exchange`)
    #[serde(alias = "exchange")]
    pub source: String,
    pub price: f64,
    /// Milliseconds since epoch, receipt time is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// Arbitrage opportunity as reported by the backend
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpportunityPayload {
    pub symbol: String,
    #[serde(alias = "buy_exchange")]
    pub buy_source: String,
    pub buy_price: f64,
    #[serde(alias = "sell_exchange")]
    pub sell_source: String,
    pub sell_price: f64,
    pub profit_pct: f64,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

/// Pairwise spread snapshot
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpreadsPayload {
    pub symbol: String,
    #[serde(default)]
    pub spreads: SpreadTable,
    #[serde(default)]
    pub prices: BTreeMap<String, f64>,
}

/// Cumulative volume delta sample
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CvdUpdate {
    pub symbol: String,
    #[serde(alias = "exchange")]
    pub source: String,
    pub cvd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// Partition used by the batcher when dispatching a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Price,
    Opportunity,
    Spread,
    Other,
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StreamEvent::Prices { .. } | StreamEvent::PriceUpdate(_) => EventKind::Price,
            StreamEvent::Arbitrage { .. } => EventKind::Opportunity,
            StreamEvent::Spreads(_) => EventKind::Spread,
            StreamEvent::CvdUpdate(_) | StreamEvent::Unknown => EventKind::Other,
        }
    }
}

/// A decoded event stamped with its wall-clock receipt time
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Milliseconds since epoch at which the frame was read off the socket
    pub received_at_ms: i64,
    pub event: StreamEvent,
}

impl InboundEvent {
    pub fn new(event: StreamEvent, received_at_ms: i64) -> Self {
        Self {
            received_at_ms,
            event,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

/// Decode one text frame into a [`StreamEvent`]
pub fn parse_event(text: &str) -> Result<StreamEvent, ScannerError> {
    Ok(serde_json::from_str(text)?)
}
