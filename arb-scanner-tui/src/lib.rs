/// Arbitrage Scanner TUI - Shared Library
///
/// Streaming pipeline behind the `arb-scanner` terminal dashboard:
/// - Connection manager with exponential backoff reconnects
/// - Message batcher that drains inbound events on a fixed cadence
/// - Source registry with persisted per-source visibility
/// - Bounded per-source history with forward-filled time alignment
/// - Opportunity ledger, spread matrix and per-view render throttling
pub mod dashboard;
pub mod shared;

// Re-export commonly used types for convenience
pub use shared::types::{
    parse_event, CvdUpdate, InboundEvent, OpportunityPayload, PriceUpdate, SpreadsPayload,
    StreamEvent,
};

pub use shared::config::{BackoffPolicy, ConnectionConfig, RenderIntervals, ScannerConfig};
pub use shared::error::ScannerError;
pub use shared::websocket::{ConnectionManager, ConnectionStatus};

pub use shared::batcher::{FlushBatch, MessageBatcher};
pub use shared::history::{AlignedSeries, TimeSeriesStore};
pub use shared::ledger::{Opportunity, OpportunityLedger, SortDirection, SortField};
pub use shared::preferences::{EnabledSourceSet, FileStore, MemoryStore, PreferenceStore};
pub use shared::registry::{SourceRegistry, SourceSnapshot};
pub use shared::scheduler::{RenderScheduler, ViewKind};
pub use shared::spreads::{CellClass, SpreadGrid, SpreadMatrixBuilder};

pub use dashboard::{Dashboard, Now};
