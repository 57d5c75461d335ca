//! Message batcher between the connection and the dashboard state.
//!
//! Inbound events are queued and drained on a fixed cadence so render work is
//! bounded per flush interval instead of per message.

use crate::shared::types::{InboundEvent, OpportunityPayload, SpreadsPayload, StreamEvent};
use std::time::{Duration, Instant};

/// Spread snapshot together with its receipt time
#[derive(Debug, Clone, PartialEq)]
pub struct StampedSpreads {
    pub received_at_ms: i64,
    pub payload: SpreadsPayload,
}

/// One drained queue, partitioned by event kind in dispatch order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FlushBatch {
    /// `prices` snapshots and `price_update` quotes, in arrival order
    pub prices: Vec<InboundEvent>,
    /// Arbitrage opportunities, in arrival order (each is appended individually)
    pub opportunities: Vec<OpportunityPayload>,
    /// Latest spread snapshot per symbol; older snapshots in the same flush are dropped
    pub spreads: Vec<StampedSpreads>,
    /// Everything else (`cvd_update`, unknown kinds), in arrival order
    pub others: Vec<InboundEvent>,
    /// How many spread snapshots were superseded within this flush
    pub superseded_spreads: usize,
}

impl FlushBatch {
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
            && self.opportunities.is_empty()
            && self.spreads.is_empty()
            && self.others.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
            + self.opportunities.len()
            + self.spreads.len()
            + self.others.len()
            + self.superseded_spreads
    }

    fn push(&mut self, inbound: InboundEvent) {
        let received_at_ms = inbound.received_at_ms;
        match inbound.event {
            StreamEvent::Prices { .. } | StreamEvent::PriceUpdate(_) => self.prices.push(inbound),
            StreamEvent::Arbitrage { opportunity } => self.opportunities.push(opportunity),
            StreamEvent::Spreads(payload) => {
                if let Some(index) = self
                    .spreads
                    .iter()
                    .position(|s| s.payload.symbol == payload.symbol)
                {
                    self.spreads.remove(index);
                    self.superseded_spreads += 1;
                }
                self.spreads.push(StampedSpreads {
                    received_at_ms,
                    payload,
                });
            }
            StreamEvent::CvdUpdate(_) | StreamEvent::Unknown => self.others.push(inbound),
        }
    }
}

/// Fixed-cadence event queue
#[derive(Debug)]
pub struct MessageBatcher {
    queue: Vec<InboundEvent>,
    flush_delay: Duration,
    flush_at: Option<Instant>,
}

impl MessageBatcher {
    pub fn new(flush_delay: Duration) -> Self {
        Self {
            queue: Vec::new(),
            flush_delay,
            flush_at: None,
        }
    }

    /// Queue an event. Returns `true` when this call armed a new flush deadline.
    pub fn enqueue(&mut self, event: InboundEvent, now: Instant) -> bool {
        self.queue.push(event);
        if self.flush_at.is_none() {
            self.flush_at = Some(now + self.flush_delay);
            return true;
        }
        false
    }

    pub fn flush_deadline(&self) -> Option<Instant> {
        self.flush_at
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.flush_at.is_some_and(|at| now >= at)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drain the whole queue in one pass and partition it
    pub fn flush(&mut self) -> FlushBatch {
        self.flush_at = None;
        let mut batch = FlushBatch::default();
        for inbound in self.queue.drain(..) {
            batch.push(inbound);
        }
        batch
    }
}
