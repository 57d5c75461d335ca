//! Render Scheduler: per-view throttle that coalesces refresh requests.
//!
//! Each view is either idle or pending with an armed deadline. Requests made
//! while pending are absorbed; forced refreshes skip the timer entirely.

use crate::shared::config::RenderIntervals;
use std::time::{Duration, Instant};

/// A downstream view that is recomputed on refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Chart,
    SourceList,
    OpportunityTable,
    SpreadMatrix,
}

impl ViewKind {
    pub const ALL: [ViewKind; 4] = [
        ViewKind::Chart,
        ViewKind::SourceList,
        ViewKind::OpportunityTable,
        ViewKind::SpreadMatrix,
    ];

    fn index(self) -> usize {
        match self {
            ViewKind::Chart => 0,
            ViewKind::SourceList => 1,
            ViewKind::OpportunityTable => 2,
            ViewKind::SpreadMatrix => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ViewState {
    #[default]
    Idle,
    Pending(Instant),
}

#[derive(Debug, Clone)]
pub struct RenderScheduler {
    intervals: RenderIntervals,
    states: [ViewState; 4],
    refreshes: [u64; 4],
}

impl RenderScheduler {
    pub fn new(intervals: RenderIntervals) -> Self {
        Self {
            intervals,
            states: [ViewState::Idle; 4],
            refreshes: [0; 4],
        }
    }

    pub fn interval(&self, view: ViewKind) -> Duration {
        match view {
            ViewKind::Chart => self.intervals.chart,
            ViewKind::SourceList => self.intervals.source_list,
            ViewKind::OpportunityTable => self.intervals.opportunity_table,
            ViewKind::SpreadMatrix => self.intervals.spread_matrix,
        }
    }

    /// Ask for a throttled refresh. Returns `true` if this call armed the timer,
    /// `false` if a refresh was already pending and the request was absorbed.
    pub fn request(&mut self, view: ViewKind, now: Instant) -> bool {
        let index = view.index();
        match self.states[index] {
            ViewState::Pending(_) => false,
            ViewState::Idle => {
                self.states[index] = ViewState::Pending(now + self.interval(view));
                true
            }
        }
    }

    pub fn is_pending(&self, view: ViewKind) -> bool {
        matches!(self.states[view.index()], ViewState::Pending(_))
    }

    pub fn deadline(&self, view: ViewKind) -> Option<Instant> {
        match self.states[view.index()] {
            ViewState::Pending(at) => Some(at),
            ViewState::Idle => None,
        }
    }

    /// Earliest armed deadline across every view
    pub fn next_deadline(&self) -> Option<Instant> {
        ViewKind::ALL.iter().filter_map(|v| self.deadline(*v)).min()
    }

    /// Views whose deadline has passed, returned to idle and counted as refreshed
    pub fn take_due(&mut self, now: Instant) -> Vec<ViewKind> {
        let due: Vec<ViewKind> = ViewKind::ALL
            .into_iter()
            .filter(|v| self.deadline(*v).is_some_and(|at| now >= at))
            .collect();
        for view in &due {
            self.complete(*view);
        }
        due
    }

    /// Bypass the throttle: any pending timer for `view` is disarmed
    pub fn force(&mut self, view: ViewKind) {
        self.complete(view);
    }

    /// Bypass the throttle for every view (source toggle, symbol change)
    pub fn force_all(&mut self) -> [ViewKind; 4] {
        for view in ViewKind::ALL {
            self.complete(view);
        }
        ViewKind::ALL
    }

    /// How many times `view` has been refreshed, forced or throttled
    pub fn refresh_count(&self, view: ViewKind) -> u64 {
        self.refreshes[view.index()]
    }

    fn complete(&mut self, view: ViewKind) {
        let index = view.index();
        self.states[index] = ViewState::Idle;
        self.refreshes[index] += 1;
    }
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(RenderIntervals::default())
    }
}
