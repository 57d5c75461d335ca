//! Arbitrage dashboard: pipeline composition, view models and terminal widgets

pub mod state;
pub mod views;
pub mod widget;

pub use state::{Dashboard, Now};
pub use views::{ChartMetric, ChartView, FpsCounter, OpportunityRow, SourceRow};
pub use widget::{render_dashboard, FrameContext};
