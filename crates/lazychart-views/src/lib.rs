//! Chart views for the lazy rendering pipeline
//!
//! Composes the core primitives (visibility detection, chunked reveal,
//! idle scheduling) with egui_plot into self-contained chart regions that
//! stay inert until scrolled into view.

mod chart_view;
mod intersect;
mod lazy_chart;

pub use chart_view::{ChartView, ChartViewId};
pub use intersect::intersection_ratio;
pub use lazy_chart::{ChartBackend, LazyChartConfig, LazyChartView, PlotSample};

use std::sync::Arc;

use lazychart_core::IdleScheduler;

/// Context passed to views during rendering
#[derive(Clone)]
pub struct ViewContext {
    /// Idle scheduler shared by every chart region; the host pumps it once
    /// per frame.
    pub scheduler: Arc<IdleScheduler>,

    /// Whether viewport intersection information is available. Without it,
    /// charts skip visibility gating and load eagerly.
    pub viewport_observation: bool,
}
