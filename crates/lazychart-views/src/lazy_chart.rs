//! Lazy chart container
//!
//! A chart region that renders as an inert placeholder until it scrolls
//! near the viewport, then streams its dataset into an egui_plot surface
//! chunk by chunk, with a progress overlay while incomplete.

use std::sync::Arc;

use egui::{vec2, Align2, Color32, FontId, Rect, Rounding, Sense, Ui};
use egui_plot::{Line, Plot, PlotPoints, Points};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use lazychart_core::{
    ChunkedFeeder, ChunkingPolicy, Intersection, RegionId, RevealPhase, RevealProgress,
    RevealSnapshot, VisibilityDetector, VisibilityOptions,
};

use crate::{intersection_ratio, ChartView, ChartViewId, ViewContext};

/// A single chart sample: x then y.
pub type PlotSample = (f64, f64);

/// Which egui_plot drawing path a chart uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartBackend {
    /// Interactive polyline with full pan/zoom fidelity.
    Vector,
    /// Plain point markers with interaction disabled, tuned for draw
    /// throughput on large datasets.
    Raster,
}

/// Configuration for a lazy chart region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LazyChartConfig {
    /// Placeholder and plot height in points
    pub height: f32,

    /// Chunked reveal tuning
    pub chunking: ChunkingPolicy,

    /// Visibility gating tuning
    pub visibility: VisibilityOptions,

    /// Datasets larger than this prefer the raster drawing path
    pub prefer_raster_above: usize,

    /// Whether to overlay reveal progress while incomplete
    pub show_progress: bool,

    /// Whether to show grid
    pub show_grid: bool,

    /// Series color (RGB)
    pub color: [u8; 3],
}

impl Default for LazyChartConfig {
    fn default() -> Self {
        Self {
            height: 260.0,
            chunking: ChunkingPolicy::default(),
            visibility: VisibilityOptions::default(),
            prefer_raster_above: 5000,
            show_progress: true,
            show_grid: true,
            color: [31, 119, 180],
        }
    }
}

impl LazyChartConfig {
    /// Drawing path for a dataset of `len` points. Performance heuristic
    /// only; both paths draw the same revealed prefix.
    pub fn backend_for(&self, len: usize) -> ChartBackend {
        if len > self.prefer_raster_above {
            ChartBackend::Raster
        } else {
            ChartBackend::Vector
        }
    }
}

/// Memoized egui_plot input, keyed on the feeder activation and reveal
/// extent so scrolling never rebuilds an unchanged series.
struct CachedSeries {
    generation: u64,
    revealed: usize,
    points: Vec<[f64; 2]>,
}

impl CachedSeries {
    fn empty() -> Self {
        Self {
            generation: 0,
            revealed: 0,
            points: Vec::new(),
        }
    }

    /// Bring the cache in line with `snapshot`. Growth within the same
    /// activation extends with the newly revealed slice; anything else
    /// rebuilds from the prefix.
    fn sync(&mut self, snapshot: &RevealSnapshot<PlotSample>) {
        if self.generation == snapshot.generation() {
            if self.revealed == snapshot.revealed() {
                return;
            }
            if self.revealed < snapshot.revealed() {
                let fresh = &snapshot.as_slice()[self.revealed..];
                self.points.extend(fresh.iter().map(|&(x, y)| [x, y]));
                self.revealed = snapshot.revealed();
                return;
            }
        }
        self.generation = snapshot.generation();
        self.revealed = snapshot.revealed();
        self.points = snapshot.as_slice().iter().map(|&(x, y)| [x, y]).collect();
    }
}

/// A chart region that defers all work until visible
pub struct LazyChartView {
    id: ChartViewId,
    title: String,
    pub config: LazyChartConfig,

    // State
    region: RegionId,
    detector: VisibilityDetector,
    feeder: ChunkedFeeder<PlotSample>,
    cached: CachedSeries,
}

impl LazyChartView {
    /// Create a new lazy chart view.
    ///
    /// When the context reports no viewport observation, the view degrades
    /// to eager loading: the detector is constructed disabled and the feed
    /// starts immediately.
    pub fn new(
        id: ChartViewId,
        title: String,
        ctx: &ViewContext,
        config: LazyChartConfig,
    ) -> Self {
        let feeder = ChunkedFeeder::new(ctx.scheduler.clone(), config.chunking.clone());

        let mut visibility = config.visibility.clone();
        if !ctx.viewport_observation {
            visibility.disabled = true;
        }
        // The feed begins the moment the region becomes visible.
        let feed = feeder.clone();
        let detector = VisibilityDetector::with_callback(
            visibility,
            Some(Box::new(move || feed.set_enabled(true))),
        );

        Self {
            id,
            title,
            config,
            region: Uuid::new_v4(),
            detector,
            feeder,
            cached: CachedSeries::empty(),
        }
    }

    /// Replace the dataset. A new allocation restarts the reveal; the
    /// caller's array is never mutated.
    pub fn set_data(&self, data: Arc<[PlotSample]>) {
        self.feeder.set_dataset(data);
    }

    /// Current reveal progress.
    pub fn progress(&self) -> RevealProgress {
        self.feeder.progress()
    }

    pub fn has_triggered(&self) -> bool {
        self.detector.has_triggered()
    }

    /// Invoked exactly once per activation when the reveal completes, e.g.
    /// for analytics or chained lazy loads.
    pub fn set_on_reveal_complete(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.feeder.set_on_complete(callback);
    }

    fn placeholder_ui(&mut self, ui: &mut Ui) {
        let desired = vec2(ui.available_width(), self.config.height);
        let (rect, _response) = ui.allocate_exact_size(desired, Sense::hover());

        self.detector.bind(self.region);
        let ratio = intersection_ratio(rect, ui.clip_rect(), self.detector.options().root_margin);
        if ratio > 0.0 {
            self.detector.observe(Intersection {
                region: self.region,
                ratio,
            });
        }

        let painter = ui.painter();
        painter.rect_filled(rect, Rounding::same(4.0), ui.visuals().extreme_bg_color);
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            &self.title,
            FontId::proportional(14.0),
            ui.visuals().weak_text_color(),
        );

        if self.detector.has_triggered() {
            // Show the chart without waiting for further scroll input.
            ui.ctx().request_repaint();
        }
    }

    fn chart_ui(&mut self, ui: &mut Ui) {
        let snapshot = self.feeder.snapshot();
        self.cached.sync(&snapshot);

        let backend = self.config.backend_for(snapshot.total());
        let color = Color32::from_rgb(self.config.color[0], self.config.color[1], self.config.color[2]);

        let mut plot = Plot::new(format!("{:?}", self.id))
            .height(self.config.height)
            .show_grid(self.config.show_grid);
        if backend == ChartBackend::Raster {
            plot = plot
                .allow_scroll(false)
                .allow_zoom(false)
                .allow_drag(false)
                .allow_boxed_zoom(false);
        }

        let points = PlotPoints::new(self.cached.points.clone());
        let response = plot.show(ui, |plot_ui| match backend {
            ChartBackend::Vector => {
                plot_ui.line(Line::new(points).color(color).width(1.5).name(&self.title));
            }
            ChartBackend::Raster => {
                plot_ui.points(Points::new(points).color(color).radius(1.0).name(&self.title));
            }
        });

        let progress = snapshot.progress();
        if progress.phase != RevealPhase::Complete
            && snapshot.total() > self.config.chunking.threshold()
        {
            if self.config.show_progress {
                self.progress_overlay(ui, response.response.rect, &progress);
            }
            // Keep the frame loop pumping until the reveal drains.
            ui.ctx().request_repaint();
        }
    }

    fn progress_overlay(&self, ui: &Ui, rect: Rect, progress: &RevealProgress) {
        let band = Rect::from_min_size(rect.min, vec2(rect.width(), 22.0));
        let painter = ui.painter();
        painter.rect_filled(band, Rounding::same(0.0), Color32::from_black_alpha(140));
        let label = format!(
            "loading {} / {} ({:.0}%)",
            progress.revealed,
            progress.total,
            progress.percent()
        );
        painter.text(
            band.center(),
            Align2::CENTER_CENTER,
            label,
            FontId::proportional(12.0),
            Color32::WHITE,
        );
    }
}

impl ChartView for LazyChartView {
    fn id(&self) -> ChartViewId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn ui(&mut self, _ctx: &ViewContext, ui: &mut Ui) {
        if !self.detector.has_triggered() {
            // Inert placeholder: no series build, no plot widget.
            self.placeholder_ui(ui);
            return;
        }
        self.chart_ui(ui);
    }

    fn save_config(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or(Value::Null)
    }

    fn load_config(&mut self, config: Value) {
        match serde_json::from_value::<LazyChartConfig>(config) {
            Ok(config) => {
                self.feeder.set_policy(config.chunking.clone());
                // Visibility options apply to newly constructed views; a
                // triggered detector never reverts.
                self.config = config;
            }
            Err(err) => tracing::warn!(%err, "ignoring malformed chart config"),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
