//! Lazy chart demo application
//!
//! Stacks several independent lazy chart regions in a scroll area. Regions
//! below the fold stay inert placeholders until scrolled near the viewport;
//! large datasets then stream in chunk by chunk during spare frame time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use anyhow::Result;
use eframe::egui;
use tracing::info;

use lazychart_core::{ChunkingPolicy, FramePulse, IdleCapability, IdleScheduler};
use lazychart_views::{
    ChartView, ChartViewId, LazyChartConfig, LazyChartView, PlotSample, ViewContext,
};

mod demo;

/// Target frame period; whatever a frame leaves unused becomes the idle
/// budget for chunk reveals.
const FRAME_BUDGET: Duration = Duration::from_millis(16);

/// Index of the view whose dataset the swap button replaces.
const LIVE_FEED_VIEW: usize = 3;

/// Main application state
struct LazyChartApp {
    /// Context shared between all chart views
    view_context: ViewContext,

    /// Chart regions, top to bottom
    views: Vec<Box<dyn ChartView>>,

    /// Named demo datasets
    datasets: AHashMap<String, Arc<[PlotSample]>>,
}

impl LazyChartApp {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        // The frame loop measures spare time per frame, so the scheduler
        // runs with native idle capability.
        let scheduler = Arc::new(IdleScheduler::new(IdleCapability::Native));
        let view_context = ViewContext {
            scheduler,
            viewport_observation: true,
        };

        let mut datasets: AHashMap<String, Arc<[PlotSample]>> = AHashMap::new();
        datasets.insert("telemetry".to_string(), demo::waveform(12_000, 3.0, 0.15));
        datasets.insert("spectrum".to_string(), demo::waveform(8_000, 11.0, 0.4));
        datasets.insert("summary".to_string(), demo::waveform(500, 1.0, 0.05));
        datasets.insert("live".to_string(), demo::waveform(10_000, 5.0, 0.25));
        datasets.insert("live-replacement".to_string(), demo::waveform(5, 1.0, 0.0));
        datasets.insert("offline".to_string(), demo::empty());

        let mut views: Vec<Box<dyn ChartView>> = Vec::new();

        let telemetry = LazyChartView::new(
            ChartViewId::new_v4(),
            "Station telemetry (12k points)".to_string(),
            &view_context,
            LazyChartConfig {
                chunking: ChunkingPolicy::new(1000, 2000, Duration::from_millis(100)).unwrap(),
                ..LazyChartConfig::default()
            },
        );
        telemetry.set_data(datasets["telemetry"].clone());
        telemetry.set_on_reveal_complete(|| info!("telemetry reveal complete"));
        views.push(Box::new(telemetry));

        let spectrum = LazyChartView::new(
            ChartViewId::new_v4(),
            "Sensor spectrum (8k points)".to_string(),
            &view_context,
            LazyChartConfig {
                // Scatter-style data tolerates larger chunks.
                chunking: ChunkingPolicy::new(2000, 2000, Duration::from_millis(120)).unwrap(),
                color: [255, 127, 14],
                ..LazyChartConfig::default()
            },
        );
        spectrum.set_data(datasets["spectrum"].clone());
        views.push(Box::new(spectrum));

        let summary = LazyChartView::new(
            ChartViewId::new_v4(),
            "Shift summary (500 points, bypasses chunking)".to_string(),
            &view_context,
            LazyChartConfig {
                color: [44, 160, 44],
                ..LazyChartConfig::default()
            },
        );
        summary.set_data(datasets["summary"].clone());
        views.push(Box::new(summary));

        let live = LazyChartView::new(
            ChartViewId::new_v4(),
            "Live feed (swap mid-reveal to test cancellation)".to_string(),
            &view_context,
            LazyChartConfig {
                chunking: ChunkingPolicy::new(1000, 2000, Duration::from_millis(100)).unwrap(),
                color: [214, 39, 40],
                ..LazyChartConfig::default()
            },
        );
        live.set_data(datasets["live"].clone());
        views.push(Box::new(live));

        let offline = LazyChartView::new(
            ChartViewId::new_v4(),
            "Offline sensor (no data)".to_string(),
            &view_context,
            LazyChartConfig::default(),
        );
        offline.set_data(datasets["offline"].clone());
        views.push(Box::new(offline));

        Self {
            view_context,
            views,
            datasets,
        }
    }

    /// Replace the live feed's dataset while its reveal may be in flight.
    fn swap_live_feed(&mut self) {
        let Some(replacement) = self.datasets.get("live-replacement") else {
            return;
        };
        if let Some(view) = self
            .views
            .get_mut(LIVE_FEED_VIEW)
            .and_then(|view| view.as_any_mut().downcast_mut::<LazyChartView>())
        {
            info!("swapping live feed dataset mid-reveal");
            view.set_data(replacement.clone());
        }
    }
}

impl eframe::App for LazyChartApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let frame_started = Instant::now();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Lazy charts");
                ui.separator();
                if ui.button("Swap live feed dataset").clicked() {
                    self.swap_live_feed();
                }
                ui.separator();
                ui.label(format!(
                    "{} idle tasks pending",
                    self.view_context.scheduler.pending()
                ));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                for view in &mut self.views {
                    ui.add_space(12.0);
                    view.ui(&self.view_context, ui);
                }
                ui.add_space(12.0);
            });
        });

        // Whatever is left of the frame budget is the idle time chunk
        // reveals may consume this turn.
        let idle_budget = FRAME_BUDGET.checked_sub(frame_started.elapsed());
        self.view_context.scheduler.drive(FramePulse {
            now: Instant::now(),
            idle_budget,
        });
        if self.view_context.scheduler.pending() > 0 {
            ctx.request_repaint();
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting lazy chart demo");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([700.0, 500.0]),
        default_theme: eframe::Theme::Dark,
        ..Default::default()
    };

    eframe::run_native(
        "Lazy Charts",
        options,
        Box::new(|cc| Box::new(LazyChartApp::new(cc))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run app: {}", e))?;

    Ok(())
}
