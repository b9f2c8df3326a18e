//! Chart view abstraction - base trait for chart regions

use egui::Ui;
use serde_json::Value;
use uuid::Uuid;

use crate::ViewContext;

/// Unique identifier for a chart view
pub type ChartViewId = Uuid;

/// Base trait for chart regions hosted by the application
pub trait ChartView: Send + Sync {
    /// Get the unique ID of this view
    fn id(&self) -> ChartViewId;

    /// Get the title of this view
    fn title(&self) -> &str;

    /// Draw the UI
    fn ui(&mut self, ctx: &ViewContext, ui: &mut Ui);

    /// Save configuration
    fn save_config(&self) -> Value;

    /// Load configuration
    fn load_config(&mut self, config: Value);

    /// Get as any for downcasting
    fn as_any(&self) -> &dyn std::any::Any;

    /// Get as any mut for downcasting
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
