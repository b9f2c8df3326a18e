//! One-shot visibility detection for chart regions
//!
//! A detector reports exactly once when its bound region becomes visible.
//! It is a pure state machine: an adapter that knows the host's viewport
//! geometry feeds it [`Intersection`] measurements (the egui adapter lives
//! in the views crate). A host with no viewport information constructs
//! detectors with `disabled = true` and gets immediate visibility instead.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an observed screen region.
pub type RegionId = Uuid;

/// Options controlling when a region counts as visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityOptions {
    /// Fraction of the region that must overlap the viewport to trigger.
    pub threshold: f32,

    /// Extra distance around the viewport that counts as visible, in points.
    /// Loading starts slightly before the region is actually on screen.
    pub root_margin: f32,

    /// Skip observation entirely and report visible immediately.
    pub disabled: bool,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            root_margin: 100.0,
            disabled: false,
        }
    }
}

/// Observation lifecycle for one region. `Triggered` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityPhase {
    Unobserved,
    Observing,
    Triggered,
}

/// A single intersection measurement for an observed region.
///
/// Adapters only deliver measurements with positive overlap; a measurement
/// with `ratio == 0.0` never triggers.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    pub region: RegionId,
    /// Fraction of the region overlapping the (margin-expanded) viewport.
    pub ratio: f32,
}

type VisibleCallback = Box<dyn FnOnce() + Send + Sync>;

/// One-shot visibility detector.
///
/// A detector that is never bound stays `Unobserved` indefinitely; that is a
/// caller contract, not an error condition, and nothing times out.
pub struct VisibilityDetector {
    options: VisibilityOptions,
    phase: VisibilityPhase,
    bound: Option<RegionId>,
    on_visible: Option<VisibleCallback>,
}

impl VisibilityDetector {
    /// Create a detector with no visibility callback.
    pub fn new(options: VisibilityOptions) -> Self {
        Self::with_callback(options, None)
    }

    /// Create a detector that invokes `on_visible` exactly once at the
    /// transition to `Triggered`. A detector constructed with
    /// `disabled = true` triggers immediately, before this returns.
    pub fn with_callback(options: VisibilityOptions, on_visible: Option<VisibleCallback>) -> Self {
        let mut detector = Self {
            options,
            phase: VisibilityPhase::Unobserved,
            bound: None,
            on_visible,
        };
        if detector.options.disabled {
            detector.trigger();
        }
        detector
    }

    pub fn options(&self) -> &VisibilityOptions {
        &self.options
    }

    pub fn phase(&self) -> VisibilityPhase {
        self.phase
    }

    /// True from the first qualifying intersection onward; never reverts.
    pub fn has_triggered(&self) -> bool {
        self.phase == VisibilityPhase::Triggered
    }

    /// Whether the region counts as visible. Becomes true only as a result
    /// of the first qualifying intersection (or immediately when disabled).
    pub fn is_visible(&self) -> bool {
        self.has_triggered()
    }

    /// Start (or re-establish) observation of `region`.
    ///
    /// Re-binding while `Observing` swaps the observed region without a
    /// second trigger; measurements for the old region are ignored from
    /// then on. Binding after the trigger is a no-op.
    pub fn bind(&mut self, region: RegionId) {
        match self.phase {
            VisibilityPhase::Triggered => {}
            VisibilityPhase::Unobserved | VisibilityPhase::Observing => {
                self.bound = Some(region);
                self.phase = VisibilityPhase::Observing;
            }
        }
    }

    /// Feed one intersection measurement.
    pub fn observe(&mut self, event: Intersection) {
        if self.phase != VisibilityPhase::Observing {
            return;
        }
        if self.bound != Some(event.region) {
            return;
        }
        if event.ratio > 0.0 && event.ratio >= self.options.threshold {
            self.trigger();
        }
    }

    fn trigger(&mut self) {
        self.phase = VisibilityPhase::Triggered;
        // Disengage: no further measurements are considered.
        self.bound = None;
        tracing::debug!("region became visible");
        if let Some(on_visible) = self.on_visible.take() {
            on_visible();
        }
    }
}
