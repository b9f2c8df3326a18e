//! Core functionality for the lazy chart pipeline
//!
//! This crate provides the UI-toolkit-free primitives for feeding large
//! datasets to a rendering surface without blocking the event loop:
//! idle-time scheduling, one-shot visibility detection, and chunked reveal.

pub mod feed;
pub mod schedule;
pub mod visibility;

// Re-export commonly used types
pub use feed::{
    ChunkedFeeder, ChunkingPolicy, PolicyError, RevealPhase, RevealProgress,
    RevealSnapshot, RevealSubscriber,
};
pub use schedule::{FramePulse, IdleCapability, IdleDeadline, IdleScheduler, TaskHandle};
pub use visibility::{
    Intersection, RegionId, VisibilityDetector, VisibilityOptions, VisibilityPhase,
};
