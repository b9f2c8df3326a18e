//! Chunked reveal of large datasets
//!
//! A feeder incrementally exposes a growing prefix of an immutable dataset,
//! one chunk per idle-scheduler step, so the event loop stays responsive
//! while ten-thousand-point datasets stream into a renderer.

mod feeder;
mod policy;
mod progress;
mod subscriber;

pub use feeder::{ChunkedFeeder, RevealSnapshot};
pub use policy::{ChunkingPolicy, PolicyError};
pub use progress::{RevealPhase, RevealProgress};
pub use subscriber::RevealSubscriber;
