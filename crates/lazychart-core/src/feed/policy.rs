//! Chunking configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from constructing a chunking policy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("chunk size must be at least 1")]
    ZeroChunkSize,
    #[error("idle timeout must be greater than zero")]
    ZeroIdleTimeout,
}

/// How a dataset is cut into reveal steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingPolicy {
    chunk_size: usize,
    threshold: usize,
    idle_timeout: Duration,
}

impl ChunkingPolicy {
    /// Validate and build a policy.
    pub fn new(
        chunk_size: usize,
        threshold: usize,
        idle_timeout: Duration,
    ) -> Result<Self, PolicyError> {
        if chunk_size == 0 {
            return Err(PolicyError::ZeroChunkSize);
        }
        if idle_timeout.is_zero() {
            return Err(PolicyError::ZeroIdleTimeout);
        }
        Ok(Self {
            chunk_size,
            threshold,
            idle_timeout,
        })
    }

    /// Points revealed per scheduling step.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Datasets at or below this length are revealed in one step.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Bounded wait for each scheduling step; the step is forced to run
    /// after this much time even without confirmed idle time.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Whether a dataset of `len` points skips incremental reveal.
    pub fn bypasses(&self, len: usize) -> bool {
        len <= self.threshold
    }
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        // Generic-feeder tuning; callers supply their own policy when the
        // chart type wants larger chunks.
        Self {
            chunk_size: 500,
            threshold: 1000,
            idle_timeout: Duration::from_millis(100),
        }
    }
}
