//! Reveal subscriber trait

use super::RevealProgress;

/// Trait for components that need to respond to reveal progress changes.
pub trait RevealSubscriber: Send + Sync {
    /// Called after every reveal step, activation, and completion.
    fn on_reveal_change(&self, progress: &RevealProgress);
}
