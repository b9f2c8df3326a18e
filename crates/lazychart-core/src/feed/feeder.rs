//! Chunked data feeder implementation

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{ChunkingPolicy, RevealPhase, RevealProgress, RevealSubscriber};
use crate::schedule::{IdleDeadline, IdleScheduler, TaskHandle};

type CompleteCallback = Arc<dyn Fn() + Send + Sync>;

/// Feed state stored internally.
struct FeedState<T> {
    dataset: Arc<[T]>,
    policy: ChunkingPolicy,
    enabled: bool,
    revealed: usize,
    phase: RevealPhase,
    /// Activation counter. A scheduled step carries the generation it was
    /// armed under and returns without touching state when it no longer
    /// matches, so a racing activation can never interleave stale chunks.
    generation: u64,
    pending: Option<TaskHandle>,
    complete_notified: bool,
}

struct FeederShared<T> {
    scheduler: Arc<IdleScheduler>,
    state: Mutex<FeedState<T>>,
    subscribers: Mutex<Vec<Weak<dyn RevealSubscriber>>>,
    on_complete: Mutex<Option<CompleteCallback>>,
}

/// Immutable view of the reveal at one moment.
///
/// `as_slice` is always a contiguous, order-preserving prefix of the
/// dataset; chunks are never revealed out of order and never skipped.
pub struct RevealSnapshot<T> {
    data: Arc<[T]>,
    revealed: usize,
    generation: u64,
    phase: RevealPhase,
}

impl<T> Clone for RevealSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            revealed: self.revealed,
            generation: self.generation,
            phase: self.phase,
        }
    }
}

impl<T> RevealSnapshot<T> {
    /// The revealed prefix.
    pub fn as_slice(&self) -> &[T] {
        &self.data[..self.revealed]
    }

    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn total(&self) -> usize {
        self.data.len()
    }

    /// Activation the snapshot belongs to. Changes whenever the dataset,
    /// policy, or eligibility changes; useful as a memoization key.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == RevealPhase::Complete
    }

    pub fn progress(&self) -> RevealProgress {
        RevealProgress {
            revealed: self.revealed,
            total: self.data.len(),
            phase: self.phase,
        }
    }
}

/// Incrementally reveals a dataset through an [`IdleScheduler`].
///
/// The feeder never mutates the caller-supplied dataset; it only grows the
/// revealed prefix. Cloning the feeder clones a handle to the same reveal.
pub struct ChunkedFeeder<T> {
    shared: Arc<FeederShared<T>>,
}

impl<T> Clone for ChunkedFeeder<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> ChunkedFeeder<T> {
    /// Create a feeder with an empty dataset, gated off.
    pub fn new(scheduler: Arc<IdleScheduler>, policy: ChunkingPolicy) -> Self {
        let dataset: Arc<[T]> = Arc::from(Vec::new());
        Self {
            shared: Arc::new(FeederShared {
                scheduler,
                state: Mutex::new(FeedState {
                    dataset,
                    policy,
                    enabled: false,
                    revealed: 0,
                    phase: RevealPhase::Idle,
                    generation: 0,
                    pending: None,
                    complete_notified: false,
                }),
                subscribers: Mutex::new(Vec::new()),
                on_complete: Mutex::new(None),
            }),
        }
    }

    /// Replace the dataset. Identity is the allocation: a new `Arc` restarts
    /// the reveal from scratch even if the contents are identical, while
    /// handing back the same `Arc` is a no-op.
    pub fn set_dataset(&self, dataset: Arc<[T]>) {
        let update = {
            let mut state = self.shared.state.lock();
            if Arc::ptr_eq(&state.dataset, &dataset) {
                return;
            }
            state.dataset = dataset;
            FeederShared::activate(&self.shared, &mut state);
            FeederShared::finish(&mut state)
        };
        FeederShared::deliver(&self.shared, update);
    }

    /// Replace the chunking policy, restarting any reveal in flight.
    pub fn set_policy(&self, policy: ChunkingPolicy) {
        let update = {
            let mut state = self.shared.state.lock();
            if state.policy == policy {
                return;
            }
            state.policy = policy;
            FeederShared::activate(&self.shared, &mut state);
            FeederShared::finish(&mut state)
        };
        FeederShared::deliver(&self.shared, update);
    }

    /// Gate the feeder. Enabling starts a fresh reveal of the current
    /// dataset; disabling cancels any pending step and returns to idle.
    pub fn set_enabled(&self, enabled: bool) {
        let update = {
            let mut state = self.shared.state.lock();
            if state.enabled == enabled {
                return;
            }
            state.enabled = enabled;
            FeederShared::activate(&self.shared, &mut state);
            FeederShared::finish(&mut state)
        };
        FeederShared::deliver(&self.shared, update);
    }

    /// Discard any partial progress and reveal the current dataset again.
    pub fn reset(&self) {
        let update = {
            let mut state = self.shared.state.lock();
            FeederShared::activate(&self.shared, &mut state);
            FeederShared::finish(&mut state)
        };
        FeederShared::deliver(&self.shared, update);
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.state.lock().enabled
    }

    pub fn phase(&self) -> RevealPhase {
        self.shared.state.lock().phase
    }

    pub fn progress(&self) -> RevealProgress {
        let state = self.shared.state.lock();
        RevealProgress {
            revealed: state.revealed,
            total: state.dataset.len(),
            phase: state.phase,
        }
    }

    /// Snapshot the current reveal for rendering.
    pub fn snapshot(&self) -> RevealSnapshot<T> {
        let state = self.shared.state.lock();
        RevealSnapshot {
            data: state.dataset.clone(),
            revealed: state.revealed,
            generation: state.generation,
            phase: state.phase,
        }
    }

    /// Add a progress subscriber. Held weakly; dropped subscribers are
    /// pruned on the next notification.
    pub fn add_subscriber(&self, subscriber: Arc<dyn RevealSubscriber>) {
        self.shared.subscribers.lock().push(Arc::downgrade(&subscriber));
    }

    /// Set the completion callback, invoked exactly once per activation.
    pub fn set_on_complete(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.shared.on_complete.lock() = Some(Arc::new(callback));
    }
}

impl<T: Send + Sync + 'static> FeederShared<T> {
    /// Begin a fresh activation for the current dataset, policy, and gate.
    /// Any step still in flight is cancelled before new work is armed.
    fn activate(shared: &Arc<Self>, state: &mut FeedState<T>) {
        if let Some(handle) = state.pending.take() {
            shared.scheduler.cancel(handle);
        }
        state.generation = state.generation.wrapping_add(1);
        state.revealed = 0;
        state.complete_notified = false;

        if !state.enabled {
            state.phase = RevealPhase::Idle;
            return;
        }

        let total = state.dataset.len();
        if state.policy.bypasses(total) {
            // Covers the empty dataset as well.
            state.revealed = total;
            state.phase = RevealPhase::Complete;
            tracing::debug!(total, "revealed dataset in one step");
        } else {
            state.phase = RevealPhase::Revealing;
            tracing::debug!(
                total,
                chunk_size = state.policy.chunk_size(),
                "starting chunked reveal"
            );
            Self::arm(shared, state);
        }
    }

    fn arm(shared: &Arc<Self>, state: &mut FeedState<T>) {
        let generation = state.generation;
        let weak = Arc::downgrade(shared);
        let handle = shared
            .scheduler
            .schedule(state.policy.idle_timeout(), move |deadline| {
                if let Some(shared) = weak.upgrade() {
                    FeederShared::step(&shared, generation, deadline);
                }
            });
        state.pending = Some(handle);
    }

    /// One reveal step, run from inside the scheduler pump.
    fn step(shared: &Arc<Self>, generation: u64, deadline: &IdleDeadline) {
        let update = {
            let mut state = shared.state.lock();
            if state.generation != generation {
                // A newer activation owns the loop; this step is stale.
                return;
            }
            state.pending = None;

            let total = state.dataset.len();
            let next_end = (state.revealed + state.policy.chunk_size()).min(total);
            tracing::trace!(
                from = state.revealed,
                to = next_end,
                total,
                did_timeout = deadline.did_timeout,
                "revealing chunk"
            );
            state.revealed = next_end;

            if next_end < total {
                Self::arm(shared, &mut state);
            } else {
                state.phase = RevealPhase::Complete;
                tracing::debug!(total, "chunked reveal complete");
            }
            Self::finish(&mut state)
        };
        Self::deliver(shared, update);
    }

    /// Compute the outgoing progress and latch the one-shot completion flag.
    /// Runs under the state lock; delivery happens after it is released.
    fn finish(state: &mut FeedState<T>) -> (RevealProgress, bool) {
        let progress = RevealProgress {
            revealed: state.revealed,
            total: state.dataset.len(),
            phase: state.phase,
        };
        let completed = state.phase == RevealPhase::Complete && !state.complete_notified;
        if completed {
            state.complete_notified = true;
        }
        (progress, completed)
    }

    fn deliver(shared: &Self, update: (RevealProgress, bool)) {
        let (progress, completed) = update;
        let live: Vec<_> = {
            let mut subscribers = shared.subscribers.lock();
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for subscriber in live {
            subscriber.on_reveal_change(&progress);
        }
        if completed {
            let callback = shared.on_complete.lock().clone();
            if let Some(callback) = callback {
                callback();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{FramePulse, IdleCapability};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSubscriber {
        seen: Mutex<Vec<RevealProgress>>,
    }

    impl RevealSubscriber for RecordingSubscriber {
        fn on_reveal_change(&self, progress: &RevealProgress) {
            self.seen.lock().push(progress.clone());
        }
    }

    fn scheduler() -> Arc<IdleScheduler> {
        Arc::new(IdleScheduler::new(IdleCapability::Emulated))
    }

    fn policy(chunk_size: usize, threshold: usize) -> ChunkingPolicy {
        ChunkingPolicy::new(chunk_size, threshold, Duration::from_millis(100)).unwrap()
    }

    fn pump(scheduler: &IdleScheduler) {
        scheduler.drive(FramePulse::now(None));
    }

    #[test]
    fn large_dataset_reveals_in_chunk_sized_steps() {
        let scheduler = scheduler();
        let feeder = ChunkedFeeder::new(scheduler.clone(), policy(1000, 2000));
        let data: Arc<[u32]> = (0..12_000).collect::<Vec<_>>().into();
        let subscriber = Arc::new(RecordingSubscriber::default());

        feeder.set_dataset(data.clone());
        feeder.add_subscriber(subscriber.clone());
        feeder.set_enabled(true);

        let mut pumps = 0;
        while scheduler.pending() > 0 {
            pump(&scheduler);
            pumps += 1;
            assert!(pumps <= 12, "reveal loop did not terminate");
        }
        assert_eq!(pumps, 12);

        let snapshot = feeder.snapshot();
        assert!(snapshot.is_complete());
        assert_eq!(snapshot.as_slice(), &data[..]);

        let seen = subscriber.seen.lock();
        // Activation event plus one per chunk.
        assert_eq!(seen.len(), 13);
        assert_eq!(seen[0].revealed, 0);
        assert_eq!(seen[0].phase, RevealPhase::Revealing);
        let steps: Vec<usize> = seen[1..].iter().map(|p| p.revealed).collect();
        assert_eq!(
            steps,
            (1..=12).map(|i| i * 1000).collect::<Vec<usize>>()
        );
        assert!((seen[1].percent() - 100.0 / 12.0).abs() < 0.01);
        assert_eq!(seen[12].percent(), 100.0);
        assert_eq!(seen[12].phase, RevealPhase::Complete);
    }

    #[test]
    fn revealed_count_is_monotonic() {
        let scheduler = scheduler();
        let feeder = ChunkedFeeder::new(scheduler.clone(), policy(700, 100));
        let data: Arc<[u32]> = (0..5_000).collect::<Vec<_>>().into();
        let subscriber = Arc::new(RecordingSubscriber::default());

        feeder.set_dataset(data);
        feeder.add_subscriber(subscriber.clone());
        feeder.set_enabled(true);
        while scheduler.pending() > 0 {
            pump(&scheduler);
        }

        let seen = subscriber.seen.lock();
        assert!(seen.windows(2).all(|w| w[0].revealed <= w[1].revealed));
        assert_eq!(seen.last().unwrap().revealed, 5_000);
    }

    #[test]
    fn small_dataset_bypasses_chunking_entirely() {
        let scheduler = scheduler();
        let feeder = ChunkedFeeder::new(scheduler.clone(), policy(500, 1000));
        let data: Arc<[u32]> = (0..500).collect::<Vec<_>>().into();
        let subscriber = Arc::new(RecordingSubscriber::default());

        feeder.set_dataset(data.clone());
        feeder.add_subscriber(subscriber.clone());
        feeder.set_enabled(true);

        // Full reveal with zero scheduled idle callbacks.
        assert_eq!(scheduler.pending(), 0);
        let snapshot = feeder.snapshot();
        assert!(snapshot.is_complete());
        assert_eq!(snapshot.as_slice(), &data[..]);
        assert_eq!(snapshot.progress().percent(), 100.0);

        // No intermediate partial states were observable.
        let seen = subscriber.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].revealed, 500);
        assert_eq!(seen[0].phase, RevealPhase::Complete);
    }

    #[test]
    fn empty_dataset_completes_immediately() {
        let scheduler = scheduler();
        let feeder = ChunkedFeeder::new(scheduler.clone(), policy(500, 1000));

        feeder.set_dataset(Vec::<u32>::new().into());
        feeder.set_enabled(true);

        let snapshot = feeder.snapshot();
        assert!(snapshot.is_complete());
        assert!(snapshot.as_slice().is_empty());
        assert_eq!(snapshot.progress().percent(), 100.0);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn replacing_dataset_mid_reveal_discards_stale_chunks() {
        let scheduler = scheduler();
        let feeder = ChunkedFeeder::new(scheduler.clone(), policy(1000, 2000));
        let first: Arc<[u32]> = (0..10_000).collect::<Vec<_>>().into();

        feeder.set_dataset(first);
        feeder.set_enabled(true);
        for _ in 0..4 {
            pump(&scheduler);
        }
        assert_eq!(feeder.snapshot().revealed(), 4_000);

        // Swap to a tiny dataset while the old reveal is 40% done.
        let second: Arc<[u32]> = vec![1_000_001, 1_000_002, 1_000_003, 1_000_004, 1_000_005].into();
        feeder.set_dataset(second.clone());

        let snapshot = feeder.snapshot();
        assert!(snapshot.is_complete());
        assert_eq!(snapshot.as_slice(), &second[..]);
        assert!(snapshot.as_slice().iter().all(|&v| v > 1_000_000));
        assert_eq!(scheduler.pending(), 0);

        // Extra pumps must not resurrect the old loop.
        pump(&scheduler);
        pump(&scheduler);
        assert_eq!(feeder.snapshot().revealed(), 5);
    }

    #[test]
    fn disabling_mid_reveal_cancels_pending_work() {
        let scheduler = scheduler();
        let feeder = ChunkedFeeder::new(scheduler.clone(), policy(1000, 2000));
        let data: Arc<[u32]> = (0..6_000).collect::<Vec<_>>().into();

        feeder.set_dataset(data.clone());
        feeder.set_enabled(true);
        pump(&scheduler);
        pump(&scheduler);
        assert_eq!(feeder.snapshot().revealed(), 2_000);

        feeder.set_enabled(false);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(feeder.phase(), RevealPhase::Idle);
        assert_eq!(feeder.snapshot().revealed(), 0);

        // Re-enabling is a fresh activation that runs to completion.
        feeder.set_enabled(true);
        while scheduler.pending() > 0 {
            pump(&scheduler);
        }
        assert_eq!(feeder.snapshot().as_slice(), &data[..]);
    }

    #[test]
    fn completion_callback_fires_once_per_activation() {
        let scheduler = scheduler();
        let feeder = ChunkedFeeder::new(scheduler.clone(), policy(30, 10));
        let completions = Arc::new(AtomicUsize::new(0));
        let counter = completions.clone();
        feeder.set_on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let data: Arc<[u32]> = (0..100).collect::<Vec<_>>().into();
        feeder.set_dataset(data);
        feeder.set_enabled(true);
        while scheduler.pending() > 0 {
            pump(&scheduler);
        }
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        // Idle pumps and snapshot reads never refire it.
        pump(&scheduler);
        pump(&scheduler);
        let _ = feeder.snapshot();
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        // A fresh activation completes again.
        feeder.reset();
        while scheduler.pending() > 0 {
            pump(&scheduler);
        }
        assert_eq!(completions.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn handing_back_the_same_dataset_is_a_noop() {
        let scheduler = scheduler();
        let feeder = ChunkedFeeder::new(scheduler.clone(), policy(1000, 2000));
        let data: Arc<[u32]> = (0..6_000).collect::<Vec<_>>().into();

        feeder.set_dataset(data.clone());
        feeder.set_enabled(true);
        pump(&scheduler);
        assert_eq!(feeder.snapshot().revealed(), 1_000);

        // Same allocation: the reveal in flight keeps its progress.
        feeder.set_dataset(data);
        assert_eq!(feeder.snapshot().revealed(), 1_000);
        assert_eq!(feeder.phase(), RevealPhase::Revealing);
    }
}
