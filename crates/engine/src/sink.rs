//! Event sinks - reward and transition streams for external consumers.

use petquest_core::{RewardEvent, TransitionEvent};

/// Receives reward emissions and state-machine transitions.
///
/// Implemented by the reward ledger / analytics adapters; the engine calls
/// it while holding the instance lock, so implementations must be cheap.
pub trait EventSink: Send + Sync {
    /// A reward was emitted (at most once per key).
    fn reward_emitted(&self, event: &RewardEvent);

    /// A state-machine transition happened.
    fn transition(&self, event: &TransitionEvent);
}

/// Sink that logs events through `tracing`.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn reward_emitted(&self, event: &RewardEvent) {
        tracing::info!(key = %event.key, xp = event.total_xp(), "reward emitted");
    }

    fn transition(&self, event: &TransitionEvent) {
        tracing::info!(
            kind = ?event.kind,
            progress_id = %event.progress_id,
            tier = %event.tier,
            "transition"
        );
    }
}

/// Sink that collects events in memory, for tests and replay inspection.
#[derive(Default)]
pub struct CollectingSink {
    rewards: std::sync::Mutex<Vec<RewardEvent>>,
    transitions: std::sync::Mutex<Vec<TransitionEvent>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All reward events collected so far.
    pub fn rewards(&self) -> Vec<RewardEvent> {
        self.rewards.lock().expect("sink lock poisoned").clone()
    }

    /// All transition events collected so far.
    pub fn transitions(&self) -> Vec<TransitionEvent> {
        self.transitions.lock().expect("sink lock poisoned").clone()
    }
}

impl EventSink for CollectingSink {
    fn reward_emitted(&self, event: &RewardEvent) {
        self.rewards
            .lock()
            .expect("sink lock poisoned")
            .push(event.clone());
    }

    fn transition(&self, event: &TransitionEvent) {
        self.transitions
            .lock()
            .expect("sink lock poisoned")
            .push(event.clone());
    }
}
