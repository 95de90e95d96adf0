//! Events emitted by the vote pipeline and verification runs.

use std::sync::RwLock;

use attest_types::{LedgerId, Outcome, ValidatorId, VoteKind, WorkUnitId};

/// Node-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq)]
pub enum NodeEvent {
    /// A vote was accepted and recorded on the ledger.
    VoteRecorded {
        work_unit: WorkUnitId,
        validator: ValidatorId,
        vote: VoteKind,
        entry: LedgerId,
    },
    /// A work unit resolved and its decision was recorded.
    WorkUnitResolved {
        work_unit: WorkUnitId,
        outcome: Outcome,
        entry: LedgerId,
    },
    /// A freshly appended entry failed its post-append check.
    UnverifiedEntry { entry: LedgerId },
    /// A verification run found broken links or tampered entries.
    IntegrityFailure {
        broken_links: Vec<LedgerId>,
        tampered: Vec<LedgerId>,
    },
}

type Listener = Box<dyn Fn(&NodeEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the emitting task; keep handlers fast to
/// avoid stalling the vote pipeline.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Listener) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }

    pub fn emit(&self, event: &NodeEvent) {
        if let Ok(listeners) = self.listeners.read() {
            for listener in listeners.iter() {
                listener(event);
            }
        }
    }
}
