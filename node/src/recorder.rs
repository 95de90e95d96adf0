//! Ordered hand-off of consensus results to the ledger.
//!
//! Consensus commits a vote (and, when it completes a unit, the resolution
//! and its reputation feedback) before anything reaches the ledger. Those
//! results are queued here and appended in order. A failed append leaves the
//! failed item and everything behind it queued; the next pipeline run or an
//! explicit [`LedgerRecorder::flush`] retries from the same item, so no
//! decision is ever lost and a unit's entries never overtake each other.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use attest_consensus::Resolution;
use attest_ledger::{ImmutableLedger, LedgerError};
use attest_store::{ImmutableRecord, StoreError, ValidationRecord, Validator};
use attest_types::Outcome;
use tracing::{error, warn};

use crate::event::{EventBus, NodeEvent};
use crate::metrics::NodeMetrics;
use crate::NodeError;

/// A consensus result that still needs its ledger entry.
#[derive(Clone, Debug)]
pub enum Unrecorded {
    Activity {
        record: ValidationRecord,
        validator: Validator,
    },
    Decision(Resolution),
}

pub struct LedgerRecorder {
    ledger: Arc<ImmutableLedger>,
    backlog: Mutex<VecDeque<Unrecorded>>,
    metrics: Option<Arc<NodeMetrics>>,
    events: Arc<EventBus>,
}

impl LedgerRecorder {
    pub fn new(
        ledger: Arc<ImmutableLedger>,
        metrics: Option<Arc<NodeMetrics>>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            ledger,
            backlog: Mutex::new(VecDeque::new()),
            metrics,
            events,
        }
    }

    pub fn ledger(&self) -> &Arc<ImmutableLedger> {
        &self.ledger
    }

    /// Queue `items` behind anything already waiting and append the lot.
    ///
    /// On success the entries written for `items` are returned in order.
    /// On failure `items` stay queued and [`NodeError::Unrecorded`] says how
    /// many entries are waiting.
    pub fn record(&self, items: Vec<Unrecorded>) -> Result<Vec<ImmutableRecord>, NodeError> {
        let wanted = items.len();
        let mut backlog = self.backlog()?;
        backlog.extend(items);
        let mut written = self.drain(&mut backlog)?;
        Ok(written.split_off(written.len().saturating_sub(wanted)))
    }

    /// Retry everything waiting. Returns the number of entries written.
    pub fn flush(&self) -> Result<usize, NodeError> {
        let mut backlog = self.backlog()?;
        Ok(self.drain(&mut backlog)?.len())
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog().map(|b| b.len()).unwrap_or(0)
    }

    fn drain(&self, backlog: &mut VecDeque<Unrecorded>) -> Result<Vec<ImmutableRecord>, NodeError> {
        let mut written = Vec::new();
        let result = loop {
            let Some(next) = backlog.front() else {
                break Ok(());
            };
            match self.append(next) {
                Ok(entry) => {
                    if let Some(done) = backlog.pop_front() {
                        self.announce(&done, &entry);
                    }
                    written.push(entry);
                }
                Err(source) => {
                    error!(waiting = backlog.len(), error = %source, "ledger append failed; holding entries");
                    break Err(NodeError::Unrecorded {
                        pending: backlog.len(),
                        source,
                    });
                }
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.unrecorded_entries.set(backlog.len() as i64);
        }
        result.map(|()| written)
    }

    fn append(&self, item: &Unrecorded) -> Result<ImmutableRecord, LedgerError> {
        let entry = match item {
            Unrecorded::Activity { record, validator } => {
                self.ledger.append_validation_activity(record, validator)?
            }
            Unrecorded::Decision(resolution) => self.ledger.append_consensus_decision(resolution)?,
        };
        if let Some(metrics) = &self.metrics {
            metrics.ledger_appends.inc();
        }
        if !entry.verified {
            warn!(id = %entry.id, "appended entry failed verification");
            self.events.emit(&NodeEvent::UnverifiedEntry { entry: entry.id });
        }
        Ok(entry)
    }

    fn announce(&self, item: &Unrecorded, entry: &ImmutableRecord) {
        match item {
            Unrecorded::Activity { record, .. } => self.events.emit(&NodeEvent::VoteRecorded {
                work_unit: record.work_unit.clone(),
                validator: record.validator,
                vote: record.vote,
                entry: entry.id,
            }),
            Unrecorded::Decision(resolution) => {
                if let Some(metrics) = &self.metrics {
                    match resolution.outcome {
                        Outcome::Approved => metrics.units_approved.inc(),
                        Outcome::Rejected => metrics.units_rejected.inc(),
                    }
                }
                self.events.emit(&NodeEvent::WorkUnitResolved {
                    work_unit: resolution.work_unit.clone(),
                    outcome: resolution.outcome,
                    entry: entry.id,
                });
            }
        }
    }

    fn backlog(&self) -> Result<MutexGuard<'_, VecDeque<Unrecorded>>, NodeError> {
        self.backlog
            .lock()
            .map_err(|_| NodeError::Store(StoreError::Backend("ledger backlog lock poisoned".into())))
    }
}
