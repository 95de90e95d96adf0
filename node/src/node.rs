//! The validation node: one vote pipeline over registry, consensus and ledger.

use std::sync::Arc;
use std::time::Instant;

use attest_consensus::{ConsensusEngine, ConsensusStatus, Resolution};
use attest_ledger::{ChainVerifier, ImmutableLedger, IntegrityReport, LedgerSnapshot, SnapshotAudit};
use attest_registry::ValidatorRegistry;
use attest_store::{
    ImmutableRecord, LedgerStore, RecordKind, ValidationRecord, ValidationRecordStore, Validator,
    ValidatorStore, WorkUnitStore,
};
use attest_store_memory::{
    MemoryLedgerStore, MemoryValidationRecordStore, MemoryValidatorStore, MemoryWorkUnitStore,
};
use attest_types::{Clock, LedgerId, SystemClock, ValidatorId, VoteKind, WorkUnit, WorkUnitId};
use tracing::{info, warn};

use crate::event::{EventBus, NodeEvent};
use crate::metrics::NodeMetrics;
use crate::recorder::{LedgerRecorder, Unrecorded};
use crate::unit_serializer::UnitSerializer;
use crate::{NodeConfig, NodeError};

/// Storage backends a node runs on.
#[derive(Clone)]
pub struct NodeStores {
    pub validators: Arc<dyn ValidatorStore>,
    pub records: Arc<dyn ValidationRecordStore>,
    pub work_units: Arc<dyn WorkUnitStore>,
    pub ledger: Arc<dyn LedgerStore>,
}

impl NodeStores {
    pub fn in_memory() -> Self {
        Self {
            validators: Arc::new(MemoryValidatorStore::new()),
            records: Arc::new(MemoryValidationRecordStore::new()),
            work_units: Arc::new(MemoryWorkUnitStore::new()),
            ledger: Arc::new(MemoryLedgerStore::new()),
        }
    }
}

/// What an accepted vote produced.
#[derive(Clone, Debug)]
pub struct VoteOutcome {
    pub record: ValidationRecord,
    pub status: ConsensusStatus,
    /// The vote's ledger entry.
    pub activity: ImmutableRecord,
    /// Present when this vote resolved the unit.
    pub resolution: Option<Resolution>,
    pub decision: Option<ImmutableRecord>,
}

/// Shared state a vote pipeline needs on a blocking thread.
#[derive(Clone)]
struct Pipeline {
    consensus: Arc<ConsensusEngine>,
    recorder: Arc<LedgerRecorder>,
    metrics: Option<Arc<NodeMetrics>>,
    events: Arc<EventBus>,
}

impl Pipeline {
    fn run(
        &self,
        work_unit: &WorkUnitId,
        validator: ValidatorId,
        vote: VoteKind,
        stake: u64,
    ) -> Result<VoteOutcome, NodeError> {
        let receipt = match self.consensus.cast_vote(work_unit, validator, vote, stake) {
            Ok(receipt) => receipt,
            Err(e) => {
                self.metric(|m| m.votes_rejected.inc());
                return Err(e.into());
            }
        };
        self.metric(|m| m.votes_accepted.inc());

        let mut items = vec![Unrecorded::Activity {
            record: receipt.record.clone(),
            validator: receipt.validator.clone(),
        }];
        if let Some(resolution) = &receipt.resolution {
            items.push(Unrecorded::Decision(resolution.clone()));
        }
        let recorded = self.recorder.record(items);
        self.refresh_gauges()?;

        let mut entries = recorded?.into_iter();
        let activity = entries
            .next()
            .ok_or_else(|| NodeError::Task("recorder returned no activity entry".into()))?;
        let decision = entries.next();

        Ok(VoteOutcome {
            record: receipt.record,
            status: receipt.status,
            activity,
            resolution: receipt.resolution,
            decision,
        })
    }

    fn refresh_gauges(&self) -> Result<(), NodeError> {
        if let Some(metrics) = &self.metrics {
            metrics.pending_units.set(self.consensus.pending_work_units()?.len() as i64);
            metrics.ledger_length.set(self.recorder.ledger().len()? as i64);
        }
        Ok(())
    }

    fn metric<F: FnOnce(&NodeMetrics)>(&self, f: F) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}

/// A fully wired validation node.
///
/// Votes flow through [`ValidationNode::submit_vote`]: the vote is recorded,
/// appended to the ledger, tallied, and, if it completes consensus, followed
/// by the decision entry. Everything else is a read.
pub struct ValidationNode {
    config: NodeConfig,
    registry: Arc<ValidatorRegistry>,
    verifier: ChainVerifier,
    serializer: UnitSerializer,
    pipeline: Pipeline,
    clock: Arc<dyn Clock>,
}

impl ValidationNode {
    /// In-memory node on the system clock.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        Self::with_components(config, NodeStores::in_memory(), Arc::new(SystemClock))
    }

    pub fn with_components(
        config: NodeConfig,
        stores: NodeStores,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        let registry = Arc::new(ValidatorRegistry::new(
            stores.validators,
            clock.clone(),
            &config.consensus,
        ));
        let consensus = Arc::new(ConsensusEngine::new(
            config.consensus.clone(),
            registry.clone(),
            stores.records,
            stores.work_units,
            clock.clone(),
        )?);
        let ledger = Arc::new(ImmutableLedger::new(stores.ledger.clone(), clock.clone()));
        let verifier = ChainVerifier::new(stores.ledger, clock.clone());
        let metrics = if config.enable_metrics {
            Some(Arc::new(NodeMetrics::new()?))
        } else {
            None
        };

        let events = Arc::new(EventBus::new());
        let recorder = Arc::new(LedgerRecorder::new(ledger, metrics.clone(), events.clone()));

        info!(
            quorum = config.consensus.quorum,
            threshold = config.consensus.approval_threshold.as_f64(),
            max_concurrent_units = config.max_concurrent_units,
            "validation node ready"
        );
        Ok(Self {
            serializer: UnitSerializer::new(config.max_concurrent_units),
            pipeline: Pipeline {
                consensus,
                recorder,
                metrics,
                events,
            },
            config,
            registry,
            verifier,
            clock,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.pipeline.events
    }

    pub fn metrics(&self) -> Option<&NodeMetrics> {
        self.pipeline.metrics.as_deref()
    }

    pub fn register_validator(&self, institution: &str, stake: u64) -> Result<Validator, NodeError> {
        Ok(self.registry.register(institution, stake)?)
    }

    pub fn register_work_unit(&self, id: WorkUnitId, declared_value: f64) -> Result<WorkUnit, NodeError> {
        let unit = self.pipeline.consensus.register_work_unit(id, declared_value)?;
        self.refresh_pending()?;
        Ok(unit)
    }

    /// Run one vote through the pipeline.
    ///
    /// Votes on the same work unit are processed one at a time; votes on
    /// different units run concurrently. A refused vote writes nothing.
    ///
    /// [`NodeError::Unrecorded`] means the vote counted but the ledger
    /// refused its entries; they are retried ahead of the next vote or by
    /// [`ValidationNode::flush_unrecorded`].
    pub async fn submit_vote(
        &self,
        work_unit: WorkUnitId,
        validator: ValidatorId,
        vote: VoteKind,
        stake: u64,
    ) -> Result<VoteOutcome, NodeError> {
        let started = Instant::now();
        let pipeline = self.pipeline.clone();
        let unit = work_unit.clone();
        let outcome = self
            .serializer
            .process(&work_unit, move || pipeline.run(&unit, validator, vote, stake))
            .await?;
        self.pipeline
            .metric(|m| m.vote_pipeline_ms.observe(started.elapsed().as_secs_f64() * 1_000.0));
        outcome
    }

    /// Append every entry still waiting after a failed ledger write.
    ///
    /// Returns how many entries were written.
    pub fn flush_unrecorded(&self) -> Result<usize, NodeError> {
        let written = self.pipeline.recorder.flush();
        self.pipeline.refresh_gauges()?;
        written
    }

    /// Entries accepted by consensus but not yet on the ledger.
    pub fn unrecorded_len(&self) -> usize {
        self.pipeline.recorder.backlog_len()
    }

    /// Ledger entries in id order, optionally of one kind.
    pub fn list_ledger(&self, kind: Option<RecordKind>) -> Result<Vec<ImmutableRecord>, NodeError> {
        Ok(self.pipeline.recorder.ledger().list(kind)?)
    }

    pub fn ledger_entry(&self, id: LedgerId) -> Result<ImmutableRecord, NodeError> {
        Ok(self.pipeline.recorder.ledger().get(id)?)
    }

    pub fn ledger_for_work_unit(&self, work_unit: &WorkUnitId) -> Result<Vec<ImmutableRecord>, NodeError> {
        Ok(self.pipeline.recorder.ledger().records_for_work_unit(work_unit)?)
    }

    pub fn validator_status(&self, id: ValidatorId) -> Result<Validator, NodeError> {
        Ok(self.registry.get(id)?)
    }

    pub fn validators(&self) -> Result<Vec<Validator>, NodeError> {
        Ok(self.registry.list()?)
    }

    pub fn consensus_status(&self, work_unit: &WorkUnitId) -> Result<ConsensusStatus, NodeError> {
        Ok(self.pipeline.consensus.status(work_unit)?)
    }

    pub fn pending_work_units(&self) -> Result<Vec<WorkUnitId>, NodeError> {
        Ok(self.pipeline.consensus.pending_work_units()?)
    }

    /// Verify the chain from `from` (or the first entry) to the current tail.
    pub fn verify(&self, from: Option<LedgerId>) -> Result<IntegrityReport, NodeError> {
        let report = self.verifier.verify_chain(from)?;
        self.pipeline.metric(|m| {
            m.verification_runs.inc();
            m.broken_links_found.inc_by(report.broken_links.len() as u64);
            m.tampered_entries_found.inc_by(report.tampered.len() as u64);
        });
        if !report.is_valid {
            warn!(
                broken = report.broken_links.len(),
                tampered = report.tampered.len(),
                "ledger integrity failure; halt trust in the affected range"
            );
            self.pipeline.events.emit(&NodeEvent::IntegrityFailure {
                broken_links: report.broken_links.clone(),
                tampered: report.tampered.clone(),
            });
        }
        Ok(report)
    }

    pub fn export_snapshot(&self) -> Result<LedgerSnapshot, NodeError> {
        Ok(LedgerSnapshot::create(self.list_ledger(None)?, self.clock.now()))
    }

    fn refresh_pending(&self) -> Result<(), NodeError> {
        if let Some(metrics) = &self.pipeline.metrics {
            metrics
                .pending_units
                .set(self.pipeline.consensus.pending_work_units()?.len() as i64);
        }
        Ok(())
    }
}

/// Verify an exported ledger offline.
///
/// Never fails: a doctored export shows up as a digest mismatch, broken
/// links or tampered entries in the returned audit.
pub fn audit_snapshot(snapshot: &LedgerSnapshot, clock: Arc<dyn Clock>) -> SnapshotAudit {
    let audit = snapshot.audit(clock.now());
    if !audit.is_valid() {
        warn!(
            digest_matches = audit.digest_matches,
            broken = audit.report.broken_links.len(),
            tampered = audit.report.tampered.len(),
            "snapshot audit failed"
        );
    }
    audit
}
