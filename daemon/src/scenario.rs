//! Scripted runs: register validators and work units, replay votes, and
//! summarize what the ledger ended up holding.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use attest_ledger::IntegrityReport;
use attest_node::{NodeError, ValidationNode};
use attest_store::RecordKind;
use attest_types::{LedgerId, Outcome, ValidatorId, VoteKind, WorkUnitId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    pub validators: Vec<ScenarioValidator>,
    pub work_units: Vec<ScenarioWorkUnit>,
    pub votes: Vec<ScenarioVote>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScenarioValidator {
    pub institution: String,
    pub stake: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScenarioWorkUnit {
    pub id: WorkUnitId,
    pub declared_value: f64,
}

/// A vote, naming its validator by institution.
#[derive(Clone, Debug, Deserialize)]
pub struct ScenarioVote {
    pub work_unit: WorkUnitId,
    pub validator: String,
    pub vote: VoteKind,
    pub stake: u64,
}

impl Scenario {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing scenario {}", path.display()))
    }
}

#[derive(Debug, Serialize)]
pub struct EntryRow {
    pub id: LedgerId,
    pub kind: RecordKind,
    pub work_unit: WorkUnitId,
    pub activity_hash: String,
    pub previous_hash: String,
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct ValidatorRow {
    pub id: ValidatorId,
    pub institution: String,
    pub reputation: f64,
    pub total_votes: u64,
    pub correct_votes: u64,
}

#[derive(Debug, Serialize)]
pub struct RefusedVote {
    pub work_unit: WorkUnitId,
    pub validator: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub outcomes: Vec<(WorkUnitId, Outcome)>,
    pub pending: Vec<WorkUnitId>,
    pub refused: Vec<RefusedVote>,
    pub validators: Vec<ValidatorRow>,
    pub ledger: Vec<EntryRow>,
    pub integrity: IntegrityReport,
}

/// Replay `scenario` against `node`.
///
/// Setup failures abort the run. A refused vote is recorded in the summary
/// and the run continues.
pub async fn run(node: &ValidationNode, scenario: &Scenario) -> anyhow::Result<Summary> {
    let mut ids: HashMap<&str, ValidatorId> = HashMap::new();
    for entry in &scenario.validators {
        let validator = node
            .register_validator(&entry.institution, entry.stake)
            .with_context(|| format!("registering {}", entry.institution))?;
        ids.insert(entry.institution.as_str(), validator.id);
    }
    for entry in &scenario.work_units {
        node.register_work_unit(entry.id.clone(), entry.declared_value)
            .with_context(|| format!("registering work unit {}", entry.id))?;
    }

    let mut outcomes = Vec::new();
    let mut refused = Vec::new();
    for entry in &scenario.votes {
        let Some(&validator) = ids.get(entry.validator.as_str()) else {
            refused.push(RefusedVote {
                work_unit: entry.work_unit.clone(),
                validator: entry.validator.clone(),
                reason: "validator not in scenario".into(),
            });
            continue;
        };
        match node
            .submit_vote(entry.work_unit.clone(), validator, entry.vote, entry.stake)
            .await
        {
            Ok(out) => {
                if let Some(resolution) = out.resolution {
                    outcomes.push((resolution.work_unit, resolution.outcome));
                }
            }
            Err(NodeError::Unrecorded { pending, source }) => {
                tracing::warn!(work_unit = %entry.work_unit, pending, "vote counted, ledger append deferred: {source}");
            }
            Err(e) => {
                tracing::warn!(work_unit = %entry.work_unit, validator = %entry.validator, "vote refused: {e}");
                refused.push(RefusedVote {
                    work_unit: entry.work_unit.clone(),
                    validator: entry.validator.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    node.flush_unrecorded()
        .context("recording ledger entries held back by a failed append")?;

    let validators = node
        .validators()?
        .into_iter()
        .map(|v| ValidatorRow {
            id: v.id,
            institution: v.institution,
            reputation: v.reputation,
            total_votes: v.total_votes,
            correct_votes: v.correct_votes,
        })
        .collect();
    let ledger = node
        .list_ledger(None)?
        .into_iter()
        .map(|e| EntryRow {
            id: e.id,
            kind: e.kind,
            work_unit: e.work_unit,
            activity_hash: e.activity_hash.to_string(),
            previous_hash: e.previous_hash.to_string(),
            verified: e.verified,
        })
        .collect();

    Ok(Summary {
        outcomes,
        pending: node.pending_work_units()?,
        refused,
        validators,
        ledger,
        integrity: node.verify(None)?,
    })
}
