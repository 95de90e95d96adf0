//! Reputation feedback applied to participants on resolution.

use attest_types::{ConsensusParams, Outcome, ValidatorId, VoteKind};
use serde::{Deserialize, Serialize};

/// Magnitude of the reputation change for a unit of the given declared value.
///
/// Grows with `ln(1 + value)` and is clamped into
/// `[min_reputation_delta, max_reputation_delta]`, so even a zero-value unit
/// moves reputation by the minimum. Inverted bounds collapse to the maximum.
pub fn delta_magnitude(declared_value: f64, params: &ConsensusParams) -> f64 {
    let value = if declared_value.is_finite() {
        declared_value.max(0.0)
    } else {
        0.0
    };
    (params.reputation_step * value.ln_1p())
        .max(params.min_reputation_delta)
        .min(params.max_reputation_delta)
}

/// Signed delta for one voter: positive if the vote matched the outcome.
pub fn signed_delta(vote: VoteKind, outcome: Outcome, magnitude: f64) -> f64 {
    if vote.matches(outcome) {
        magnitude
    } else {
        -magnitude
    }
}

/// What resolution did to one participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReputationChange {
    pub validator: ValidatorId,
    pub vote: VoteKind,
    pub stake: u64,
    pub was_correct: bool,
    /// Delta requested; the applied change is smaller when clamping kicks in.
    pub delta: f64,
    pub reputation_after: f64,
}
