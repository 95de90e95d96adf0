//! Consensus tunables.
//!
//! Quorum and approval ratio are injected configuration rather than constants.
//! Every field carries a serde default so a partial `[consensus]` table in a
//! TOML config only overrides what it names.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("approval threshold {numerator}/{denominator} must lie in (1/2, 1]")]
    InvalidThreshold { numerator: u32, denominator: u32 },

    #[error("quorum must be at least 1")]
    ZeroQuorum,

    #[error("vote cap {cap} is below quorum {quorum}")]
    VoteCapBelowQuorum { cap: u32, quorum: u32 },

    #[error("invalid reputation setting: {0}")]
    Reputation(String),
}

/// Weighted approval ratio expressed as an exact fraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalThreshold {
    pub numerator: u32,
    pub denominator: u32,
}

impl ApprovalThreshold {
    pub const TWO_THIRDS: Self = Self {
        numerator: 2,
        denominator: 3,
    };

    /// Whether `part / total >= numerator / denominator`, computed without floats.
    ///
    /// A zero `total` never meets the threshold.
    pub fn is_met(&self, part: u128, total: u128) -> bool {
        if total == 0 {
            return false;
        }
        part.saturating_mul(self.denominator as u128)
            >= total.saturating_mul(self.numerator as u128)
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    fn validate(&self) -> Result<(), ParamsError> {
        let invalid = self.denominator == 0
            || self.numerator > self.denominator
            || (self.numerator as u64) * 2 <= self.denominator as u64;
        if invalid {
            return Err(ParamsError::InvalidThreshold {
                numerator: self.numerator,
                denominator: self.denominator,
            });
        }
        Ok(())
    }
}

impl Default for ApprovalThreshold {
    fn default() -> Self {
        Self::TWO_THIRDS
    }
}

/// What happens when quorum is met but neither side reaches the threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestedPolicy {
    /// Failing to reach a supermajority approval rejects the unit at once.
    #[default]
    RejectAtQuorum,
    /// Keep collecting votes until the vote cap, then the heavier weighted
    /// side wins. An exact tie resolves Rejected.
    MajorityAtVoteCap,
}

/// Parameters governing registration, consensus and reputation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Minimum number of distinct validators before a unit can resolve.
    #[serde(default = "default_quorum")]
    pub quorum: u32,

    /// Stake-weighted ratio needed to approve (or, mirrored, to reject).
    #[serde(default)]
    pub approval_threshold: ApprovalThreshold,

    #[serde(default)]
    pub contested: ContestedPolicy,

    /// Hard vote cap used by [`ContestedPolicy::MajorityAtVoteCap`].
    #[serde(default = "default_vote_cap")]
    pub vote_cap: u32,

    /// Minimum stake required to register as a validator.
    #[serde(default = "default_min_validator_stake")]
    pub min_validator_stake: u64,

    /// Reputation assigned at registration.
    #[serde(default = "default_initial_reputation")]
    pub initial_reputation: f64,

    /// Reputation delta per natural-log unit of declared value.
    #[serde(default = "default_reputation_step")]
    pub reputation_step: f64,

    /// Lower bound on the magnitude of any reputation delta.
    #[serde(default = "default_min_reputation_delta")]
    pub min_reputation_delta: f64,

    /// Upper bound on the magnitude of any reputation delta.
    #[serde(default = "default_max_reputation_delta")]
    pub max_reputation_delta: f64,
}

fn default_quorum() -> u32 {
    3
}

fn default_vote_cap() -> u32 {
    7
}

fn default_min_validator_stake() -> u64 {
    1
}

fn default_initial_reputation() -> f64 {
    0.5
}

fn default_reputation_step() -> f64 {
    0.01
}

fn default_min_reputation_delta() -> f64 {
    0.001
}

fn default_max_reputation_delta() -> f64 {
    0.05
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            quorum: default_quorum(),
            approval_threshold: ApprovalThreshold::default(),
            contested: ContestedPolicy::default(),
            vote_cap: default_vote_cap(),
            min_validator_stake: default_min_validator_stake(),
            initial_reputation: default_initial_reputation(),
            reputation_step: default_reputation_step(),
            min_reputation_delta: default_min_reputation_delta(),
            max_reputation_delta: default_max_reputation_delta(),
        }
    }
}

impl ConsensusParams {
    /// Check internal consistency. Call once at startup.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.quorum == 0 {
            return Err(ParamsError::ZeroQuorum);
        }
        if self.vote_cap < self.quorum {
            return Err(ParamsError::VoteCapBelowQuorum {
                cap: self.vote_cap,
                quorum: self.quorum,
            });
        }
        self.approval_threshold.validate()?;
        if !(0.0..=1.0).contains(&self.initial_reputation) {
            return Err(ParamsError::Reputation(format!(
                "initial_reputation {} outside [0, 1]",
                self.initial_reputation
            )));
        }
        let bounds_ok = self.min_reputation_delta > 0.0
            && self.min_reputation_delta <= self.max_reputation_delta
            && self.max_reputation_delta <= 1.0;
        if !bounds_ok {
            return Err(ParamsError::Reputation(format!(
                "delta bounds [{}, {}] must satisfy 0 < min <= max <= 1",
                self.min_reputation_delta, self.max_reputation_delta
            )));
        }
        if !(self.reputation_step.is_finite() && self.reputation_step >= 0.0) {
            return Err(ParamsError::Reputation(format!(
                "reputation_step {} must be finite and non-negative",
                self.reputation_step
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = ConsensusParams::default();
        assert_eq!(p.quorum, 3);
        assert_eq!(p.approval_threshold, ApprovalThreshold::TWO_THIRDS);
        assert_eq!(p.contested, ContestedPolicy::RejectAtQuorum);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn two_thirds_is_exact() {
        let t = ApprovalThreshold::TWO_THIRDS;
        assert!(t.is_met(200, 300));
        assert!(!t.is_met(199, 300));
        assert!(!t.is_met(300, 500));
        assert!(t.is_met(300, 300));
        assert!(!t.is_met(0, 0));
    }

    #[test]
    fn threshold_must_exceed_half() {
        let mut p = ConsensusParams::default();
        p.approval_threshold = ApprovalThreshold {
            numerator: 1,
            denominator: 2,
        };
        assert!(matches!(
            p.validate(),
            Err(ParamsError::InvalidThreshold { .. })
        ));
        p.approval_threshold = ApprovalThreshold {
            numerator: 3,
            denominator: 0,
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn vote_cap_below_quorum_rejected() {
        let p = ConsensusParams {
            quorum: 5,
            vote_cap: 4,
            ..Default::default()
        };
        assert_eq!(
            p.validate(),
            Err(ParamsError::VoteCapBelowQuorum { cap: 4, quorum: 5 })
        );
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let p: ConsensusParams = toml::from_str("quorum = 5\nvote_cap = 9").expect("parse");
        assert_eq!(p.quorum, 5);
        assert_eq!(p.vote_cap, 9);
        assert_eq!(p.initial_reputation, 0.5);
        assert_eq!(p.approval_threshold, ApprovalThreshold::TWO_THIRDS);
    }

    #[test]
    fn contested_policy_from_toml() {
        let p: ConsensusParams =
            toml::from_str("contested = \"majority_at_vote_cap\"").expect("parse");
        assert_eq!(p.contested, ContestedPolicy::MajorityAtVoteCap);
    }
}
