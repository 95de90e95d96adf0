//! Prometheus metrics for the validation node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]; [`NodeMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

use crate::NodeError;

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Votes accepted into the vote book.
    pub votes_accepted: IntCounter,
    /// Votes refused (duplicate, unknown validator or unit, stake, resolved).
    pub votes_rejected: IntCounter,
    pub units_approved: IntCounter,
    pub units_rejected: IntCounter,
    pub ledger_appends: IntCounter,
    pub verification_runs: IntCounter,
    pub broken_links_found: IntCounter,
    pub tampered_entries_found: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Work units that have not reached consensus. Units below quorum stay
    /// here indefinitely.
    pub pending_units: IntGauge,
    pub ledger_length: IntGauge,
    /// Entries accepted by consensus but not yet on the ledger.
    pub unrecorded_entries: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent in the vote pipeline, in milliseconds.
    pub vote_pipeline_ms: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        // Counters
        let votes_accepted = register_int_counter_with_registry!(
            Opts::new("attest_votes_accepted_total", "Votes accepted"),
            registry
        )?;
        let votes_rejected = register_int_counter_with_registry!(
            Opts::new("attest_votes_rejected_total", "Votes refused at submission"),
            registry
        )?;
        let units_approved = register_int_counter_with_registry!(
            Opts::new("attest_units_approved_total", "Work units resolved Approved"),
            registry
        )?;
        let units_rejected = register_int_counter_with_registry!(
            Opts::new("attest_units_rejected_total", "Work units resolved Rejected"),
            registry
        )?;
        let ledger_appends = register_int_counter_with_registry!(
            Opts::new("attest_ledger_appends_total", "Entries appended to the ledger"),
            registry
        )?;
        let verification_runs = register_int_counter_with_registry!(
            Opts::new("attest_verification_runs_total", "Chain verification runs"),
            registry
        )?;
        let broken_links_found = register_int_counter_with_registry!(
            Opts::new(
                "attest_broken_links_found_total",
                "Broken chain links reported by verification runs"
            ),
            registry
        )?;
        let tampered_entries_found = register_int_counter_with_registry!(
            Opts::new(
                "attest_tampered_entries_found_total",
                "Entries whose content failed re-hashing during verification"
            ),
            registry
        )?;

        // Gauges
        let pending_units = register_int_gauge_with_registry!(
            Opts::new("attest_pending_units", "Work units awaiting consensus"),
            registry
        )?;
        let ledger_length = register_int_gauge_with_registry!(
            Opts::new("attest_ledger_length", "Entries in the ledger"),
            registry
        )?;
        let unrecorded_entries = register_int_gauge_with_registry!(
            Opts::new(
                "attest_unrecorded_entries",
                "Votes and decisions waiting for a ledger append to succeed"
            ),
            registry
        )?;

        // Histograms: exponential buckets covering 0.1 ms → ~1.6 s.
        let vote_pipeline_ms = register_histogram_with_registry!(
            HistogramOpts::new("attest_vote_pipeline_ms", "Vote pipeline time in milliseconds")
                .buckets(prometheus::exponential_buckets(0.1, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            votes_accepted,
            votes_rejected,
            units_approved,
            units_rejected,
            ledger_appends,
            verification_runs,
            broken_links_found,
            tampered_entries_found,
            pending_units,
            ledger_length,
            unrecorded_entries,
            vote_pipeline_ms,
        })
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_encode() {
        let m = NodeMetrics::new().unwrap();
        assert_eq!(m.votes_accepted.get(), 0);
        m.votes_accepted.inc();
        m.pending_units.set(3);

        let text = m.encode().unwrap();
        assert!(text.contains("attest_votes_accepted_total 1"));
        assert!(text.contains("attest_pending_units 3"));
    }

    #[test]
    fn separate_instances_do_not_collide() {
        let a = NodeMetrics::new().unwrap();
        let b = NodeMetrics::new().unwrap();
        a.ledger_appends.inc_by(5);
        assert_eq!(b.ledger_appends.get(), 0);
    }
}
