use std::sync::Arc;

use attest_ledger::{ChainVerifier, ImmutableLedger};
use attest_nullables::NullClock;
use attest_store::{ValidationRecord, Validator};
use attest_store_memory::MemoryLedgerStore;
use attest_types::{
    ActivityHash, LedgerId, RecordStatus, Timestamp, ValidatorId, VoteId, VoteKind, WorkUnitId,
};
use proptest::prelude::*;

#[derive(Clone, Debug)]
struct ArbVote {
    unit: u8,
    approve: bool,
    stake: u64,
    reputation: f64,
}

fn arb_vote() -> impl Strategy<Value = ArbVote> {
    (0u8..4, any::<bool>(), 1u64..1_000_000, 0.0f64..=1.0).prop_map(|(unit, approve, stake, reputation)| {
        ArbVote {
            unit,
            approve,
            stake,
            reputation,
        }
    })
}

fn build(votes: &[ArbVote]) -> (Arc<MemoryLedgerStore>, ChainVerifier) {
    let store = Arc::new(MemoryLedgerStore::new());
    let clock = Arc::new(NullClock::new(1));
    let ledger = ImmutableLedger::new(store.clone(), clock.clone());
    for (i, v) in votes.iter().enumerate() {
        let n = i as u64 + 1;
        let record = ValidationRecord {
            id: VoteId::new(n),
            work_unit: WorkUnitId::new(format!("wu-{}", v.unit)),
            validator: ValidatorId::new(n),
            vote: if v.approve { VoteKind::Approve } else { VoteKind::Reject },
            stake: v.stake,
            status: RecordStatus::Pending,
            created_at: Timestamp::new(n),
        };
        let validator = Validator {
            id: ValidatorId::new(n),
            institution: format!("Lab {n}"),
            stake: v.stake,
            reputation: v.reputation,
            total_votes: 0,
            correct_votes: 0,
            registered_at: Timestamp::new(0),
        };
        ledger.append_validation_activity(&record, &validator).unwrap();
    }
    let verifier = ChainVerifier::new(store.clone(), clock);
    (store, verifier)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn appended_chains_always_verify(votes in prop::collection::vec(arb_vote(), 0..24)) {
        let (_, verifier) = build(&votes);
        let report = verifier.verify_chain(None).unwrap();
        prop_assert!(report.is_valid);
        prop_assert_eq!(report.chain_length, votes.len() as u64);
        prop_assert!(report.broken_links.is_empty());
    }

    #[test]
    fn one_corrupted_link_is_the_only_one_reported(
        votes in prop::collection::vec(arb_vote(), 1..16),
        pick in any::<prop::sample::Index>(),
    ) {
        let (store, verifier) = build(&votes);
        let target = LedgerId::new(pick.index(votes.len()) as u64 + 1);
        store.tamper(target, |e| e.previous_hash = ActivityHash::new([0xEE; 32])).unwrap();

        let report = verifier.verify_chain(None).unwrap();
        prop_assert!(!report.is_valid);
        prop_assert_eq!(report.broken_links, vec![target]);
    }
}
