//! Per-work-unit serialization of vote pipelines.
//!
//! A pipeline first waits for its unit's turn and only then for a slot in
//! the global concurrency limit. Votes queued behind a busy unit hold no
//! slot, so they cannot starve pipelines for other units. A unit's turn
//! entry lives only while some pipeline holds or awaits it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use attest_types::WorkUnitId;
use tokio::sync::Semaphore;

use crate::NodeError;

type Turn = Arc<tokio::sync::Mutex<()>>;

struct Slot {
    turn: Turn,
    holders: usize,
}

#[derive(Default)]
struct Slots(Mutex<HashMap<WorkUnitId, Slot>>);

impl Slots {
    fn map(&self) -> MutexGuard<'_, HashMap<WorkUnitId, Slot>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration of one pipeline against a unit; released on drop.
struct Claim<'a> {
    slots: &'a Slots,
    unit: WorkUnitId,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut map = self.slots.map();
        if let Some(slot) = map.get_mut(&self.unit) {
            slot.holders -= 1;
            if slot.holders == 0 {
                map.remove(&self.unit);
            }
        }
    }
}

pub struct UnitSerializer {
    slots: Slots,
    max_concurrent: usize,
    semaphore: Semaphore,
}

impl UnitSerializer {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            slots: Slots::default(),
            max_concurrent,
            semaphore: Semaphore::new(max_concurrent),
        }
    }

    fn claim(&self, unit: &WorkUnitId) -> (Turn, Claim<'_>) {
        let mut map = self.slots.map();
        let slot = map.entry(unit.clone()).or_insert_with(|| Slot {
            turn: Arc::new(tokio::sync::Mutex::new(())),
            holders: 0,
        });
        slot.holders += 1;
        let turn = Arc::clone(&slot.turn);
        (
            turn,
            Claim {
                slots: &self.slots,
                unit: unit.clone(),
            },
        )
    }

    /// Run blocking work `f` with exclusive access to `unit`.
    pub async fn process<F, R>(&self, unit: &WorkUnitId, f: F) -> Result<R, NodeError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (turn, _claim) = self.claim(unit);
        let _turn = turn.lock().await;
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| NodeError::Task(e.to_string()))?;

        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| NodeError::Task(e.to_string()))
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Units with a pipeline running or waiting.
    pub fn tracked_units(&self) -> usize {
        self.slots.map().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, Instant};

    use attest_types::VoteKind;

    fn unit(name: &str) -> WorkUnitId {
        WorkUnitId::new(name)
    }

    /// Votes a unit has tallied, in the order its pipelines ran.
    type Tally = Arc<Mutex<Vec<(u64, VoteKind)>>>;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn votes_on_one_unit_never_overlap() {
        let serializer = Arc::new(UnitSerializer::new(4));
        let tally: Tally = Arc::default();
        let inside = Arc::new(AtomicU64::new(0));
        let overlaps = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for voter in 0..6u64 {
            let s = Arc::clone(&serializer);
            let tally = Arc::clone(&tally);
            let inside = Arc::clone(&inside);
            let overlaps = Arc::clone(&overlaps);
            handles.push(tokio::spawn(async move {
                s.process(&unit("wu-1"), move || {
                    if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    std::thread::sleep(Duration::from_millis(10));
                    tally.lock().unwrap().push((voter, VoteKind::Approve));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        let mut voters: Vec<u64> = tally.lock().unwrap().iter().map(|(v, _)| *v).collect();
        voters.sort();
        assert_eq!(voters, (0..6).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn different_units_resolve_in_parallel() {
        let serializer = Arc::new(UnitSerializer::new(4));

        let start = Instant::now();
        let mut handles = Vec::new();
        for i in 0..4 {
            let s = Arc::clone(&serializer);
            handles.push(tokio::spawn(async move {
                s.process(&unit(&format!("wu-{i}")), move || {
                    std::thread::sleep(Duration::from_millis(50));
                    i
                })
                .await
            }));
        }

        let mut resolved = Vec::new();
        for h in handles {
            resolved.push(h.await.unwrap().unwrap());
        }

        let elapsed = start.elapsed();
        assert!(
            elapsed < Duration::from_millis(190),
            "expected parallel pipelines, took {elapsed:?}"
        );
        resolved.sort();
        assert_eq!(resolved, vec![0, 1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn busy_unit_does_not_starve_other_units() {
        let serializer = Arc::new(UnitSerializer::new(2));

        let mut hot = Vec::new();
        for _ in 0..3 {
            let s = Arc::clone(&serializer);
            hot.push(tokio::spawn(async move {
                s.process(&unit("hot"), || std::thread::sleep(Duration::from_millis(150)))
                    .await
            }));
        }
        // Let the hot votes queue up behind each other.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let start = Instant::now();
        serializer.process(&unit("cold"), || ()).await.unwrap();
        let waited = start.elapsed();
        assert!(
            waited < Duration::from_millis(100),
            "cold unit waited {waited:?} behind a busy one"
        );

        for h in hot {
            h.await.unwrap().unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn permits_bound_pipelines_across_units() {
        let serializer = Arc::new(UnitSerializer::new(2));
        let running = Arc::new(AtomicU64::new(0));
        let max_seen = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for i in 0..6 {
            let s = Arc::clone(&serializer);
            let running = Arc::clone(&running);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                s.process(&unit(&format!("wu-{i}")), move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
        assert_eq!(serializer.max_concurrent(), 2);
    }

    #[tokio::test]
    async fn resolved_units_leave_no_lock_behind() {
        let serializer = UnitSerializer::new(2);
        for i in 0..50 {
            serializer
                .process(&unit(&format!("wu-{i}")), || VoteKind::Reject)
                .await
                .unwrap();
        }
        assert_eq!(serializer.tracked_units(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn abandoned_vote_releases_its_unit() {
        let serializer = Arc::new(UnitSerializer::new(2));

        let s = Arc::clone(&serializer);
        let running = tokio::spawn(async move {
            s.process(&unit("wu-1"), || std::thread::sleep(Duration::from_millis(100)))
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A second vote gives up while waiting for the unit's turn.
        let waited = tokio::time::timeout(
            Duration::from_millis(10),
            serializer.process(&unit("wu-1"), || ()),
        )
        .await;
        assert!(waited.is_err());
        assert_eq!(serializer.tracked_units(), 1);

        running.await.unwrap().unwrap();
        assert_eq!(serializer.tracked_units(), 0);
    }
}
