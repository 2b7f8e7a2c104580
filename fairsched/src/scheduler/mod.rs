//! Online multicore fairness scheduler.
//!
//! [`FairScheduler`] assigns a pool of software threads to a fixed set of
//! cores.  It reacts to thread lifecycle events delivered by the host
//! (start, stall, resume, exit) and to a periodic tick, keeping the
//! least-served runnable threads on the cores.  "Served" is measured by a
//! per-thread score accumulated from a host metric; lower score means higher
//! priority.
//!
//! # Components
//!
//! | Module | Role |
//! |---|---|
//! | [`score`] | Fairness score tracker: settles metric deltas into scores |
//! | [`actuator`] | `assign` / `release`: bookkeeping plus affinity directives |
//! | [`lifecycle`] | Event handlers: opportunistic assignment, backfill, echo suppression |
//! | [`rebalance`] | Periodic, authoritative global reassignment |
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | Instance | One explicit `FairScheduler` per run, no globals |
//! | Host access | Passed as `&mut impl Host` into every callback |
//! | Iteration order | `BTreeMap` everywhere, so runs are reproducible |
//! | Score ties | Broken by ascending thread id |
//! | Core pairing | Rank order of threads × ascending core id |
//! | Consistency | [`FairScheduler::verify_invariants`] runs after every callback |
//!
//! # Example
//! ```rust,ignore
//! let mut sched = FairScheduler::new(SchedulerConfig::default());
//! sched.on_roi_begin(0);
//! sched.on_thread_start(&mut host, 0, 0)?;
//! sched.on_periodic(&mut host, 1_000_000)?;
//! ```

pub mod actuator;
pub mod error;
pub mod lifecycle;
pub mod rebalance;
pub mod score;

pub use error::SchedulerError;
pub use rebalance::RebalanceOutcome;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::info;

use crate::config::SchedulerConfig;
use crate::host::{CoreId, SimTime, ThreadId};
use crate::thread::{ThreadRecord, ThreadSnapshot};

// ── FairScheduler ─────────────────────────────────────────────────────────────

/// The fairness scheduler instance.
///
/// Owns the live thread table and the core-occupancy table exclusively; the
/// host can only influence them through the event callbacks.
#[derive(Debug)]
pub struct FairScheduler {
    config: SchedulerConfig,

    /// Live threads, keyed by host thread id.
    threads: BTreeMap<ThreadId, ThreadRecord>,

    /// Every usable core → the thread holding it, if any.
    occupancy: BTreeMap<CoreId, Option<ThreadId>>,

    /// `true` between ROI begin and ROI end.
    in_roi: bool,
}

impl FairScheduler {
    /// Create a scheduler for an already validated configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        let occupancy = config.cores.iter().map(|&core| (core, None)).collect();

        info!(
            interval = config.interval,
            metric = %config.metric,
            cores = ?config.cores,
            "FairScheduler initialised"
        );

        Self {
            config,
            threads: BTreeMap::new(),
            occupancy,
            in_roi: false,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // ── Region of interest ────────────────────────────────────────────────────

    /// Enable periodic rebalancing.
    pub fn on_roi_begin(&mut self, time: SimTime) {
        self.in_roi = true;
        info!(time, live_threads = self.threads.len(), "ROI begin");
    }

    /// Disable periodic rebalancing.  Lifecycle events are still handled.
    pub fn on_roi_end(&mut self, time: SimTime) {
        self.in_roi = false;
        info!(time, live_threads = self.threads.len(), "ROI end");
    }

    pub fn in_roi(&self) -> bool {
        self.in_roi
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn thread(&self, id: ThreadId) -> Option<&ThreadRecord> {
        self.threads.get(&id)
    }

    /// Live threads in ascending id order.
    pub fn threads(&self) -> impl Iterator<Item = &ThreadRecord> {
        self.threads.values()
    }

    pub fn live_thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn assigned_core(&self, id: ThreadId) -> Option<CoreId> {
        self.threads.get(&id).and_then(|r| r.assigned_core())
    }

    /// Number of threads currently holding a core.
    pub fn assigned_count(&self) -> usize {
        self.occupancy.values().filter(|t| t.is_some()).count()
    }

    /// Unoccupied cores, ascending.
    pub fn free_cores(&self) -> Vec<CoreId> {
        self.occupancy
            .iter()
            .filter(|(_, holder)| holder.is_none())
            .map(|(&core, _)| core)
            .collect()
    }

    /// Lowest-numbered unoccupied core.
    pub(crate) fn first_free_core(&self) -> Option<CoreId> {
        self.occupancy
            .iter()
            .find(|(_, holder)| holder.is_none())
            .map(|(&core, _)| core)
    }

    /// Snapshots of every live thread in ascending id order.
    pub fn snapshot(&self) -> Vec<ThreadSnapshot> {
        self.threads.values().map(ThreadRecord::snapshot).collect()
    }

    /// `max(score) - min(score)` over runnable threads; `0.0` with fewer than
    /// two runnable threads.
    pub fn fairness_spread(&self) -> f64 {
        let (min, max) = self
            .threads
            .values()
            .filter(|r| r.runnable)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                (lo.min(r.score), hi.max(r.score))
            });
        if min.is_finite() && max.is_finite() {
            max - min
        } else {
            0.0
        }
    }

    // ── Consistency ───────────────────────────────────────────────────────────

    /// Cross-check the thread table against the occupancy table.
    ///
    /// # Errors
    /// * [`SchedulerError::UnknownCore`] — a thread holds a non-usable core.
    /// * [`SchedulerError::CoreConflict`] — two threads hold the same core.
    /// * [`SchedulerError::CapacityExceeded`] — more holders than cores.
    /// * [`SchedulerError::OccupancyMismatch`] — the two tables disagree.
    pub fn verify_invariants(&self) -> Result<(), SchedulerError> {
        let mut holders: BTreeMap<CoreId, ThreadId> = BTreeMap::new();

        for rec in self.threads.values() {
            let Some(core) = rec.assigned_core() else {
                continue;
            };
            if !self.occupancy.contains_key(&core) {
                return Err(SchedulerError::UnknownCore(core));
            }
            if let Some(holder) = holders.insert(core, rec.id) {
                return Err(SchedulerError::CoreConflict {
                    core,
                    holder,
                    claimant: rec.id,
                });
            }
        }

        if holders.len() > self.config.cores.len() {
            return Err(SchedulerError::CapacityExceeded {
                assigned: holders.len(),
                cores: self.config.cores.len(),
            });
        }

        for (&core, &recorded) in &self.occupancy {
            let actual = holders.get(&core).copied();
            if recorded != actual {
                return Err(SchedulerError::OccupancyMismatch {
                    core,
                    recorded,
                    actual,
                });
            }
        }

        Ok(())
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    pub(crate) fn record(&self, id: ThreadId) -> Result<&ThreadRecord, SchedulerError> {
        self.threads
            .get(&id)
            .ok_or(SchedulerError::UnknownThread(id))
    }

    pub(crate) fn record_mut(&mut self, id: ThreadId) -> Result<&mut ThreadRecord, SchedulerError> {
        self.threads
            .get_mut(&id)
            .ok_or(SchedulerError::UnknownThread(id))
    }

    #[cfg(test)]
    pub(crate) fn set_score(&mut self, id: ThreadId, score: f64) {
        if let Some(rec) = self.threads.get_mut(&id) {
            rec.score = score;
        }
    }
}

/// Scheduling priority order: lowest score first, ties by ascending id.
pub(crate) fn by_rank(a: &ThreadRecord, b: &ThreadRecord) -> Ordering {
    a.score.total_cmp(&b.score).then_with(|| a.id.cmp(&b.id))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;
    use crate::host::Metric;
    use crate::thread::CoreSlot;

    pub(crate) fn scheduler(cores: &[CoreId]) -> FairScheduler {
        let cfg = SchedulerConfig::new(100, Metric::ElapsedTime, cores.to_vec()).unwrap();
        FairScheduler::new(cfg)
    }

    #[test]
    fn new_scheduler_has_every_core_free() {
        let sched = scheduler(&[0, 1, 3]);
        assert_eq!(sched.free_cores(), vec![0, 1, 3]);
        assert_eq!(sched.assigned_count(), 0);
        assert_eq!(sched.live_thread_count(), 0);
        assert!(!sched.in_roi());
        sched.verify_invariants().unwrap();
    }

    #[test]
    fn roi_toggles() {
        let mut sched = scheduler(&[0]);
        sched.on_roi_begin(10);
        assert!(sched.in_roi());
        sched.on_roi_end(20);
        assert!(!sched.in_roi());
    }

    #[test]
    fn verify_detects_double_occupancy() {
        let mut host = RecordingHost::new();
        let mut sched = scheduler(&[0, 1]);
        sched.on_thread_start(&mut host, 0, 0).unwrap();
        sched.on_thread_start(&mut host, 1, 0).unwrap();

        // Corrupt the table behind the scheduler's back.
        sched.threads.get_mut(&1).unwrap().core = CoreSlot::Assigned(0);

        assert_eq!(
            sched.verify_invariants(),
            Err(SchedulerError::CoreConflict {
                core: 0,
                holder: 0,
                claimant: 1
            })
        );
    }

    #[test]
    fn verify_detects_occupancy_mismatch() {
        let mut host = RecordingHost::new();
        let mut sched = scheduler(&[0, 1]);
        sched.on_thread_start(&mut host, 0, 0).unwrap();
        sched.occupancy.insert(1, Some(0));

        assert!(matches!(
            sched.verify_invariants(),
            Err(SchedulerError::OccupancyMismatch { core: 1, .. })
        ));
    }

    #[test]
    fn verify_detects_unknown_core() {
        let mut host = RecordingHost::new();
        let mut sched = scheduler(&[0]);
        sched.on_thread_start(&mut host, 0, 0).unwrap();
        sched.threads.get_mut(&0).unwrap().core = CoreSlot::Assigned(9);

        assert_eq!(
            sched.verify_invariants(),
            Err(SchedulerError::UnknownCore(9))
        );
    }

    #[test]
    fn fairness_spread_ignores_blocked_threads() {
        let mut host = RecordingHost::new();
        let mut sched = scheduler(&[0]);
        for t in 0..3 {
            sched.on_thread_start(&mut host, t, 0).unwrap();
        }
        sched.set_score(0, 10.0);
        sched.set_score(1, 40.0);
        sched.set_score(2, 1000.0);
        sched.threads.get_mut(&2).unwrap().runnable = false;

        assert_eq!(sched.fairness_spread(), 30.0);
    }

    #[test]
    fn fairness_spread_is_zero_without_threads() {
        assert_eq!(scheduler(&[0]).fairness_spread(), 0.0);
    }

    #[test]
    fn rank_breaks_ties_by_thread_id() {
        let a = ThreadRecord::new(4, 0, 0);
        let b = ThreadRecord::new(2, 0, 0);
        assert_eq!(by_rank(&a, &b), Ordering::Greater);

        let mut c = ThreadRecord::new(1, 0, 0);
        c.score = 5.0;
        assert_eq!(by_rank(&b, &c), Ordering::Less);
    }
}
