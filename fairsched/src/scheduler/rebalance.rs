/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Periodic rebalancer.
//!
//! Once per interval inside the region of interest the whole assignment is
//! recomputed from scratch:
//!
//! 1. settle the score of every thread holding a core;
//! 2. rank all runnable threads by `(score, id)` and select the first
//!    `min(runnable, cores)`;
//! 3. selected threads that already hold a core keep it;
//! 4. every other core holder is released (release before acquire, so no
//!    core is ever transiently double-booked);
//! 5. selected threads without a core receive the free cores, pairing rank
//!    order with ascending core id.
//!
//! This corrects whatever drift the opportunistic per-event assignments in
//! [`lifecycle`](super::lifecycle) introduced.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::host::{CoreId, Host, SimTime, ThreadId};
use crate::thread::ThreadRecord;

use super::{by_rank, FairScheduler, SchedulerError};

/// What one rebalance pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebalanceOutcome {
    /// `true` when the tick arrived outside the region of interest.
    pub skipped: bool,

    /// Selected threads that kept their core.
    pub kept: Vec<ThreadId>,

    /// Threads that lost their core, in ascending id order.
    pub evicted: Vec<ThreadId>,

    /// Newly placed threads and their cores, in rank order.
    pub placed: Vec<(ThreadId, CoreId)>,
}

impl RebalanceOutcome {
    /// `true` if no core changed hands.
    pub fn is_noop(&self) -> bool {
        self.evicted.is_empty() && self.placed.is_empty()
    }
}

impl FairScheduler {
    /// Periodic tick from the host.  Ignored outside the region of interest.
    pub fn on_periodic<H: Host>(
        &mut self,
        host: &mut H,
        time: SimTime,
    ) -> Result<RebalanceOutcome, SchedulerError> {
        if !self.in_roi {
            debug!(time, "periodic tick outside ROI, skipped");
            return Ok(RebalanceOutcome {
                skipped: true,
                ..Default::default()
            });
        }
        self.rebalance(host, time)
    }

    /// Recompute the globally best thread → core assignment.
    ///
    /// # Errors
    /// [`SchedulerError::InsufficientFreeCores`] if the bookkeeping leaves
    /// fewer free cores than selected waiting threads.  Checked before any
    /// core is released.
    pub fn rebalance<H: Host>(
        &mut self,
        host: &mut H,
        time: SimTime,
    ) -> Result<RebalanceOutcome, SchedulerError> {
        self.update_assigned_scores(&*host)?;

        let mut ranked: Vec<&ThreadRecord> =
            self.threads.values().filter(|r| r.runnable).collect();
        ranked.sort_by(|a, b| by_rank(a, b));
        ranked.truncate(self.config.cores.len());

        let (keep, moving): (Vec<&ThreadRecord>, Vec<&ThreadRecord>) =
            ranked.into_iter().partition(|r| r.is_assigned());

        let used: BTreeSet<CoreId> = keep.iter().filter_map(|r| r.assigned_core()).collect();
        let free: Vec<CoreId> = self
            .config
            .cores
            .iter()
            .copied()
            .filter(|core| !used.contains(core))
            .collect();

        if moving.len() > free.len() {
            return Err(SchedulerError::InsufficientFreeCores {
                needed: moving.len(),
                available: free.len(),
            });
        }

        let kept: Vec<ThreadId> = keep.iter().map(|r| r.id).collect();
        let placed: Vec<(ThreadId, CoreId)> = moving
            .iter()
            .map(|r| r.id)
            .zip(free.iter().copied())
            .collect();
        let evicted: Vec<ThreadId> = self
            .threads
            .values()
            .filter(|r| r.assigned_core().is_some_and(|core| !used.contains(&core)))
            .map(|r| r.id)
            .collect();

        for &thread in &evicted {
            self.release(host, thread, time)?;
        }
        for &(thread, core) in &placed {
            self.assign(host, thread, core, time)?;
        }

        self.verify_invariants()?;

        let outcome = RebalanceOutcome {
            skipped: false,
            kept,
            evicted,
            placed,
        };
        if outcome.is_noop() {
            debug!(time, kept = outcome.kept.len(), "rebalance: assignment unchanged");
        } else {
            info!(
                time,
                kept = outcome.kept.len(),
                evicted = ?outcome.evicted,
                placed = ?outcome.placed,
                spread = self.fairness_spread(),
                "rebalance"
            );
        }
        Ok(outcome)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;
    use crate::host::CoreAffinity;
    use crate::scheduler::tests::scheduler;

    const A: ThreadId = 10;
    const B: ThreadId = 11;
    const C: ThreadId = 12;
    const D: ThreadId = 13;

    /// Scenario D: A and C hold cores; scores {A:50, B:10, C:30, D:5}.
    fn scenario_d() -> (FairScheduler, RecordingHost) {
        let mut host = RecordingHost::new();
        let mut sched = scheduler(&[0, 1]);
        sched.on_roi_begin(0);
        sched.on_thread_start(&mut host, A, 0).unwrap();
        sched.on_thread_start(&mut host, B, 0).unwrap();
        // Move core 1 from B to C.
        sched.release(&mut host, B, 0).unwrap();
        sched.on_thread_start(&mut host, C, 0).unwrap();
        sched.on_thread_start(&mut host, D, 0).unwrap();
        assert_eq!(sched.assigned_core(A), Some(0));
        assert_eq!(sched.assigned_core(C), Some(1));

        sched.set_score(A, 50.0);
        sched.set_score(B, 10.0);
        sched.set_score(C, 30.0);
        sched.set_score(D, 5.0);
        (sched, host)
    }

    #[test]
    fn selects_least_served_and_releases_before_assigning() {
        let (mut sched, mut host) = scenario_d();
        let mark = host.directives.len();

        let out = sched.on_periodic(&mut host, 100).unwrap();
        assert!(!out.skipped);
        assert!(out.kept.is_empty());
        assert_eq!(out.evicted, vec![A, C]);
        assert_eq!(out.placed, vec![(D, 0), (B, 1)]);

        assert_eq!(sched.assigned_core(D), Some(0));
        assert_eq!(sched.assigned_core(B), Some(1));
        assert_eq!(sched.assigned_core(A), None);
        assert_eq!(sched.assigned_core(C), None);

        let issued = &host.directives[mark..];
        assert_eq!(
            issued,
            &[
                (A, CoreAffinity::Any),
                (C, CoreAffinity::Any),
                (D, CoreAffinity::Pinned(0)),
                (B, CoreAffinity::Pinned(1)),
            ]
        );
    }

    #[test]
    fn second_rebalance_at_same_time_is_a_noop() {
        let (mut sched, mut host) = scenario_d();
        sched.on_periodic(&mut host, 100).unwrap();
        let before = sched.snapshot();
        let directives = host.directives.len();

        let out = sched.on_periodic(&mut host, 100).unwrap();
        assert!(out.is_noop());
        assert_eq!(out.kept, vec![D, B], "kept in rank order");
        assert_eq!(sched.snapshot(), before);
        assert_eq!(host.directives.len(), directives);
    }

    #[test]
    fn selected_holders_keep_their_cores() {
        let (mut sched, mut host) = scenario_d();
        sched.set_score(C, 1.0);

        let out = sched.on_periodic(&mut host, 100).unwrap();
        assert_eq!(out.kept, vec![C]);
        assert_eq!(out.evicted, vec![A]);
        assert_eq!(out.placed, vec![(D, 0)]);
        assert_eq!(sched.assigned_core(C), Some(1));
    }

    #[test]
    fn scores_are_settled_before_ranking() {
        let (mut sched, mut host) = scenario_d();
        // A ran a lot, C barely: C must now outrank B (10) after settlement.
        sched.set_score(A, 0.0);
        sched.set_score(C, 0.0);
        host.advance(A, 100);
        host.advance(C, 7);

        let out = sched.on_periodic(&mut host, 100).unwrap();
        assert_eq!(sched.thread(A).unwrap().score(), 100.0);
        assert_eq!(sched.thread(C).unwrap().score(), 7.0);
        assert_eq!(out.kept, vec![C]);
        assert_eq!(out.placed, vec![(D, 0)]);
    }

    #[test]
    fn blocked_threads_are_never_selected() {
        let (mut sched, mut host) = scenario_d();
        sched.on_thread_stall(&mut host, D, "futex", 50).unwrap();
        sched.set_score(D, 0.0);

        let out = sched.on_periodic(&mut host, 100).unwrap();
        assert!(out.placed.iter().all(|&(t, _)| t != D));
        assert_eq!(sched.assigned_core(D), None);
    }

    #[test]
    fn fewer_runnable_threads_than_cores_leaves_cores_idle() {
        let mut host = RecordingHost::new();
        let mut sched = scheduler(&[0, 1, 2]);
        sched.on_roi_begin(0);
        sched.on_thread_start(&mut host, 0, 0).unwrap();

        let out = sched.on_periodic(&mut host, 100).unwrap();
        assert!(out.is_noop());
        assert_eq!(sched.free_cores(), vec![1, 2]);
    }

    #[test]
    fn tick_outside_roi_is_skipped() {
        let (mut sched, mut host) = scenario_d();
        sched.on_roi_end(50);

        let out = sched.on_periodic(&mut host, 100).unwrap();
        assert!(out.skipped);
        assert_eq!(sched.assigned_core(A), Some(0));
        assert_eq!(sched.assigned_core(C), Some(1));
    }
}
