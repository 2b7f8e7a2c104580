/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fairness score tracker.
//!
//! A thread's score is the amount of the chosen metric it accrued while
//! holding a core.  Scores are settled lazily: the raw metric value seen at
//! the last settlement is stored on the record, and [`update_score`] folds
//! the difference into the score.  Callers must settle before anything that
//! ends a run segment (release, rebalance decision).
//!
//! [`update_score`]: FairScheduler::update_score

use tracing::{trace, warn};

use crate::host::{Host, ThreadId};

use super::{FairScheduler, SchedulerError};

impl FairScheduler {
    /// Current metric value for `thread`.  Pure query.
    pub fn sample<H: Host>(&self, host: &H, thread: ThreadId) -> u64 {
        host.sample(thread, self.config.metric)
    }

    /// Fold the metric accrued since the last settlement into the score.
    ///
    /// No-op for threads that do not hold a core.
    pub(crate) fn update_score<H: Host>(
        &mut self,
        host: &H,
        thread: ThreadId,
    ) -> Result<(), SchedulerError> {
        let metric = self.config.metric;
        let rec = self
            .threads
            .get_mut(&thread)
            .ok_or(SchedulerError::UnknownThread(thread))?;

        if !rec.core.is_assigned() {
            return Ok(());
        }

        let now = host.sample(thread, metric);
        match now.checked_sub(rec.raw_metric_at_last_sample) {
            Some(delta) => {
                rec.score += delta as f64;
                trace!(thread, delta, score = rec.score, "score settled");
            }
            None => warn!(
                thread,
                previous = rec.raw_metric_at_last_sample,
                now,
                %metric,
                "host metric went backwards, discarding delta"
            ),
        }
        rec.raw_metric_at_last_sample = now;
        Ok(())
    }

    /// Settle every thread that currently holds a core.
    pub(crate) fn update_assigned_scores<H: Host>(&mut self, host: &H) -> Result<(), SchedulerError> {
        let assigned: Vec<ThreadId> = self
            .threads
            .values()
            .filter(|r| r.is_assigned())
            .map(|r| r.id)
            .collect();
        for thread in assigned {
            self.update_score(host, thread)?;
        }
        Ok(())
    }

    /// Set `thread`'s score to the minimum over all live threads and resync
    /// its metric snapshot.
    ///
    /// Used when a blocked thread wakes: it neither pays for the blocked
    /// period nor jumps ahead of the least-served thread.
    pub(crate) fn reset_to_global_minimum<H: Host>(
        &mut self,
        host: &H,
        thread: ThreadId,
    ) -> Result<(), SchedulerError> {
        let min = self
            .threads
            .values()
            .map(|r| r.score)
            .fold(f64::INFINITY, f64::min);
        let raw = self.sample(host, thread);

        let rec = self.record_mut(thread)?;
        rec.score = if min.is_finite() { min } else { 0.0 };
        rec.raw_metric_at_last_sample = raw;
        trace!(thread, score = rec.score, "score reset to global minimum");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
