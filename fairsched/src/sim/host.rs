/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulated host substrate.
//!
//! A thread makes progress only while it is started, not blocked and pinned
//! to a core.  Progress is counted both as elapsed running time and as
//! retired instructions (`ipc` per time unit), so either fairness metric can
//! be sampled.
//!
//! The host also produces the echo protocol: unpinning a thread that is
//! running deschedules it, which the host reports as `stall("unscheduled")`;
//! pinning it again reports the matching `resume`.  Echoes are queued and
//! must be drained by the driver after each scheduler callback.

use std::collections::{BTreeMap, VecDeque};

use tracing::trace;

use crate::host::{CoreAffinity, CoreId, Host, Metric, SimTime, ThreadId};

/// Host-generated event caused by an affinity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Stall(ThreadId),
    Resume(ThreadId),
}

#[derive(Debug, Clone)]
struct SimThread {
    ipc: f64,
    blocked: bool,
    exited: bool,
    pinned: Option<CoreId>,
    run_time: SimTime,
    instructions: f64,
    /// Descheduled by an unpin; a resume echo is due on the next pin.
    echo_outstanding: bool,
}

impl SimThread {
    fn new(ipc: f64) -> Self {
        Self {
            ipc,
            blocked: false,
            exited: false,
            pinned: None,
            run_time: 0,
            instructions: 0.0,
            echo_outstanding: false,
        }
    }

    fn is_running(&self) -> bool {
        !self.blocked && !self.exited && self.pinned.is_some()
    }
}

/// [`Host`] implementation driven by a workload trace.
#[derive(Debug, Default)]
pub struct SimHost {
    now: SimTime,
    threads: BTreeMap<ThreadId, SimThread>,
    echoes: VecDeque<Echo>,
    directives: u64,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Run every running thread forward to `time`.  Never moves backwards.
    pub fn advance_to(&mut self, time: SimTime) {
        if time <= self.now {
            return;
        }
        let dt = time - self.now;
        for t in self.threads.values_mut().filter(|t| t.is_running()) {
            t.run_time += dt;
            t.instructions += dt as f64 * t.ipc;
        }
        self.now = time;
    }

    pub fn thread_started(&mut self, thread: ThreadId, ipc: f64) {
        self.threads.insert(thread, SimThread::new(ipc));
    }

    /// A real block.  Cancels any outstanding echo: the thread is off-core
    /// for its own reasons now.
    pub fn thread_stalled(&mut self, thread: ThreadId) {
        if let Some(t) = self.threads.get_mut(&thread) {
            t.blocked = true;
            t.echo_outstanding = false;
        }
    }

    pub fn thread_resumed(&mut self, thread: ThreadId) {
        if let Some(t) = self.threads.get_mut(&thread) {
            t.blocked = false;
        }
    }

    pub fn thread_exited(&mut self, thread: ThreadId) {
        if let Some(t) = self.threads.get_mut(&thread) {
            t.exited = true;
            t.echo_outstanding = false;
        }
    }

    /// Next queued echo, oldest first.
    pub fn take_echo(&mut self) -> Option<Echo> {
        self.echoes.pop_front()
    }

    /// Total running time of `thread`.
    pub fn run_time(&self, thread: ThreadId) -> Option<SimTime> {
        self.threads.get(&thread).map(|t| t.run_time)
    }

    pub fn pinned_core(&self, thread: ThreadId) -> Option<CoreId> {
        self.threads.get(&thread).and_then(|t| t.pinned)
    }

    /// Number of affinity directives received.
    pub fn directive_count(&self) -> u64 {
        self.directives
    }
}

impl Host for SimHost {
    fn sample(&self, thread: ThreadId, metric: Metric) -> u64 {
        let Some(t) = self.threads.get(&thread) else {
            return 0;
        };
        match metric {
            Metric::ElapsedTime => t.run_time,
            Metric::Instructions => t.instructions as u64,
        }
    }

    fn set_affinity(&mut self, thread: ThreadId, affinity: CoreAffinity) {
        self.directives += 1;
        let Some(t) = self.threads.get_mut(&thread) else {
            return;
        };

        match affinity {
            CoreAffinity::Any => {
                if t.is_running() {
                    t.echo_outstanding = true;
                    self.echoes.push_back(Echo::Stall(thread));
                }
                t.pinned = None;
            }
            CoreAffinity::Pinned(core) => {
                t.pinned = Some(core);
                if t.echo_outstanding {
                    t.echo_outstanding = false;
                    self.echoes.push_back(Echo::Resume(thread));
                }
            }
        }
        trace!(thread, ?affinity, now = self.now, "affinity directive");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pinned_runnable_threads_progress() {
        let mut host = SimHost::new();
        host.thread_started(0, 2.0);
        host.thread_started(1, 1.0);
        host.set_affinity(0, CoreAffinity::Pinned(0));

        host.advance_to(100);
        assert_eq!(host.sample(0, Metric::ElapsedTime), 100);
        assert_eq!(host.sample(0, Metric::Instructions), 200);
        assert_eq!(host.sample(1, Metric::ElapsedTime), 0);

        host.thread_stalled(0);
        host.advance_to(150);
        assert_eq!(host.run_time(0), Some(100), "blocked threads are frozen");
    }

    #[test]
    fn advance_never_goes_backwards() {
        let mut host = SimHost::new();
        host.thread_started(0, 1.0);
        host.set_affinity(0, CoreAffinity::Pinned(0));
        host.advance_to(50);
        host.advance_to(10);
        assert_eq!(host.now(), 50);
        assert_eq!(host.run_time(0), Some(50));
    }

    #[test]
    fn unpinning_a_running_thread_echoes_stall_then_resume() {
        let mut host = SimHost::new();
        host.thread_started(0, 1.0);
        host.set_affinity(0, CoreAffinity::Pinned(0));

        host.set_affinity(0, CoreAffinity::Any);
        assert_eq!(host.take_echo(), Some(Echo::Stall(0)));
        assert_eq!(host.take_echo(), None);

        host.set_affinity(0, CoreAffinity::Pinned(1));
        assert_eq!(host.take_echo(), Some(Echo::Resume(0)));
        assert_eq!(host.pinned_core(0), Some(1));
    }

    #[test]
    fn unpinning_a_blocked_thread_is_silent() {
        let mut host = SimHost::new();
        host.thread_started(0, 1.0);
        host.set_affinity(0, CoreAffinity::Pinned(0));
        host.thread_stalled(0);

        host.set_affinity(0, CoreAffinity::Any);
        assert_eq!(host.take_echo(), None);
    }

    #[test]
    fn real_stall_cancels_outstanding_echo() {
        let mut host = SimHost::new();
        host.thread_started(0, 1.0);
        host.set_affinity(0, CoreAffinity::Pinned(0));
        host.set_affinity(0, CoreAffinity::Any);
        assert_eq!(host.take_echo(), Some(Echo::Stall(0)));

        host.thread_stalled(0);
        host.thread_resumed(0);
        host.set_affinity(0, CoreAffinity::Pinned(0));
        assert_eq!(host.take_echo(), None);
        assert_eq!(host.directive_count(), 3);
    }

    #[test]
    fn unknown_thread_samples_zero() {
        let host = SimHost::new();
        assert_eq!(host.sample(9, Metric::ElapsedTime), 0);
    }
}
