/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Trace replay: drives a [`FairScheduler`] with a [`SimHost`].
//!
//! Trace events and periodic ticks are merged into one time-ordered stream.
//! Ticks fire at `roi_begin + k × interval` while the ROI is open; an event
//! and a tick at the same time deliver the event first.  After every
//! callback the host's echo queue is drained at the same timestamp, one
//! callback at a time, so the scheduler is never re-entered.

use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::host::{SimTime, UNSCHEDULED_REASON};
use crate::scheduler::{FairScheduler, SchedulerError};
use crate::thread::ThreadSnapshot;

use super::host::{Echo, SimHost};
use super::trace::{Trace, TraceEvent};

/// Summary of one replay.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    /// Trace events delivered.
    pub events: usize,
    /// Periodic rebalances executed inside the ROI.
    pub ticks: usize,
    /// Echo stalls and resumes delivered.
    pub echoes: usize,
    pub evictions: usize,
    pub placements: usize,
    pub end_time: SimTime,
    /// Largest score spread among runnable threads seen after a rebalance.
    pub max_spread: f64,
    /// Threads still live at the end, ascending id.
    pub live: Vec<ThreadSnapshot>,
    /// Final state of exited threads, in exit order.
    pub exited: Vec<ThreadSnapshot>,
}

/// Owns the scheduler and the simulated host for one replay.
#[derive(Debug)]
pub struct Replayer {
    scheduler: FairScheduler,
    host: SimHost,
    report: ReplayReport,
    next_tick: Option<SimTime>,
}

impl Replayer {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            scheduler: FairScheduler::new(config),
            host: SimHost::new(),
            report: ReplayReport::default(),
            next_tick: None,
        }
    }

    pub fn scheduler(&self) -> &FairScheduler {
        &self.scheduler
    }

    pub fn host(&self) -> &SimHost {
        &self.host
    }

    /// Replay `trace` to completion.
    ///
    /// # Errors
    /// The first [`SchedulerError`] aborts the replay; the scheduler state is
    /// no longer trustworthy after it.
    pub fn run(&mut self, trace: &Trace) -> Result<ReplayReport, SchedulerError> {
        let interval = self.scheduler.config().interval;

        if !trace.has_roi_begin() {
            self.scheduler.on_roi_begin(0);
            self.next_tick = Some(interval);
        }

        let mut events = trace.events.iter().peekable();
        while let Some(event) = events.peek() {
            match self.next_tick {
                Some(tick) if tick < event.time() => {
                    self.tick(tick)?;
                    // Past the end of simulated time: no further tick.
                    self.next_tick = tick.checked_add(interval);
                }
                _ => {
                    self.deliver(trace, event)?;
                    events.next();
                }
            }
        }

        self.report.end_time = self.host.now();
        self.report.live = self.scheduler.snapshot();
        info!(
            events = self.report.events,
            ticks = self.report.ticks,
            echoes = self.report.echoes,
            evictions = self.report.evictions,
            max_spread = self.report.max_spread,
            end_time = self.report.end_time,
            "Replay finished"
        );
        Ok(std::mem::take(&mut self.report))
    }

    fn deliver(&mut self, trace: &Trace, event: &TraceEvent) -> Result<(), SchedulerError> {
        let time = event.time();
        self.host.advance_to(time);
        debug!(?event, "trace event");

        let sched = &mut self.scheduler;
        let host = &mut self.host;
        match event {
            TraceEvent::Start { thread, .. } => {
                host.thread_started(*thread, trace.ipc_of(*thread));
                sched.on_thread_start(host, *thread, time)?;
            }
            TraceEvent::Stall { thread, reason, .. } => {
                host.thread_stalled(*thread);
                sched.on_thread_stall(host, *thread, reason, time)?;
            }
            TraceEvent::Resume {
                thread, woken_by, ..
            } => {
                host.thread_resumed(*thread);
                sched.on_thread_resume(host, *thread, *woken_by, time)?;
            }
            TraceEvent::Exit { thread, .. } => {
                host.thread_exited(*thread);
                let record = sched.on_thread_exit(host, *thread, time)?;
                self.report.exited.push(record.snapshot());
            }
            TraceEvent::RoiBegin { .. } => {
                sched.on_roi_begin(time);
                self.next_tick = time.checked_add(sched.config().interval);
            }
            TraceEvent::RoiEnd { .. } => {
                sched.on_roi_end(time);
                self.next_tick = None;
            }
        }
        self.report.events += 1;

        self.drain_echoes(time)
    }

    fn tick(&mut self, time: SimTime) -> Result<(), SchedulerError> {
        self.host.advance_to(time);
        let outcome = self.scheduler.on_periodic(&mut self.host, time)?;

        self.report.ticks += 1;
        self.report.evictions += outcome.evicted.len();
        self.report.placements += outcome.placed.len();
        self.report.max_spread = self
            .report
            .max_spread
            .max(self.scheduler.fairness_spread());

        self.drain_echoes(time)
    }

    fn drain_echoes(&mut self, time: SimTime) -> Result<(), SchedulerError> {
        while let Some(echo) = self.host.take_echo() {
            match echo {
                Echo::Stall(thread) => self.scheduler.on_thread_stall(
                    &mut self.host,
                    thread,
                    UNSCHEDULED_REASON,
                    time,
                )?,
                Echo::Resume(thread) => {
                    self.scheduler
                        .on_thread_resume(&mut self.host, thread, None, time)?
                }
            }
            self.report.echoes += 1;
        }
        Ok(())
    }
}

/// Convenience wrapper: replay `trace` under `config`.
pub fn replay(config: SchedulerConfig, trace: &Trace) -> Result<ReplayReport, SchedulerError> {
    Replayer::new(config).run(trace)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Metric, ThreadId};
    use crate::sim::trace::ThreadSpec;

    fn config(cores: &[u32], interval: SimTime) -> SchedulerConfig {
        SchedulerConfig::new(interval, Metric::ElapsedTime, cores.to_vec()).unwrap()
    }

    fn start(time: SimTime, thread: ThreadId) -> TraceEvent {
        TraceEvent::Start { time, thread }
    }

    fn exit(time: SimTime, thread: ThreadId) -> TraceEvent {
        TraceEvent::Exit { time, thread }
    }

    fn stall(time: SimTime, thread: ThreadId, reason: &str) -> TraceEvent {
        TraceEvent::Stall {
            time,
            thread,
            reason: reason.into(),
        }
    }

    fn resume(time: SimTime, thread: ThreadId) -> TraceEvent {
        TraceEvent::Resume {
            time,
            thread,
            woken_by: None,
        }
    }

    fn trace_of(mut events: Vec<TraceEvent>) -> Trace {
        events.sort_by_key(TraceEvent::time);
        Trace {
            threads: Vec::new(),
            events,
        }
    }

    /// N identical always-runnable threads on C < N cores.
    fn always_runnable(threads: u32, until: SimTime) -> Trace {
        let mut events: Vec<_> = (0..threads).map(|t| start(0, t)).collect();
        events.extend((0..threads).map(|t| exit(until, t)));
        trace_of(events)
    }

    #[test]
    fn identical_threads_share_cores_fairly() {
        let interval = 100;
        let mut replayer = Replayer::new(config(&[0, 1], interval));
        let report = replayer.run(&always_runnable(4, 10_000)).unwrap();

        assert_eq!(report.ticks, 99);
        assert!(
            report.max_spread <= (2 * interval) as f64,
            "spread {} exceeds two intervals",
            report.max_spread
        );

        // Every thread got about half the machine.
        for t in 0..4 {
            let run = replayer.host().run_time(t).unwrap();
            assert!(
                (4_800..=5_200).contains(&run),
                "thread {t} ran {run} of 10000"
            );
        }
        assert!(report.live.is_empty());
        assert_eq!(report.exited.len(), 4);
    }

    #[test]
    fn evictions_produce_swallowed_echoes() {
        let mut replayer = Replayer::new(config(&[0, 1], 100));
        let report = replayer.run(&always_runnable(4, 1_000)).unwrap();

        // Ticks 100..=900 each evict the two running threads.
        assert_eq!(report.evictions, 18);
        assert_eq!(report.placements, 18);
        // Every eviction echoes a stall; every re-pin of an evicted thread
        // echoes a resume.  Only the first two placements were never evicted.
        assert_eq!(report.echoes, 18 + 16);
        // Echo pairs never reset scores, so the spread stays one interval.
        assert_eq!(report.max_spread, 100.0);
    }

    #[test]
    fn blocking_workload_keeps_invariants() {
        let mut events = vec![start(0, 0), start(0, 1), start(0, 2), start(10, 3)];
        for k in 0..20u64 {
            let base = 50 + k * 170;
            let t = (k % 4) as ThreadId;
            events.push(stall(base, t, if k % 2 == 0 { "futex" } else { "barrier" }));
            events.push(resume(base + 90, t));
        }
        for t in 0..4 {
            events.push(exit(4_000, t));
        }

        let mut replayer = Replayer::new(config(&[0, 1], 75));
        let report = replayer.run(&trace_of(events)).unwrap();

        assert_eq!(report.events, 4 + 40 + 4);
        assert_eq!(report.exited.len(), 4);
        assert_eq!(replayer.scheduler().live_thread_count(), 0);
        assert_eq!(replayer.scheduler().free_cores(), vec![0, 1]);
    }

    #[test]
    fn ticks_only_fire_inside_roi() {
        let mut events = vec![
            start(0, 0),
            start(0, 1),
            TraceEvent::RoiBegin { time: 1_000 },
            TraceEvent::RoiEnd { time: 1_500 },
        ];
        events.extend([exit(3_000, 0), exit(3_000, 1)]);

        let report = replay(config(&[0], 100), &trace_of(events)).unwrap();
        // 1100, 1200, 1300, 1400; the tick at 1500 loses to roi_end.
        assert_eq!(report.ticks, 4);
    }

    #[test]
    fn starved_thread_is_promoted_by_rebalance() {
        let trace = trace_of(vec![start(0, 0), start(0, 1), exit(1_000, 0), exit(1_000, 1)]);
        let mut replayer = Replayer::new(config(&[0], 1_000_000));
        let report = replayer.run(&trace).unwrap();

        // Interval longer than the run: no tick, thread 1 never runs.
        assert_eq!(report.ticks, 0);
        assert_eq!(replayer.host().run_time(1), Some(0));

        let mut replayer = Replayer::new(config(&[0], 100));
        replayer.run(&trace).unwrap();
        assert!(replayer.host().run_time(1).unwrap() >= 400);
    }

    #[test]
    fn instruction_metric_favours_slow_threads_by_time() {
        let mut trace = always_runnable(2, 10_000);
        trace.threads = vec![
            ThreadSpec { id: 0, ipc: 1.0 },
            ThreadSpec { id: 1, ipc: 3.0 },
        ];
        let cfg = SchedulerConfig::new(100, Metric::Instructions, vec![0]).unwrap();
        let mut replayer = Replayer::new(cfg);
        replayer.run(&trace).unwrap();

        // Equal instructions means the slow thread gets roughly 3x the time.
        let slow = replayer.host().run_time(0).unwrap();
        let fast = replayer.host().run_time(1).unwrap();
        assert!(slow > 2 * fast, "slow={slow} fast={fast}");
    }

    #[test]
    fn huge_interval_after_late_roi_begin_never_ticks() {
        let trace = trace_of(vec![
            start(0, 0),
            TraceEvent::RoiBegin { time: 5 },
            exit(10, 0),
        ]);
        let report = replay(config(&[0], SimTime::MAX), &trace).unwrap();
        assert_eq!(report.ticks, 0);
        assert_eq!(report.exited.len(), 1);
        assert_eq!(report.end_time, 10);
    }

    #[test]
    fn tick_at_end_of_time_is_the_last_one() {
        let trace = trace_of(vec![
            start(0, 0),
            TraceEvent::RoiBegin { time: SimTime::MAX - 10 },
            exit(SimTime::MAX, 0),
        ]);
        let report = replay(config(&[0], 5), &trace).unwrap();
        // MAX-5 fires; MAX loses to the exit event and nothing follows.
        assert_eq!(report.ticks, 1);
        assert_eq!(report.end_time, SimTime::MAX);
    }

    #[test]
    fn unknown_thread_in_trace_aborts_replay() {
        let trace = trace_of(vec![start(0, 0), resume(10, 5)]);
        let err = replay(config(&[0], 100), &trace).unwrap_err();
        assert_eq!(err, SchedulerError::UnknownThread(5));
    }
}
