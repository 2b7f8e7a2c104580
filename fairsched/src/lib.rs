/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! fairsched – online multicore fairness scheduler
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── host/        – host boundary: ids, affinity directive, metric, Host trait
//! ├── thread/      – per-thread records and snapshots
//! ├── config/      – YAML scheduler configuration, core mask
//! ├── scheduler/   – FairScheduler: score tracker, actuator, lifecycle, rebalancer
//! └── sim/         – trace-driven host simulator and replay
//! ```

pub mod config;
pub mod host;
pub mod scheduler;
pub mod sim;
pub mod thread;
