/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Trace-driven host simulator.
//!
//! Stands in for the architecture simulator so the scheduler can be run
//! end-to-end outside it:
//!
//! ```text
//!  Trace (YAML) ──► Replayer ──events/ticks──► FairScheduler
//!                      │                           │
//!                      └──────── SimHost ◄─────────┘ affinity directives
//!                                  └──► echoes ──► Replayer
//! ```

pub mod host;
pub mod replay;
pub mod trace;

pub use host::{Echo, SimHost};
pub use replay::{replay, ReplayReport, Replayer};
pub use trace::{ThreadSpec, Trace, TraceEvent};
