//! Scheduler configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! scheduler:
//!   interval: 1000000        # rebalance interval, simulated time units
//!   metric: time             # time | instructions
//!   cores: 4                 # cores in the simulated machine
//!   core_mask: [1, 1, 0, 1]  # optional per-core enable flags
//! ```
//!
//! Every key is optional; missing keys fall back to
//! [`SchedulerConfig::default`].

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::host::{CoreId, Metric, SimTime};
use crate::scheduler::SchedulerError;

/// Default rebalance interval (1 ms at nanosecond resolution).
pub const DEFAULT_INTERVAL: SimTime = 1_000_000;

/// Default number of cores when the file does not say.
pub const DEFAULT_CORE_COUNT: u32 = 4;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    scheduler: SchedulerSection,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerSection {
    interval: Option<SimTime>,
    metric: Option<String>,
    cores: Option<u32>,
    #[serde(default)]
    core_mask: Vec<u32>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Validated scheduler configuration, fixed for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Periodic rebalance cadence in simulated time units.
    pub interval: SimTime,
    /// Fairness metric.
    pub metric: Metric,
    /// Usable core ids, ascending and unique.
    pub cores: Vec<CoreId>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            metric: Metric::ElapsedTime,
            cores: (0..DEFAULT_CORE_COUNT).collect(),
        }
    }
}

impl SchedulerConfig {
    /// Build a configuration programmatically.
    ///
    /// `cores` is sorted and de-duplicated.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidInterval`] for a zero interval and
    /// [`SchedulerError::NoUsableCores`] for an empty core set.
    pub fn new(
        interval: SimTime,
        metric: Metric,
        mut cores: Vec<CoreId>,
    ) -> Result<Self, SchedulerError> {
        if interval == 0 {
            return Err(SchedulerError::InvalidInterval);
        }
        cores.sort_unstable();
        cores.dedup();
        if cores.is_empty() {
            return Err(SchedulerError::NoUsableCores);
        }
        Ok(Self {
            interval,
            metric,
            cores,
        })
    }

    /// Parse `path` into a validated configuration.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, or the values fail validation (unknown metric, bad mask).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading scheduler configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parse a YAML document (see the module docs for the layout).
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserialises to unit, not to a mapping.
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML")?
        };
        let section = file.scheduler;

        let metric = match section.metric.as_deref() {
            Some(s) => s.parse::<Metric>()?,
            None => Metric::default(),
        };
        let interval = section.interval.unwrap_or(DEFAULT_INTERVAL);
        let core_count = section.cores.unwrap_or(DEFAULT_CORE_COUNT);
        let cores = apply_core_mask(core_count, &section.core_mask)?;

        let config = Self::new(interval, metric, cores)?;
        debug!(
            interval = config.interval,
            metric = %config.metric,
            cores = ?config.cores,
            "Parsed scheduler configuration"
        );
        Ok(config)
    }

    /// Replace the rebalance interval (CLI override).
    pub fn with_interval(mut self, interval: SimTime) -> Result<Self, SchedulerError> {
        if interval == 0 {
            return Err(SchedulerError::InvalidInterval);
        }
        self.interval = interval;
        Ok(self)
    }

    /// Replace the fairness metric (CLI override).
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Number of usable cores.
    pub fn core_count(&self) -> usize {
        self.cores.len()
    }
}

/// Derive the usable core ids from a machine size and per-core enable flags.
///
/// Entries past the end of `mask` count as enabled, so an absent mask means
/// "all cores".
fn apply_core_mask(core_count: u32, mask: &[u32]) -> Result<Vec<CoreId>> {
    if mask.len() > core_count as usize {
        bail!(
            "core_mask has {} entries but the machine only has {} cores",
            mask.len(),
            core_count
        );
    }

    let cores: Vec<CoreId> = (0..core_count)
        .filter(|&core| mask.get(core as usize).map_or(true, |&flag| flag != 0))
        .collect();

    if cores.len() < core_count as usize {
        warn!(
            usable = cores.len(),
            total = core_count,
            "core_mask excludes some cores from scheduling"
        );
    }
    if cores.is_empty() {
        return Err(SchedulerError::NoUsableCores.into());
    }
    Ok(cores)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
