//! The leak regression check itself.

use crate::memory::{MemoryProbe, SystemProbe, to_mib};
use crate::workload::{AllocRelease, Workload};
use anyhow::Result;
use log::info;

// Calibration values for the escalating workload sizes. They are part of the
// check's identity: changing any of them changes what the check measures, so
// they are deliberately not configurable.
const SIZE_BASE: usize = 204;
const SIZE_OFFSET: usize = 34;
const SIZE_SCALE: usize = 64;

/// How many workload rounds a single run performs.
const ROUNDS: usize = 5;

/// How much the resident set size may grow between the first and the last
/// sample before the check fails, in MiB.
const TOLERANCE_MIB: f64 = 100.0;

/// The number of bytes handed to the workload on each round.
fn workload_sizes() -> [usize; ROUNDS] {
    let mut sizes = [0; ROUNDS];
    for (round, size) in sizes.iter_mut().enumerate() {
        *size = SIZE_BASE * (SIZE_OFFSET + round) * SIZE_SCALE * SIZE_SCALE;
    }
    sizes
}

/// Error returned by a run that measured more resident-memory growth than the
/// tolerance allows.
#[derive(Debug, thiserror::Error)]
#[error(
    "resident memory grew from {first_mib:.1} MiB to {last_mib:.1} MiB, \
     more than the allowed {tolerance_mib:.0} MiB"
)]
pub struct ExcessiveGrowth {
    pub(crate) first_mib: f64,
    pub(crate) last_mib: f64,
    pub(crate) tolerance_mib: f64,
}

impl ExcessiveGrowth {
    /// Resident memory measured after the first round, in MiB.
    pub fn first_mib(&self) -> f64 {
        self.first_mib
    }

    /// Resident memory measured after the last round, in MiB.
    pub fn last_mib(&self) -> f64 {
        self.last_mib
    }

    /// How much resident memory grew across the run, in MiB.
    pub fn growth_mib(&self) -> f64 {
        self.last_mib - self.first_mib
    }

    /// The growth the run would have tolerated, in MiB.
    pub fn tolerance_mib(&self) -> f64 {
        self.tolerance_mib
    }
}

/// The leak regression check.
///
/// A run exercises a workload for a fixed number of rounds with escalating
/// sizes, samples the process's resident memory after every round, and fails
/// if the last sample sits more than a fixed tolerance above the first one.
/// Allocations the workload properly releases keep the resident set flat,
/// while a per-call leak compounds over the rounds and pushes the last sample
/// over the tolerance.
///
/// The workload and the memory probe can be swapped out, which is how the
/// tests drive a run with doubles. Everything else the check does is fixed.
#[must_use = "call `.run()` to run the check"]
pub struct LeakCheck {
    workload: Option<Box<dyn Workload>>,
    probe: Option<Box<dyn MemoryProbe>>,
}

impl LeakCheck {
    /// Create the check with the default workload and memory probe.
    pub fn new() -> Self {
        LeakCheck {
            workload: None,
            probe: None,
        }
    }

    /// Replace the workload exercised by the check.
    pub fn workload<W: Workload + 'static>(mut self, workload: W) -> Self {
        self.workload = Some(Box::new(workload));
        self
    }

    /// Replace the probe used to sample resident memory.
    pub fn probe<P: MemoryProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Run the check, returning an error if resident memory grew past the
    /// tolerance or if the workload or the probe failed along the way.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use leakcheck::LeakCheck;
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// LeakCheck::new().run()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn run(self) -> Result<()> {
        let mut workload = self.workload.unwrap_or_else(|| Box::new(AllocRelease));
        let mut probe: Box<dyn MemoryProbe> = match self.probe {
            Some(probe) => probe,
            None => Box::new(SystemProbe::new()?),
        };

        let mut samples = Vec::with_capacity(ROUNDS);
        for (round, &bytes) in workload_sizes().iter().enumerate() {
            workload.run(bytes)?;
            let sample = to_mib(probe.resident_bytes()?);
            info!("memory usage after round {round}: {sample:.1} MiB");
            samples.push(sample);
        }

        let first = samples[0];
        let last = samples[ROUNDS - 1];
        if last >= first + TOLERANCE_MIB {
            return Err(ExcessiveGrowth {
                first_mib: first,
                last_mib: last,
                tolerance_mib: TOLERANCE_MIB,
            }
            .into());
        }

        Ok(())
    }
}
