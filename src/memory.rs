//! Resident-memory introspection for the current process.

use anyhow::{bail, Result};
use sysinfo::{get_current_pid, Pid, ProcessExt, System, SystemExt};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Convert a byte count into MiB.
pub(crate) fn to_mib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MIB
}

/// Trait answering how much resident memory the current process holds.
pub trait MemoryProbe {
    /// Return the resident set size of the process, in bytes.
    ///
    /// Every call must report the state at the moment of the call; a stale or
    /// cached reading would hide growth from the check.
    fn resident_bytes(&mut self) -> Result<u64>;
}

/// Memory probe backed by the operating system's process table.
pub struct SystemProbe {
    system: System,
    pid: Pid,
}

impl SystemProbe {
    /// Create a probe bound to the current process.
    pub fn new() -> Result<Self> {
        let pid = get_current_pid().map_err(anyhow::Error::msg)?;
        Ok(SystemProbe {
            system: System::new(),
            pid,
        })
    }
}

impl MemoryProbe for SystemProbe {
    fn resident_bytes(&mut self) -> Result<u64> {
        if !self.system.refresh_process(self.pid) {
            bail!("process {} disappeared from the process table", self.pid);
        }
        match self.system.process(self.pid) {
            Some(process) => Ok(process.memory()),
            None => bail!("no memory information for process {}", self.pid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryProbe, SystemProbe, to_mib};
    use serial_test::serial;
    use std::hint::black_box;

    #[test]
    fn mib_conversion_is_exact_for_whole_mib() {
        assert_eq!(to_mib(0), 0.0);
        assert_eq!(to_mib(1024 * 1024), 1.0);
        assert_eq!(to_mib(100 * 1024 * 1024), 100.0);
    }

    #[test]
    fn probe_reports_nonzero_resident_memory() {
        let mut probe = SystemProbe::new().unwrap();
        assert!(probe.resident_bytes().unwrap() > 0);
    }

    #[test]
    #[serial(rss)]
    fn probe_sees_a_large_allocation() {
        let mut probe = SystemProbe::new().unwrap();
        let before = probe.resident_bytes().unwrap();

        let mut buffer = vec![0u8; 64 * 1024 * 1024];
        for byte in buffer.iter_mut().step_by(4096) {
            *byte = 1;
        }
        let after = probe.resident_bytes().unwrap();
        black_box(&buffer);

        // Leave plenty of headroom for allocations made by the test harness
        // and the probe itself.
        assert!(
            after >= before + 32 * 1024 * 1024,
            "resident set went from {before} to {after} bytes around a 64 MiB allocation"
        );
    }
}
