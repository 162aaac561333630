//! Workloads exercised by the leak regression check.

use anyhow::Result;
use std::hint::black_box;

// One write per this many bytes is enough to fault a fresh allocation into
// the resident set.
const PAGE_SIZE: usize = 4096;

/// Trait representing the unit of work exercised by
/// [`LeakCheck`](crate::LeakCheck).
///
/// Implementations are free to allocate and free as much memory as they like
/// while the call is in progress; the check only looks at the resident memory
/// left behind after each call returns.
pub trait Workload {
    /// Perform one round of work sized at `bytes` bytes.
    fn run(&mut self, bytes: usize) -> Result<()>;
}

impl<F: FnMut(usize) -> Result<()>> Workload for F {
    fn run(&mut self, bytes: usize) -> Result<()> {
        self(bytes)
    }
}

/// The default workload: allocate a buffer of the requested size, touch every
/// page of it, and release the whole buffer on return.
///
/// A well behaved allocator hands the released pages back to the operating
/// system (or reuses them on the next round), so repeated runs keep the
/// resident set flat no matter how large the buffers get.
pub struct AllocRelease;

impl Workload for AllocRelease {
    fn run(&mut self, bytes: usize) -> Result<()> {
        let mut buffer = vec![0u8; bytes];
        // Write one byte per page, otherwise the kernel can back the zeroed
        // allocation with pages that never count towards the resident set.
        for byte in buffer.iter_mut().step_by(PAGE_SIZE) {
            *byte = 0xa5;
        }
        black_box(&buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AllocRelease, Workload};
    use anyhow::Result;

    #[test]
    fn alloc_release_runs() {
        let mut workload = AllocRelease;
        workload.run(1024 * 1024).unwrap();
    }

    #[test]
    fn alloc_release_accepts_an_empty_round() {
        let mut workload = AllocRelease;
        workload.run(0).unwrap();
    }

    #[test]
    fn closures_are_workloads() {
        let mut seen = Vec::new();
        let mut workload = |bytes: usize| -> Result<()> {
            seen.push(bytes);
            Ok(())
        };
        workload.run(42).unwrap();
        workload.run(43).unwrap();
        assert_eq!(seen, vec![42, 43]);
    }
}
