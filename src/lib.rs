#![warn(missing_docs)]
#![allow(clippy::new_without_default)]

//! Leakcheck is a regression check for memory leaks: it exercises a workload
//! five times with escalating sizes, samples the process's resident set size
//! after every round, and fails if the last sample sits more than 100 MiB
//! above the first one. A workload that releases what it allocates keeps the
//! resident set flat no matter how large the rounds get, while a leak
//! compounds over the escalating rounds and pushes the last sample over the
//! tolerance.
//!
//! The crate ships the check both as a library entry point ([`LeakCheck`])
//! and as the `leakcheck` binary, which runs it against the real process and
//! exits non-zero on failure.

mod check;
pub mod logging;
mod memory;
mod workload;

pub use crate::check::{ExcessiveGrowth, LeakCheck};
pub use crate::memory::{MemoryProbe, SystemProbe};
pub use crate::workload::{AllocRelease, Workload};
