//! Utilities to interact with the logs emitted by the check.
//!
//! All diagnostics go through the [`log`] crate. The logger installed by
//! [`init_with`] forwards every record to the provided sink and, in addition,
//! to every [`LogStorage`] subscribed on the current thread with [`capture`]:
//! that's how tests assert on the exact lines a run emitted.

use log::{LevelFilter, Log, Metadata, Record};
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Mutex, Once};

thread_local! {
    static CAPTURE: RefCell<Vec<LogStorage>> = RefCell::new(Vec::new());
}

static INIT: Once = Once::new();

/// Install the global logger used by the crate, wrapping the provided sink.
///
/// The first call wins: later calls, for example from other tests running in
/// the same process, are silently ignored.
pub fn init_with(logger: impl Log + 'static) {
    INIT.call_once(|| {
        // Filtering is left to the sink and to each storage.
        log::set_max_level(LevelFilter::Trace);
        let _ = log::set_boxed_logger(Box::new(MultiLogger {
            global: Box::new(logger),
        }));
    });
}

/// Run `f` while also recording the logs emitted by the current thread into
/// `storage`.
///
/// # Example
///
/// ```
/// use leakcheck::logging::{self, LogStorage};
/// use log::LevelFilter;
///
/// logging::init_with(env_logger::Builder::new().build());
///
/// let storage = LogStorage::new(LevelFilter::Info);
/// logging::capture(&storage, || log::info!("round done"));
/// assert!(storage.to_string().contains("round done"));
/// ```
pub fn capture<R>(storage: &LogStorage, f: impl FnOnce() -> R) -> R {
    struct Unsubscribe;
    impl Drop for Unsubscribe {
        fn drop(&mut self) {
            CAPTURE.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
    }

    CAPTURE.with(|stack| stack.borrow_mut().push(storage.clone()));
    // Unsubscribe even when f panics, or the storage would keep recording
    // logs from unrelated code running afterwards on this thread.
    let _guard = Unsubscribe;
    f()
}

struct MultiLogger {
    global: Box<dyn Log>,
}

impl Log for MultiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.global.enabled(metadata)
            || CAPTURE.with(|stack| {
                stack
                    .borrow()
                    .iter()
                    .any(|storage| metadata.level() <= storage.min_level)
            })
    }

    fn log(&self, record: &Record) {
        if self.global.enabled(record.metadata()) {
            self.global.log(record);
        }
        CAPTURE.with(|stack| {
            for storage in stack.borrow().iter() {
                storage.record(record);
            }
        });
    }

    fn flush(&self) {
        self.global.flush();
    }
}

/// In-memory storage for log messages, used to inspect the diagnostics a run
/// emitted.
///
/// Clones share the same storage, so a clone subscribed with [`capture`]
/// fills the original as well.
#[derive(Clone)]
pub struct LogStorage {
    records: Arc<Mutex<Vec<String>>>,
    min_level: LevelFilter,
}

impl LogStorage {
    /// Create a new storage recording the messages logged at `level` or at a
    /// more severe one.
    pub fn new(level: LevelFilter) -> Self {
        LogStorage {
            records: Arc::new(Mutex::new(Vec::new())),
            min_level: level,
        }
    }

    fn record(&self, record: &Record) {
        if record.level() <= self.min_level {
            let mut records = self.records.lock().unwrap();
            records.push(record.args().to_string());
        }
    }
}

impl fmt::Display for LogStorage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let records = self.records.lock().unwrap();
        for message in records.iter() {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}
