//! Forced collection with completion wait.
//!
//! A snapshot taken right after a collection is only meaningful if the
//! collection actually happened. The synchronizer retires a sentinel to the
//! host, asks for a collection, and spins until the sentinel's weak handle
//! reports it gone.
//!
//! The wait is unbounded: if the host never reclaims the sentinel this never
//! returns. Operators opt in with `with_gc=true`.

use crate::diag::{self, DiagnosticInterface};
use crate::sink::OutputSink;
use dp_common::{ACTION_NAME, PROBE_TAG};
use std::sync::Arc;
use tracing::{debug, trace};

/// Diagnostic command that runs one collection cycle.
pub const GC_COMMAND: &str = "GC.run";

#[derive(Debug)]
struct Sentinel {
    _payload: [u8; 64],
}

/// Force a collection and block until the host has reclaimed a fresh
/// sentinel. Returns the number of extra collection requests it took.
pub fn force_and_wait_for_collection(
    interface: &dyn DiagnosticInterface,
    sink: &dyn OutputSink,
) -> u64 {
    let sentinel = Arc::new(Sentinel { _payload: [0; 64] });
    let observed = Arc::downgrade(&sentinel);
    interface.retire(Box::new(sentinel));

    if let Err(err) = diag::query(interface, GC_COMMAND) {
        debug!(error = %err, "initial collection request failed; polling anyway");
    }

    let mut polls = 0u64;
    while observed.strong_count() > 0 {
        sink.emit(&format!("{PROBE_TAG} ({ACTION_NAME}) requesting collection"));
        interface.request_collection();
        polls += 1;
        trace!(polls, "waiting for sentinel reclamation");
    }

    debug!(polls, "collection observed");
    polls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{CommandInfo, DiagnosticResult};
    use crate::sink::MemorySink;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Host that only reclaims after `lazy_cycles` collection requests.
    struct LazyCollector {
        lazy_cycles: usize,
        requests: AtomicUsize,
        gc_runs: AtomicUsize,
        retired: Mutex<Vec<Box<dyn Any + Send>>>,
    }

    impl LazyCollector {
        fn new(lazy_cycles: usize) -> Self {
            Self {
                lazy_cycles,
                requests: AtomicUsize::new(0),
                gc_runs: AtomicUsize::new(0),
                retired: Mutex::new(Vec::new()),
            }
        }
    }

    impl DiagnosticInterface for LazyCollector {
        fn invoke(&self, command: &str) -> DiagnosticResult {
            assert_eq!(command, GC_COMMAND);
            self.gc_runs.fetch_add(1, Ordering::SeqCst);
            Ok(String::new())
        }

        fn commands(&self) -> Vec<CommandInfo> {
            Vec::new()
        }

        fn retire(&self, object: Box<dyn Any + Send>) {
            self.retired.lock().unwrap().push(object);
        }

        fn request_collection(&self) {
            let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.lazy_cycles {
                self.retired.lock().unwrap().clear();
            }
        }
    }

    #[test]
    fn test_polls_until_reclaimed() {
        let host = LazyCollector::new(5);
        let sink = MemorySink::new();

        let polls = force_and_wait_for_collection(&host, &sink);

        assert_eq!(polls, 5);
        assert_eq!(host.requests.load(Ordering::SeqCst), 5);
        assert_eq!(host.gc_runs.load(Ordering::SeqCst), 1);
        assert_eq!(sink.len(), 5);
        assert!(sink.blocks()[0].contains("requesting collection"));
    }

    #[test]
    fn test_immediate_reclaim_needs_no_polling() {
        struct Eager;
        impl DiagnosticInterface for Eager {
            fn invoke(&self, _command: &str) -> DiagnosticResult {
                Ok(String::new())
            }
            fn commands(&self) -> Vec<CommandInfo> {
                Vec::new()
            }
            fn retire(&self, object: Box<dyn Any + Send>) {
                drop(object);
            }
            fn request_collection(&self) {}
        }

        let sink = MemorySink::new();
        assert_eq!(force_and_wait_for_collection(&Eager, &sink), 0);
        assert!(sink.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_procfs_host_collects_on_gc_run() {
        let host = crate::diag::ProcfsDiagnostics::for_self().unwrap();
        let sink = MemorySink::new();
        assert_eq!(force_and_wait_for_collection(&host, &sink), 0);
        assert_eq!(host.collections(), 1);
    }
}
