//! Shared fixtures for dp-core integration tests.

#![allow(dead_code)]

use dp_core::diag::{CommandInfo, DiagnosticError, DiagnosticInterface, DiagnosticResult};
use dp_core::{DiagnosticProbe, MemorySink, ProbeConfig, ProbeDefaults};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Interface with canned command output and call counters.
///
/// Retired objects are released only after `lazy_cycles` collection
/// requests, so tests can observe the synchronizer's polling.
pub struct ScriptedInterface {
    outputs: HashMap<String, String>,
    lazy_cycles: usize,
    retired: Mutex<Vec<Box<dyn Any + Send>>>,
    pub invocations: AtomicUsize,
    pub collection_requests: AtomicUsize,
    pub retirements: AtomicUsize,
}

impl ScriptedInterface {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            lazy_cycles: 0,
            retired: Mutex::new(Vec::new()),
            invocations: AtomicUsize::new(0),
            collection_requests: AtomicUsize::new(0),
            retirements: AtomicUsize::new(0),
        }
    }

    pub fn with_output(mut self, command: &str, output: &str) -> Self {
        self.outputs.insert(command.to_string(), output.to_string());
        self
    }

    pub fn with_lazy_collector(mut self, cycles: usize) -> Self {
        self.lazy_cycles = cycles;
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn collection_requests(&self) -> usize {
        self.collection_requests.load(Ordering::SeqCst)
    }

    /// Total calls of any kind into the interface.
    pub fn touches(&self) -> usize {
        self.invocations()
            + self.collection_requests()
            + self.retirements.load(Ordering::SeqCst)
    }
}

impl DiagnosticInterface for ScriptedInterface {
    fn invoke(&self, command: &str) -> DiagnosticResult {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if command == "GC.run" {
            return Ok(String::new());
        }
        self.outputs
            .get(command)
            .cloned()
            .ok_or_else(|| DiagnosticError::UnknownCommand {
                command: command.to_string(),
            })
    }

    fn commands(&self) -> Vec<CommandInfo> {
        Vec::new()
    }

    fn retire(&self, object: Box<dyn Any + Send>) {
        self.retirements.fetch_add(1, Ordering::SeqCst);
        self.retired.lock().unwrap().push(object);
    }

    fn request_collection(&self) {
        let n = self.collection_requests.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= self.lazy_cycles {
            self.retired.lock().unwrap().clear();
        }
    }
}

pub struct Harness {
    pub probe: DiagnosticProbe,
    pub interface: Arc<ScriptedInterface>,
    pub sink: Arc<MemorySink>,
}

/// Build a probe over `interface`, writing into a fresh memory sink.
pub fn harness(args: &str, interface: ScriptedInterface) -> Harness {
    let interface = Arc::new(interface);
    let sink = Arc::new(MemorySink::new());
    let config = ProbeConfig::from_args(args, &ProbeDefaults::default()).expect("valid args");
    let shared: Arc<dyn DiagnosticInterface> = interface.clone();
    let probe = DiagnosticProbe::with_interface(config, Some(shared), sink.clone());
    Harness {
        probe,
        interface,
        sink,
    }
}

/// Probe whose host has no diagnostic interface.
pub fn unavailable(args: &str) -> (DiagnosticProbe, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let config = ProbeConfig::from_args(args, &ProbeDefaults::default()).expect("valid args");
    let probe = DiagnosticProbe::with_interface(config, None, sink.clone());
    (probe, sink)
}
