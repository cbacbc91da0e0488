//! The method-boundary diagnostic probe.
//!
//! [`DiagnosticProbe::wrap`] runs a call and surrounds it with diagnostic
//! snapshots according to the probe's [`Placement`]:
//!
//! 1. Interface unavailable or placement disabled: call through, nothing else.
//! 2. Placement fires before: optional collection, query, truncate, emit
//!    "at the beginning of".
//! 3. Run the call.
//! 4. Placement fires after: the same snapshot, "at the end of", on every exit
//!    path of the call including panics.
//! 5. Hand back exactly what the call produced.
//!
//! Nothing the diagnostic machinery does can change the call's result.

use crate::diag::{self, DiagnosticInterface};
use crate::gc;
use crate::sink::OutputSink;
use crate::truncate::truncate;
use dp_common::{CallContext, ACTION_NAME, PROBE_TAG};
use dp_config::{ConfigError, Placement, ProbeConfig, ProbeDefaults};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which side of the call a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Beginning,
    End,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Beginning => f.write_str("beginning"),
            Boundary::End => f.write_str("end"),
        }
    }
}

/// Why a probe only calls through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughReason {
    /// No diagnostic interface on this host.
    Unavailable,
    /// `where` was not recognized.
    Disabled,
}

/// Decided once at construction.
enum ProbeState {
    Active(Arc<dyn DiagnosticInterface>),
    PassThrough(PassThroughReason),
}

/// Wraps calls with diagnostic snapshots. Safe to share across threads.
pub struct DiagnosticProbe {
    config: ProbeConfig,
    state: ProbeState,
    sink: Arc<dyn OutputSink>,
}

impl DiagnosticProbe {
    /// Probe backed by the current process's diagnostic interface.
    pub fn new(config: ProbeConfig, sink: Arc<dyn OutputSink>) -> Self {
        Self::with_interface(config, diag::platform_interface(), sink)
    }

    /// Parse `raw` and build a probe on the platform interface.
    pub fn from_args(
        raw: &str,
        defaults: &ProbeDefaults,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(ProbeConfig::from_args(raw, defaults)?, sink))
    }

    /// Probe backed by an explicit interface; `None` means unavailable.
    ///
    /// An unrecognized placement is reported to the sink here, once.
    pub fn with_interface(
        config: ProbeConfig,
        interface: Option<Arc<dyn DiagnosticInterface>>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        if let Some(warning) = config.placement_warning() {
            warn!(
                command = %warning.command,
                value = %warning.value,
                "invalid probe placement; probe switched off"
            );
            sink.emit(&warning.to_string());
        }

        let state = match (interface, config.placement) {
            (_, Placement::Disabled) => ProbeState::PassThrough(PassThroughReason::Disabled),
            (None, _) => ProbeState::PassThrough(PassThroughReason::Unavailable),
            (Some(interface), _) => ProbeState::Active(interface),
        };

        if let ProbeState::PassThrough(reason) = &state {
            debug!(command = %config.command, ?reason, "probe will call through");
        }

        Self {
            config,
            state,
            sink,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ProbeState::Active(_))
    }

    /// `None` if the probe takes snapshots.
    pub fn pass_through_reason(&self) -> Option<PassThroughReason> {
        match self.state {
            ProbeState::Active(_) => None,
            ProbeState::PassThrough(reason) => Some(reason),
        }
    }

    /// Run `call` between the configured snapshots and return its result
    /// untouched. A panic in `call` still gets its end snapshot before it
    /// continues unwinding.
    pub fn wrap<R, F>(&self, context: &CallContext, call: F) -> R
    where
        F: FnOnce() -> R,
    {
        let interface = match &self.state {
            ProbeState::Active(interface) => interface.as_ref(),
            ProbeState::PassThrough(_) => return call(),
        };

        let placement = self.config.placement;
        if placement.fires_before() {
            self.snapshot(interface, Boundary::Beginning, context);
        }

        let _end = placement.fires_after().then(|| EndSnapshot {
            probe: self,
            interface,
            context,
        });

        call()
    }

    fn snapshot(
        &self,
        interface: &dyn DiagnosticInterface,
        boundary: Boundary,
        context: &CallContext,
    ) {
        if self.config.force_gc {
            gc::force_and_wait_for_collection(interface, self.sink.as_ref());
        }
        let result = diag::query(interface, &self.config.command);
        let body: Cow<'_, str> = match &result {
            Ok(text) => Cow::Borrowed(text.as_str()),
            Err(err) => Cow::Owned(err.render()),
        };
        let block = self.render_snapshot(
            boundary,
            context,
            truncate(&body, self.config.output_limit),
        );
        self.sink.emit(&block);
        debug!(
            command = %self.config.command,
            %boundary,
            call = %context,
            ok = result.is_ok(),
            "snapshot emitted"
        );
    }

    /// Header plus body, with the configured timestamp and label prefix.
    pub fn render_snapshot(&self, boundary: Boundary, context: &CallContext, body: &str) -> String {
        self.config.common.add_prefix(&format!(
            "{PROBE_TAG} ({ACTION_NAME} / {}): at the {boundary} of `{context}`:\n{body}",
            self.config.command
        ))
    }
}

impl fmt::Debug for DiagnosticProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticProbe")
            .field("config", &self.config)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Emits the end snapshot when dropped, so it runs on return and on unwind.
struct EndSnapshot<'a> {
    probe: &'a DiagnosticProbe,
    interface: &'a dyn DiagnosticInterface,
    context: &'a CallContext,
}

impl Drop for EndSnapshot<'_> {
    fn drop(&mut self) {
        self.probe.snapshot(self.interface, Boundary::End, self.context);
    }
}
