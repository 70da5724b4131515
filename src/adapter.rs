//! Instrumentation adapters.
//!
//! Every backend satisfies the same four-operation contract: `configure`, `create`,
//! `start` and `stop`. All four default to no-ops, so a backend only overrides the
//! hooks it actually needs, and [`NoopInstrument`] overrides none of them. Kernels
//! are generic over [`Instrument`], which means the no-op adapter compiles away
//! entirely and serves as the control condition.

use std::collections::HashSet;

use clap::ValueEnum;
use tracing::span::EnteredSpan;
use tracing::{debug, warn};

/// Identifies the calling context of an instrumented region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label {
    /// Kernel or function the region belongs to.
    pub site: &'static str,
    /// Loop index or recursion argument at the callsite.
    pub index: u64,
}

impl Label {
    pub const fn new(site: &'static str, index: u64) -> Self {
        Self { site, index }
    }
}

/// Begin/end marker contract every instrumentation backend must satisfy.
///
/// `stop` closes the most recent unmatched `start` with the same label and is
/// called exactly once per `start`.
pub trait Instrument {
    /// One-time setup, called once per [`Runner`](crate::driver::Runner).
    #[inline(always)]
    fn configure(&mut self) {}

    /// Establishes any per-callsite resource. Repeated calls for the same label
    /// must be idempotent.
    #[inline(always)]
    fn create(&mut self, _label: Label) {}

    #[inline(always)]
    fn start(&mut self, _label: Label) {}

    #[inline(always)]
    fn stop(&mut self, _label: Label) {}

    /// Total number of `start` calls seen, for backends that keep track.
    ///
    /// The driver uses this to cross-check the count-policy prediction.
    fn issued(&self) -> Option<u64> {
        None
    }
}

/// Fallback adapter: every hook is a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopInstrument;

impl Instrument for NoopInstrument {}

/// Adapter that records every hook call.
///
/// Useful as a diagnostic backend: it proves that each `start` is paired with a
/// `stop` and reports how many events a kernel actually issued.
#[derive(Clone, Debug, Default)]
pub struct CountingInstrument {
    configure_calls: u64,
    create_calls: u64,
    starts: u64,
    stops: u64,
    unmatched_stops: u64,
    callsites: HashSet<Label>,
    open: Vec<Label>,
}

impl CountingInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure_calls(&self) -> u64 {
        self.configure_calls
    }

    pub fn create_calls(&self) -> u64 {
        self.create_calls
    }

    pub fn starts(&self) -> u64 {
        self.starts
    }

    pub fn stops(&self) -> u64 {
        self.stops
    }

    /// `stop` calls that had no open region with the same label.
    pub fn unmatched_stops(&self) -> u64 {
        self.unmatched_stops
    }

    /// Distinct labels passed to `create`.
    pub fn callsites(&self) -> usize {
        self.callsites.len()
    }

    /// Regions started but not yet stopped.
    pub fn open_regions(&self) -> usize {
        self.open.len()
    }
}

impl Instrument for CountingInstrument {
    fn configure(&mut self) {
        self.configure_calls += 1;
    }

    fn create(&mut self, label: Label) {
        self.create_calls += 1;
        self.callsites.insert(label);
    }

    fn start(&mut self, label: Label) {
        self.starts += 1;
        self.open.push(label);
    }

    fn stop(&mut self, label: Label) {
        self.stops += 1;
        match self.open.iter().rposition(|l| *l == label) {
            Some(pos) => {
                self.open.remove(pos);
            }
            None => self.unmatched_stops += 1,
        }
    }

    fn issued(&self) -> Option<u64> {
        Some(self.starts)
    }
}

/// Adapter that opens a `tracing` span for every region.
///
/// Spans are created at TRACE level, so the cost measured depends on the
/// subscriber installed by the caller: with the level filtered out this is the
/// price of a disabled callsite check.
#[derive(Debug, Default)]
pub struct TracingInstrument {
    configured: bool,
    issued: u64,
    open: Vec<(Label, EnteredSpan)>,
}

impl TracingInstrument {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Instrument for TracingInstrument {
    fn configure(&mut self) {
        if !self.configured {
            self.configured = true;
            debug!("tracing instrumentation configured");
        }
    }

    // Span callsites are registered by the macro on first use.

    fn start(&mut self, label: Label) {
        let span = tracing::trace_span!("region", site = label.site, index = label.index).entered();
        self.open.push((label, span));
        self.issued += 1;
    }

    fn stop(&mut self, label: Label) {
        match self.open.iter().rposition(|(l, _)| *l == label) {
            Some(pos) => {
                let (_, span) = self.open.remove(pos);
                span.exit();
            }
            None => warn!(site = label.site, index = label.index, "stop without matching start"),
        }
    }

    fn issued(&self) -> Option<u64> {
        Some(self.issued)
    }
}

/// Instrumentation backend selectable at run time.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum Backend {
    /// No-op hooks (control condition).
    #[default]
    Noop,
    /// Counting hooks with start/stop pairing checks.
    Counting,
    /// One `tracing` span per region.
    Tracing,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Noop => "noop",
            Backend::Counting => "counting",
            Backend::Tracing => "tracing",
        }
    }
}
