//! Diagnostics sink
//!
//! Components that must report recoverable conditions (skipped mesh points,
//! missing optional solver data) take an explicit `&dyn Diagnostics` instead
//! of logging through global state. Production code uses [`LogDiagnostics`],
//! tests use [`CollectingDiagnostics`] to assert on the warning paths.

use std::cell::RefCell;

pub trait Diagnostics {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Forwards diagnostics to the `log` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn warn(&self, message: &str) {
        log::warn!("{message}");
    }
}

/// Collects diagnostics in memory. The core is single-threaded, so a
/// `RefCell` is sufficient.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    messages: RefCell<Vec<(Severity, String)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(s, _)| *s == Severity::Warn)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn info(&self, message: &str) {
        self.messages
            .borrow_mut()
            .push((Severity::Info, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.messages
            .borrow_mut()
            .push((Severity::Warn, message.to_string()));
    }
}
