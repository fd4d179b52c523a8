//! Diagnostics sink owned by a domain

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Severity of a diagnostic record, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl From<DiagnosticLevel> for log::Level {
    fn from(level: DiagnosticLevel) -> Self {
        match level {
            DiagnosticLevel::Error => log::Level::Error,
            DiagnosticLevel::Warn => log::Level::Warn,
            DiagnosticLevel::Info => log::Level::Info,
            DiagnosticLevel::Debug => log::Level::Debug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub level: DiagnosticLevel,
    pub kind: Option<ErrorKind>,
    pub message: String,
    /// Domain time when the record was made
    pub time: f64,
}

/// Records analysis events and forwards them to the `log` facade
///
/// Records less severe than the verbosity threshold are dropped. At most
/// `capacity` records are kept; the oldest go first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    verbosity: DiagnosticLevel,
    capacity: usize,
    records: Vec<DiagnosticRecord>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            verbosity: DiagnosticLevel::Info,
            capacity: 1000,
            records: Vec::new(),
        }
    }
}

impl Diagnostics {
    pub fn new(verbosity: DiagnosticLevel) -> Self {
        Self {
            verbosity,
            ..Default::default()
        }
    }

    pub fn verbosity(&self) -> DiagnosticLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: DiagnosticLevel) {
        self.verbosity = verbosity;
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.trim();
    }

    pub fn record(
        &mut self,
        level: DiagnosticLevel,
        kind: Option<ErrorKind>,
        message: impl Into<String>,
        time: f64,
    ) {
        if level > self.verbosity {
            return;
        }
        let message = message.into();
        match kind {
            Some(k) => log::log!(level.into(), "[{k}] t={time}: {message}"),
            None => log::log!(level.into(), "t={time}: {message}"),
        }
        self.records.push(DiagnosticRecord {
            level,
            kind,
            message,
            time,
        });
        self.trim();
    }

    pub fn error(&mut self, kind: ErrorKind, message: impl Into<String>, time: f64) {
        self.record(DiagnosticLevel::Error, Some(kind), message, time);
    }

    pub fn warn(&mut self, message: impl Into<String>, time: f64) {
        self.record(DiagnosticLevel::Warn, None, message, time);
    }

    pub fn info(&mut self, message: impl Into<String>, time: f64) {
        self.record(DiagnosticLevel::Info, None, message, time);
    }

    pub fn records(&self) -> &[DiagnosticRecord] {
        &self.records
    }

    /// Most recent record carrying an error kind
    pub fn last_error(&self) -> Option<&DiagnosticRecord> {
        self.records.iter().rev().find(|r| r.kind.is_some())
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn trim(&mut self) {
        if self.records.len() > self.capacity {
            let excess = self.records.len() - self.capacity;
            self.records.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_and_last_error() {
        let mut d = Diagnostics::new(DiagnosticLevel::Warn);
        d.info("dropped", 0.0);
        d.warn("cutback", 0.5);
        d.error(ErrorKind::Convergence, "step failed", 0.5);
        assert_eq!(d.records().len(), 2);
        let last = d.last_error().unwrap();
        assert_eq!(last.kind, Some(ErrorKind::Convergence));
        assert_eq!(last.time, 0.5);
    }

    #[test]
    fn test_capacity() {
        let mut d = Diagnostics::default();
        d.set_capacity(2);
        for i in 0..5 {
            d.info(format!("step {i}"), i as f64);
        }
        assert_eq!(d.records().len(), 2);
        assert_eq!(d.records()[0].message, "step 3");
    }
}
