//! Per-call diagnostic log
//!
//! Loading or saving a file accumulates an ordered sequence of diagnostic
//! records. The log is cleared at the start of each call, is never thrown,
//! and stays queryable afterward. Fatal conditions appear here with full
//! technical detail; the error returned to the caller carries a shorter
//! message on purpose.

use alloc::string::String;
use alloc::vec::Vec;

/// Severity of a single diagnostic record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// Informational note, e.g. a defaulted optional keyword
    Info,
    /// A known vendor deviation with a well-defined safe interpretation
    Warning,
    /// A fatal condition; the call that appended this record failed
    Error,
}

impl core::fmt::Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// One diagnostic record
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
}

impl core::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Ordered, append-only diagnostic log for one load or save call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileLog {
    entries: Vec<LogEntry>,
}

impl FileLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all records; called at the start of each load/save
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.entries.push(LogEntry {
            severity: Severity::Info,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.entries.push(LogEntry {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.entries.push(LogEntry {
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records with [`Severity::Warning`]
    pub fn warnings(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_order_is_preserved() {
        let mut log = FileLog::new();
        log.info("first");
        log.warning("second");
        log.error("third");

        let messages: Vec<&str> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
        assert!(log.has_errors());
        assert_eq!(log.warnings().count(), 1);
    }

    #[test]
    fn test_clear() {
        let mut log = FileLog::new();
        log.warning("stale");
        log.clear();
        assert!(log.is_empty());
        assert!(!log.has_errors());
    }
}
