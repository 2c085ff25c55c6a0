//! Assembly log
//!
//! The user-facing record of a run. Each stage appends entries as it goes;
//! [`AssemblyLog::into_lines`] orders them by stage (cleanup first, then
//! source, timing, mixing and render entries), keeping production order
//! within a stage. Every entry is also emitted as a tracing event.

use std::fmt;

/// Pipeline stage that produced an entry
///
/// Variant order is the order entries appear in the final log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Cleanup,
    Sources,
    Timeline,
    Music,
    Render,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Cleanup => "cleanup",
            Stage::Sources => "sources",
            Stage::Timeline => "timeline",
            Stage::Music => "music",
            Stage::Render => "render",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub stage: Stage,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info => write!(f, "{}", self.message),
            Severity::Warning => write!(f, "WARNING: {}", self.message),
            Severity::Error => write!(f, "ERROR: {}", self.message),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssemblyLog {
    entries: Vec<LogEntry>,
}

impl AssemblyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(stage = stage.as_str(), "{}", message);
        self.push(stage, Severity::Info, message);
    }

    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = stage.as_str(), "{}", message);
        self.push(stage, Severity::Warning, message);
    }

    /// Non-fatal failure; the run continues
    pub fn error(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(stage = stage.as_str(), "{}", message);
        self.push(stage, Severity::Error, message);
    }

    fn push(&mut self, stage: Stage, severity: Severity, message: String) {
        self.entries.push(LogEntry {
            stage,
            severity,
            message,
        });
    }

    /// Append entries recorded elsewhere (already traced)
    pub fn append(&mut self, other: AssemblyLog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rendered lines, ordered by stage
    pub fn into_lines(mut self) -> Vec<String> {
        self.entries.sort_by_key(|e| e.stage);
        self.entries.iter().map(|e| e.to_string()).collect()
    }
}
