//! Parser diagnostics sink.
//!
//! An arrival-ordered list of formatted messages attached to a parser
//! instance. The engine appends here when a token callback fails; embedders
//! may append their own messages and read the list back after parsing. The
//! engine itself never consults recorded messages.

use tracing::debug;

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Warning,
    Error,
}

/// One recorded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Append-only message list; no deduplication, no size limit.
#[derive(Debug, Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    /// Append a message, preserving arrival order.
    pub fn add(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        debug!(?kind, %message, "diagnostic recorded");
        self.messages.push(Diagnostic { kind, message });
    }

    #[inline]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.messages
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.messages.iter()
    }
}
