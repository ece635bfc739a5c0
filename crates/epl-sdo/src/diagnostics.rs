// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Non-fatal decode findings.
//!
//! Nothing in the decoder aborts a frame: out-of-range sequence values,
//! duplicates and short payloads become [`Diagnostic`] values, attached
//! to the frame report and handed to a [`DiagnosticsSink`].

use parking_lot::Mutex;

/// Which half of the sequence layer a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SequenceField {
    Receive,
    Send,
}

impl SequenceField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Receive => "receive",
            Self::Send => "send",
        }
    }
}

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Severity {
    Note,
    Warning,
}

/// What was found.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DiagnosticKind {
    /// Same sequence tuple seen shortly before.
    DuplicatedFrame {
        original: u32,
        recv_seq: u8,
        send_seq: u8,
    },
    /// Sequence number outside 0..64.
    SequenceRange { field: SequenceField, value: u8 },
    /// Connection code outside 0..=3.
    ConnectionCode { field: SequenceField, value: u8 },
    /// Fewer bytes captured than the frame declares.
    PayloadLengthMismatch { declared: usize, captured: usize },
    /// Reassembled transfer differs from the announced data size.
    ReassemblyLengthMismatch { declared: u32, reassembled: usize },
    /// Capture kept fewer bytes than went over the wire.
    CaptureTruncated { reported: usize, captured: usize },
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicatedFrame { .. } => Severity::Note,
            _ => Severity::Warning,
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicatedFrame {
                original,
                recv_seq,
                send_seq,
            } => write!(
                f,
                "Duplication of Frame: {} ReceiveSequenceNumber: {} and SendSequenceNumber: {}",
                original, recv_seq, send_seq
            ),
            Self::SequenceRange { field, value } => {
                write!(f, "{} sequence number out of range: {}", field.as_str(), value)
            }
            Self::ConnectionCode { field, value } => {
                write!(f, "{} connection code out of range: {}", field.as_str(), value)
            }
            Self::PayloadLengthMismatch { declared, captured } => write!(
                f,
                "payload length mismatch: declared {} bytes, captured {}",
                declared, captured
            ),
            Self::ReassemblyLengthMismatch {
                declared,
                reassembled,
            } => write!(
                f,
                "reassembled {} bytes, transfer announced {}",
                reassembled, declared
            ),
            Self::CaptureTruncated { reported, captured } => write!(
                f,
                "frame truncated by capture: {} of {} bytes",
                captured, reported
            ),
        }
    }
}

/// A finding tied to the frame it was raised on.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub frame: u32,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(frame: u32, kind: DiagnosticKind) -> Self {
        Self { frame, kind }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame {}: {}", self.frame, self.kind)
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Receiver of decode findings.
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Forwards findings to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic.severity() {
            Severity::Note => log::info!("[diag] {}", diagnostic),
            Severity::Warning => log::warn!("[diag] {}", diagnostic),
        }
    }
}

/// Keeps every finding in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    items: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything collected so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.items.lock().clone()
    }

    /// Drain collected findings.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.items.lock())
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.items.lock().push(diagnostic.clone());
    }
}

impl<S: DiagnosticsSink + ?Sized> DiagnosticsSink for std::sync::Arc<S> {
    fn report(&self, diagnostic: &Diagnostic) {
        (**self).report(diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_message() {
        let d = Diagnostic::new(
            9,
            DiagnosticKind::DuplicatedFrame {
                original: 4,
                recv_seq: 3,
                send_seq: 5,
            },
        );
        assert_eq!(d.severity(), Severity::Note);
        assert_eq!(
            d.to_string(),
            "frame 9: Duplication of Frame: 4 ReceiveSequenceNumber: 3 and SendSequenceNumber: 5"
        );
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.report(&Diagnostic::new(
            1,
            DiagnosticKind::SequenceRange {
                field: SequenceField::Send,
                value: 70,
            },
        ));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.snapshot()[0].severity(), Severity::Warning);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }
}
