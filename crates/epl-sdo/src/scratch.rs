// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-frame scratch store.
//!
//! Values computed while decoding a frame are pinned to `(frame, key)`
//! and live as long as the capture. A later pass over the same frame
//! reads them back instead of consulting state that has since moved on.

use std::sync::Arc;

use dashmap::DashMap;

use crate::decoder::FrameReport;
use crate::sdo::{ReadRequest, SequenceVerdict};

/// EtherType used as the high half of read-response keys.
pub const ETHERTYPE_EPL: u32 = 0x88AB;

/// Fixed per-frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScratchKey {
    /// Sequence layer verdict.
    Verdict,
    /// Correlated read request, keyed by EtherType and send byte.
    ReadResponse(u32),
    /// Complete decode report.
    Report,
}

impl ScratchKey {
    pub fn read_response(send_sequence: u8) -> Self {
        Self::ReadResponse((ETHERTYPE_EPL << 16) | send_sequence as u32)
    }
}

#[derive(Debug, Clone)]
pub enum ScratchValue {
    Verdict(SequenceVerdict),
    ReadRequest(ReadRequest),
    Report(Arc<FrameReport>),
}

/// Concurrent `(frame, key) -> value` map.
#[derive(Debug, Default)]
pub struct ScratchStore {
    slots: DashMap<(u32, ScratchKey), ScratchValue>,
}

impl ScratchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, frame: u32, key: ScratchKey) -> Option<ScratchValue> {
        self.slots.get(&(frame, key)).map(|v| v.value().clone())
    }

    pub fn insert(&self, frame: u32, key: ScratchKey, value: ScratchValue) {
        self.slots.insert((frame, key), value);
    }

    pub fn verdict(&self, frame: u32) -> Option<SequenceVerdict> {
        match self.get(frame, ScratchKey::Verdict)? {
            ScratchValue::Verdict(v) => Some(v),
            _ => None,
        }
    }

    pub fn report(&self, frame: u32) -> Option<Arc<FrameReport>> {
        match self.get(frame, ScratchKey::Report)? {
            ScratchValue::Report(r) => Some(r),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Forget everything (capture-wide reset).
    pub fn clear(&self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_response_key() {
        assert_eq!(
            ScratchKey::read_response(0x0A),
            ScratchKey::ReadResponse(0x88AB_000A)
        );
    }

    #[test]
    fn test_values_are_per_frame() {
        let store = ScratchStore::new();
        store.insert(1, ScratchKey::Verdict, ScratchValue::Verdict(SequenceVerdict::Empty));
        assert_eq!(store.verdict(1), Some(SequenceVerdict::Empty));
        assert_eq!(store.verdict(2), None);
        assert!(store.report(1).is_none());

        store.clear();
        assert!(store.is_empty());
    }
}
