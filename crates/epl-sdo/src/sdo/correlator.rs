// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ReadByIndex request/response correlation.
//!
//! A ReadByIndex response does not repeat the index and sub-index it
//! answers. Each conversation keeps the last four requests in a ring,
//! tagged with the send-sequence byte in effect when the request was
//! seen; a response is matched against its own send-sequence byte.
//!
//! ```text
//!   next -> [0] 0x1018:01 @ 0x0A
//!           [1] 0x1006:00 @ 0x0E
//!           [2] -
//!           [3] -
//! ```
//!
//! Matches are pinned per frame in the [`ScratchStore`] so that a second
//! pass over the capture resolves a response identically even after the
//! ring has moved on.

use crate::dictionary::Resolution;
use crate::mapping::ObjectAddress;
use crate::scratch::{ScratchKey, ScratchStore, ScratchValue};

/// Ring capacity.
pub const READ_RING_SLOTS: usize = 4;

/// One remembered ReadByIndex request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReadRequest {
    /// Raw send-sequence byte at request time.
    pub send_sequence: u8,
    pub address: ObjectAddress,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Default)]
pub struct ReadRequestCorrelator {
    slots: [Option<ReadRequest>; READ_RING_SLOTS],
    next: usize,
}

impl ReadRequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a request, overwriting the oldest slot.
    pub fn record(&mut self, send_sequence: u8, address: ObjectAddress, resolution: Resolution) {
        self.slots[self.next] = Some(ReadRequest {
            send_sequence,
            address,
            resolution,
        });
        self.next = (self.next + 1) % READ_RING_SLOTS;
    }

    /// First ring entry recorded under `send_sequence`.
    pub fn find(&self, send_sequence: u8) -> Option<&ReadRequest> {
        self.slots
            .iter()
            .flatten()
            .find(|r| r.send_sequence == send_sequence)
    }

    /// Resolve the response carried by `frame`.
    ///
    /// A resolution already pinned to this frame wins; otherwise the ring
    /// is scanned and a hit is pinned. `None` means unresolved.
    pub fn resolve(&self, scratch: &ScratchStore, frame: u32, send_sequence: u8) -> Option<ReadRequest> {
        let key = ScratchKey::read_response(send_sequence);
        if let Some(ScratchValue::ReadRequest(req)) = scratch.get(frame, key) {
            return Some(req);
        }

        let req = self.find(send_sequence)?.clone();
        scratch.insert(frame, key, ScratchValue::ReadRequest(req.clone()));
        Some(req)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
