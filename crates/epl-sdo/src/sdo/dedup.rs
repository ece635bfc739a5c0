// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Duplicate-frame cache for the SDO sequence layer.
//!
//! Maps `(source, destination, recv_seq, send_seq)` to the most recent
//! frame that carried that tuple. Entries never expire on their own:
//! they are purged per node pair on connection reset or when the
//! receive sequence wraps.

use std::collections::HashMap;

use super::sequence::MAX_SEQUENCE;

/// Cache key; sequence numbers are reduced modulo 64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    pub src: u8,
    pub dest: u8,
    pub recv_seq: u8,
    pub send_seq: u8,
}

impl DuplicateKey {
    pub fn new(src: u8, dest: u8, recv_seq: u8, send_seq: u8) -> Self {
        Self {
            src,
            dest,
            recv_seq: recv_seq % MAX_SEQUENCE,
            send_seq: send_seq % MAX_SEQUENCE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateCache {
    entries: HashMap<DuplicateKey, u32>,
}

impl DuplicateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame last recorded for `key`.
    pub fn get(&self, key: &DuplicateKey) -> Option<u32> {
        self.entries.get(key).copied()
    }

    /// Record (or overwrite) the frame seen with `key`.
    pub fn record(&mut self, key: DuplicateKey, frame: u32) {
        self.entries.insert(key, frame);
    }

    /// Drop every entry of one `(src, dest)` pair. Returns how many went.
    pub fn purge_pair(&mut self, src: u8, dest: u8) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !(k.src == src && k.dest == dest));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
