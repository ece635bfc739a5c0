// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Segmented SDO transfer reassembly.
//!
//! One [`FragmentReassembler`] exists per transfer direction per
//! conversation: downloads (WriteByIndex requests) and uploads
//! (ReadByIndex responses) never share state.
//!
//! # Fragment ordering
//!
//! The 6-bit sequence numbers wrap and belong to the reliability layer,
//! so a fragment's position in its group is taken from a per-direction
//! counter, not from the sequence number:
//!
//! ```text
//! frame   seg        (recv,send)  slot[recv][send]   counter  position
//!   10    Initiate   (4, 5)       -                  0        0
//!   11    Segment    (4, 6)       0 -> 11            1        1
//!   12    Complete   (4, 7)       0 -> 12            2        2   => emit
//! ```
//!
//! The 64x64 slot table remembers which frame opened each sequence pair,
//! so a retransmitted segment is recognized instead of being appended a
//! second time. A segment arriving without an open group starts a fresh
//! group: the output of a broken transfer is visibly short rather than
//! silently spliced with an older one.

use super::sequence::{MAX_SEQUENCE, SEQUENCE_WRAP};

const SLOTS: usize = MAX_SEQUENCE as usize;

/// Transfer direction, named from the client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TransferDirection {
    /// Client to server (WriteByIndex requests).
    Download,
    /// Server to client (ReadByIndex responses).
    Upload,
}

/// One segmented fragment as seen on the wire.
#[derive(Debug, Clone, Copy)]
pub struct Fragment<'a> {
    pub frame: u32,
    pub recv_seq: u8,
    pub send_seq: u8,
    /// Data bytes only, command headers stripped.
    pub data: &'a [u8],
}

/// A completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Reassembled {
    pub direction: TransferDirection,
    pub data: Vec<u8>,
    /// Data size announced by the Initiate segment, if it was seen.
    pub declared: Option<u32>,
    pub first_frame: u32,
    pub last_frame: u32,
    pub fragments: usize,
}

impl Reassembled {
    /// Announced size disagrees with what was reassembled.
    pub fn length_mismatch(&self) -> bool {
        self.declared.is_some_and(|d| d as usize != self.data.len())
    }
}

/// Reassembler statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReassemblerStats {
    /// Fragments accepted into a group.
    pub fragments: u64,
    /// Groups opened (Initiate or fallback).
    pub groups_started: u64,
    /// Transfers emitted.
    pub payloads_reassembled: u64,
    /// Groups opened by a segment with no open group, or abandoned by a
    /// new Initiate.
    pub restarts: u64,
    /// Retransmitted segments not appended again.
    pub retransmissions: u64,
}

#[derive(Debug, Clone, Default)]
struct PendingGroup {
    declared: Option<u32>,
    first_frame: u32,
    last_frame: u32,
    received: usize,
    /// (position, data) in arrival order.
    fragments: Vec<(u32, Vec<u8>)>,
}

impl PendingGroup {
    fn push(&mut self, frame: u32, position: u32, data: &[u8]) {
        self.last_frame = frame;
        self.received += data.len();
        self.fragments.push((position, data.to_vec()));
    }

    /// Every announced byte has arrived.
    fn drained(&self) -> bool {
        self.declared
            .is_some_and(|declared| declared > 0 && self.received >= declared as usize)
    }

    fn finish(mut self, direction: TransferDirection) -> Reassembled {
        // Stable: equal positions keep arrival order.
        self.fragments.sort_by_key(|(pos, _)| *pos);
        let fragments = self.fragments.len();
        let data = self.fragments.into_iter().flat_map(|(_, d)| d).collect();
        Reassembled {
            direction,
            data,
            declared: self.declared,
            first_frame: self.first_frame,
            last_frame: self.last_frame,
            fragments,
        }
    }
}

/// Per-direction multi-frame payload accumulator.
#[derive(Debug, Clone)]
pub struct FragmentReassembler {
    direction: TransferDirection,
    /// Frame that opened each (recv, send) slot; 0 = unopened.
    slots: Box<[[u32; SLOTS]; SLOTS]>,
    counter: u32,
    group: Option<PendingGroup>,
    stats: ReassemblerStats,
}

impl FragmentReassembler {
    pub fn new(direction: TransferDirection) -> Self {
        Self {
            direction,
            slots: Box::new([[0; SLOTS]; SLOTS]),
            counter: 0,
            group: None,
            stats: ReassemblerStats::default(),
        }
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn stats(&self) -> &ReassemblerStats {
        &self.stats
    }

    /// A group is collecting fragments.
    pub fn is_open(&self) -> bool {
        self.group.is_some()
    }

    /// Current fragment counter.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Frame recorded for a sequence pair (0 if unopened).
    pub fn slot(&self, recv_seq: u8, send_seq: u8) -> u32 {
        self.slots[slot_index(recv_seq)][slot_index(send_seq)]
    }

    /// Handle an Initiate segment carrying the first data bytes.
    ///
    /// The counter restarts unless the sender requested an acknowledge,
    /// in which case this Initiate repeats one already counted.
    pub fn initiate(&mut self, frame: u32, declared: u32, ack_requested: bool, data: &[u8]) {
        if !ack_requested {
            self.counter = 0;
        }
        if self.group.is_some() {
            self.stats.restarts += 1;
            log::debug!(
                "[reassembly] {:?}: frame {} abandons open group",
                self.direction,
                frame
            );
        }

        let mut group = PendingGroup {
            declared: Some(declared),
            first_frame: frame,
            ..Default::default()
        };
        group.push(frame, 0, data);
        self.group = Some(group);
        self.stats.groups_started += 1;
        self.stats.fragments += 1;
    }

    /// Handle a Segment (`complete == false`) or TransferComplete.
    ///
    /// Returns the reassembled transfer when `complete` closes a group.
    /// An upload also closes once the size announced by its Initiate has
    /// been received.
    pub fn segment(&mut self, fragment: Fragment<'_>, complete: bool) -> Option<Reassembled> {
        let accepted = match self.direction {
            TransferDirection::Download => self.accept_download(&fragment),
            TransferDirection::Upload => self.accept_upload(&fragment),
        };

        if !accepted {
            self.stats.retransmissions += 1;
            log::trace!(
                "[reassembly] {:?}: frame {} repeats slot ({}, {})",
                self.direction,
                fragment.frame,
                fragment.recv_seq,
                fragment.send_seq
            );
            return None;
        }

        self.add(fragment.frame, fragment.data);

        let drained = self.direction == TransferDirection::Upload
            && self.group.as_ref().is_some_and(PendingGroup::drained);
        if !complete && !drained {
            return None;
        }

        let done = self.group.take()?.finish(self.direction);
        self.counter = 0;
        if self.direction == TransferDirection::Upload {
            self.slots[slot_index(fragment.recv_seq)] = [0; SLOTS];
        }
        self.stats.payloads_reassembled += 1;
        log::debug!(
            "[reassembly] {:?}: {} bytes from {} fragments (frames {}..={})",
            self.direction,
            done.data.len(),
            done.fragments,
            done.first_frame,
            done.last_frame
        );
        Some(done)
    }

    /// Drop all state.
    pub fn reset(&mut self) {
        *self.slots = [[0; SLOTS]; SLOTS];
        self.counter = 0;
        self.group = None;
    }

    fn accept_download(&mut self, fragment: &Fragment<'_>) -> bool {
        let (r, s) = (slot_index(fragment.recv_seq), slot_index(fragment.send_seq));

        // Send sequence at its cycle boundary: the table starts over.
        if fragment.send_seq == SEQUENCE_WRAP || fragment.send_seq <= 1 {
            *self.slots = [[0; SLOTS]; SLOTS];
            self.slots[r][s] = fragment.frame;
            self.counter += 1;
            return true;
        }

        if self.slots[r][s] == 0 {
            self.slots[r][s] = fragment.frame;
            self.counter += 1;
            true
        } else {
            self.slots[r][s] = fragment.frame;
            false
        }
    }

    fn accept_upload(&mut self, fragment: &Fragment<'_>) -> bool {
        let (r, s) = (slot_index(fragment.recv_seq), slot_index(fragment.send_seq));
        let opened = self.slots[r][s];

        if opened != 0 && opened != fragment.frame {
            return false;
        }
        if opened == 0 {
            self.counter += 1;
        }
        self.slots[r][s] = fragment.frame;
        true
    }

    fn add(&mut self, frame: u32, data: &[u8]) {
        let position = self.counter;
        match self.group.as_mut() {
            Some(group) => group.push(frame, position, data),
            None => {
                log::debug!(
                    "[reassembly] {:?}: frame {} has no open group, starting a new one",
                    self.direction,
                    frame
                );
                let mut group = PendingGroup {
                    first_frame: frame,
                    ..Default::default()
                };
                group.push(frame, position, data);
                self.group = Some(group);
                self.stats.groups_started += 1;
                self.stats.restarts += 1;
            }
        }
        self.stats.fragments += 1;
    }
}

fn slot_index(seq: u8) -> usize {
    (seq % MAX_SEQUENCE) as usize
}
