// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDO sequence layer: header parsing and the duplicate state machine.
//!
//! ```text
//! byte 0: recv_seq(6) | recv_con(2)
//! byte 1: send_seq(6) | send_con(2)
//! byte 2..4: reserved
//! ```
//!
//! The pair of connection codes selects the link phase:
//!
//! ```text
//!  rcon\scon   None   Init      Valid      AckReq
//!  None        Close  InitReq   (reset)
//!  Init               InitAck   InitResp
//!  Valid       (reset)          Valid      AckReq
//!  Retrans                      Retrans
//! ```
//!
//! Every frame goes through [`SequenceStateMachine::process`], which
//! consults and updates the conversation's [`DuplicateCache`] and returns
//! a [`SequenceVerdict`] deciding whether the command layer is decoded.

use crate::diagnostics::{Diagnostic, DiagnosticKind, SequenceField};

use super::dedup::{DuplicateCache, DuplicateKey};

/// Sequence numbers are 6 bits wide.
pub const MAX_SEQUENCE: u8 = 0x40;

/// Last sequence number before wraparound.
pub const SEQUENCE_WRAP: u8 = 0x3F;

/// Size of the sequence layer header in bytes.
pub const SEQUENCE_HEADER_LEN: usize = 4;

/// Default frame-number gap inside which a repeated tuple is a duplicate.
pub const DEFAULT_DUPLICATE_WINDOW: u32 = 64;

// ============================================================================
// Header
// ============================================================================

/// 2-bit connection code of one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionCode {
    NoConnection = 0,
    Initialization = 1,
    Valid = 2,
    /// Retransmission request (receive side) or ack request (send side).
    ErrorResponse = 3,
}

impl ConnectionCode {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::NoConnection),
            1 => Some(Self::Initialization),
            2 => Some(Self::Valid),
            3 => Some(Self::ErrorResponse),
            _ => None,
        }
    }

    /// One-letter abbreviation used in summaries.
    pub fn abbreviation(bits: u8) -> &'static str {
        match Self::from_bits(bits) {
            Some(Self::NoConnection) => "n",
            Some(Self::Initialization) => "i",
            Some(Self::Valid) => "c",
            Some(Self::ErrorResponse) => "e",
            None => "x",
        }
    }
}

const VALID: u8 = ConnectionCode::Valid as u8;
const RETRANSMISSION: u8 = ConnectionCode::ErrorResponse as u8;

/// Link phase named by the `(recv_con, send_con)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LinkState {
    InitRequest,
    InitAck,
    InitResponse,
    Valid,
    Retransmission,
    AckRequest,
    Close,
}

impl LinkState {
    pub fn from_codes(recv_con: u8, send_con: u8) -> Option<Self> {
        match (recv_con, send_con) {
            (0, 1) => Some(Self::InitRequest),
            (1, 1) => Some(Self::InitAck),
            (1, 2) => Some(Self::InitResponse),
            (2, 2) => Some(Self::Valid),
            (3, 2) => Some(Self::Retransmission),
            (2, 3) => Some(Self::AckRequest),
            (0, 0) => Some(Self::Close),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitRequest => "InitReq",
            Self::InitAck => "InitAck",
            Self::InitResponse => "InitResp",
            Self::Valid => "Valid",
            Self::Retransmission => "Retrans",
            Self::AckRequest => "AckReq",
            Self::Close => "Close",
        }
    }
}

/// Decoded sequence layer header.
///
/// Values are kept as raw integers so that out-of-range headers (from
/// crafted input or [`SequenceHeader::new`]) can still be represented
/// and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SequenceHeader {
    pub recv_seq: u8,
    pub recv_con: u8,
    pub send_seq: u8,
    pub send_con: u8,
}

impl SequenceHeader {
    pub fn new(recv_seq: u8, recv_con: u8, send_seq: u8, send_con: u8) -> Self {
        Self {
            recv_seq,
            recv_con,
            send_seq,
            send_con,
        }
    }

    /// Parse the first two bytes of the layer; `None` if fewer than two.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let recv = *buf.first()?;
        let send = *buf.get(1)?;
        Some(Self {
            recv_seq: recv >> 2,
            recv_con: recv & 0x03,
            send_seq: send >> 2,
            send_con: send & 0x03,
        })
    }

    /// Send byte as carried on the wire.
    pub fn raw_send(&self) -> u8 {
        (self.send_seq << 2) | (self.send_con & 0x03)
    }

    /// Receive byte as carried on the wire.
    pub fn raw_recv(&self) -> u8 {
        (self.recv_seq << 2) | (self.recv_con & 0x03)
    }

    pub fn link_state(&self) -> Option<LinkState> {
        LinkState::from_codes(self.recv_con, self.send_con)
    }

    /// Link is (re-)initializing: no command layer follows.
    pub fn is_initializing(&self) -> bool {
        let (r, s) = (self.recv_con, self.send_con);
        (r < VALID && s < VALID) || (r == VALID && s < VALID) || (r < VALID && s == VALID)
    }

    pub fn is_out_of_range(&self) -> bool {
        self.recv_seq >= MAX_SEQUENCE
            || self.send_seq >= MAX_SEQUENCE
            || self.recv_con > RETRANSMISSION
            || self.send_con > RETRANSMISSION
    }

    /// Retransmission request or valid connection with ack request.
    pub fn is_retransmission(&self) -> bool {
        (self.recv_con == VALID && self.send_con == RETRANSMISSION)
            || (self.recv_con == RETRANSMISSION && self.send_con == VALID)
    }

    /// Sender asked for an acknowledge (send code 3).
    pub fn ack_requested(&self) -> bool {
        self.send_con == RETRANSMISSION
    }
}

impl std::fmt::Display for SequenceHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Seq:{:02}{},{:02}{} ({})",
            self.recv_seq,
            ConnectionCode::abbreviation(self.recv_con),
            self.send_seq,
            ConnectionCode::abbreviation(self.send_con),
            self.link_state().map_or("Invalid", LinkState::as_str)
        )
    }
}

// ============================================================================
// State machine
// ============================================================================

/// Outcome of the sequence layer for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SequenceVerdict {
    /// Command layer follows and is decoded.
    Normal,
    /// Same tuple already seen at `original`.
    Duplicate { original: u32 },
    /// Link (re-)initialization, no command layer.
    Empty,
}

impl SequenceVerdict {
    /// Whether the command layer should be decoded for this frame.
    pub fn decodes_command_layer(self, show_duplicates: bool) -> bool {
        match self {
            Self::Normal => true,
            Self::Duplicate { .. } => show_duplicates,
            Self::Empty => false,
        }
    }

    pub fn is_duplicate(self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Connection phase tracker driving the duplicate cache.
#[derive(Debug, Clone, Copy)]
pub struct SequenceStateMachine {
    window: u32,
}

impl Default for SequenceStateMachine {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLICATE_WINDOW)
    }
}

impl SequenceStateMachine {
    pub fn new(window: u32) -> Self {
        Self { window }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    /// Run one frame through the state machine.
    ///
    /// `src`/`dest` are the frame's node addresses. Malformed headers are
    /// reported into `findings` and still yield [`SequenceVerdict::Normal`].
    pub fn process(
        &self,
        cache: &mut DuplicateCache,
        src: u8,
        dest: u8,
        header: &SequenceHeader,
        frame: u32,
        findings: &mut Vec<Diagnostic>,
    ) -> SequenceVerdict {
        let key = DuplicateKey::new(src, dest, header.recv_seq, header.send_seq);
        let saved = cache.get(&key);
        let mut verdict = SequenceVerdict::Normal;

        if header.is_initializing() {
            let purged = cache.purge_pair(src, dest);
            log::trace!(
                "[sdo-seq] frame {}: link init {}->{}, purged {} entries",
                frame,
                src,
                dest,
                purged
            );
            verdict = SequenceVerdict::Empty;
        } else if header.is_out_of_range() {
            report_out_of_range(header, frame, findings);
        } else if header.is_retransmission() {
            cache.record(key, frame);
        } else {
            match saved {
                None => cache.record(key, frame),
                Some(saved) => {
                    let horizon = saved.saturating_add(self.window);
                    if frame > horizon || saved > frame {
                        cache.record(key, frame);
                    } else if frame < horizon && frame > saved {
                        verdict = SequenceVerdict::Duplicate { original: saved };
                    }
                }
            }
        }

        if let SequenceVerdict::Duplicate { original } = verdict {
            log::debug!(
                "[sdo-seq] frame {} duplicates frame {} ({})",
                frame,
                original,
                header
            );
            findings.push(Diagnostic::new(
                frame,
                DiagnosticKind::DuplicatedFrame {
                    original,
                    recv_seq: header.recv_seq,
                    send_seq: header.send_seq,
                },
            ));
        }

        // Receive side wrapped: the transfer's tuples are free for reuse.
        if header.recv_seq == SEQUENCE_WRAP && header.send_seq <= SEQUENCE_WRAP {
            cache.purge_pair(src, dest);
        }

        verdict
    }
}

fn report_out_of_range(header: &SequenceHeader, frame: u32, findings: &mut Vec<Diagnostic>) {
    let mut push = |kind| findings.push(Diagnostic::new(frame, kind));

    if header.recv_seq >= MAX_SEQUENCE {
        push(DiagnosticKind::SequenceRange {
            field: SequenceField::Receive,
            value: header.recv_seq,
        });
    }
    if header.send_seq >= MAX_SEQUENCE {
        push(DiagnosticKind::SequenceRange {
            field: SequenceField::Send,
            value: header.send_seq,
        });
    }
    if header.recv_con > RETRANSMISSION {
        push(DiagnosticKind::ConnectionCode {
            field: SequenceField::Receive,
            value: header.recv_con,
        });
    }
    if header.send_con > RETRANSMISSION {
        push(DiagnosticKind::ConnectionCode {
            field: SequenceField::Send,
            value: header.send_con,
        });
    }
    log::warn!("[sdo-seq] frame {}: malformed sequence header {:?}", frame, header);
}
