// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Captured frames and POWERLINK frame classification.
//!
//! ```text
//! 0        1      2      3 ...
//! | mtyp  | dest | src  | message specific
//!   & 0x7F
//! ```

/// Managing node id.
pub const MN_NODE_ID: u8 = 240;

/// One captured frame.
///
/// `reported_len` is the on-wire length; `data` may be shorter when the
/// capture was truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub number: u32,
    pub data: Vec<u8>,
    pub reported_len: usize,
}

impl Frame {
    pub fn new(number: u32, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let reported_len = data.len();
        Self {
            number,
            data,
            reported_len,
        }
    }

    /// Mark the frame as truncated from `reported_len` bytes.
    pub fn with_reported_len(mut self, reported_len: usize) -> Self {
        self.reported_len = reported_len.max(self.data.len());
        self
    }

    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.reported_len
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.data.first().map(|b| MessageType::from_u8(b & 0x7F))
    }

    pub fn dest(&self) -> Option<u8> {
        self.data.get(1).copied()
    }

    pub fn src(&self) -> Option<u8> {
        self.data.get(2).copied()
    }
}

// ============================================================================
// Classification
// ============================================================================

/// POWERLINK message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MessageType {
    /// Start of Cycle.
    Soc,
    /// Poll Request.
    Preq,
    /// Poll Response.
    Pres,
    /// Start of Asynchronous.
    Soa,
    /// Asynchronous Send.
    Asnd,
    /// Active managing node indication.
    Amni,
    /// Asynchronous invite.
    Ainv,
    /// Not a POWERLINK frame.
    Unknown(u8),
}

impl MessageType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::Soc,
            0x03 => Self::Preq,
            0x04 => Self::Pres,
            0x05 => Self::Soa,
            0x06 => Self::Asnd,
            0x07 => Self::Amni,
            0x0D => Self::Ainv,
            other => Self::Unknown(other),
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Soc => "SoC",
            Self::Preq => "PReq",
            Self::Pres => "PRes",
            Self::Soa => "SoA",
            Self::Asnd => "ASnd",
            Self::Amni => "AMNI",
            Self::Ainv => "AInv",
            Self::Unknown(_) => "?",
        }
    }
}

/// ASnd / AInv service id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ServiceId {
    IdentResponse,
    StatusResponse,
    NmtRequest,
    NmtCommand,
    Sdo,
    SyncResponse,
    Other(u8),
}

impl ServiceId {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::IdentResponse,
            0x02 => Self::StatusResponse,
            0x03 => Self::NmtRequest,
            0x04 => Self::NmtCommand,
            0x05 => Self::Sdo,
            0x06 => Self::SyncResponse,
            other => Self::Other(other),
        }
    }
}

/// Node id class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Dynamic,
    ControlledNode,
    ManagingNode,
    Reserved,
    Diagnostic,
    Router,
    Broadcast,
}

impl NodeClass {
    pub fn of(node_id: u8) -> Self {
        match node_id {
            0 => Self::Dynamic,
            1..=239 => Self::ControlledNode,
            240 => Self::ManagingNode,
            253 => Self::Diagnostic,
            254 => Self::Router,
            255 => Self::Broadcast,
            _ => Self::Reserved,
        }
    }
}

pub fn is_controlled_node(node_id: u8) -> bool {
    NodeClass::of(node_id) == NodeClass::ControlledNode
}

/// Conversation key: the CN taking part, else 0.
pub fn conversation_key(src: u8, dest: u8) -> u8 {
    if is_controlled_node(src) {
        src
    } else if is_controlled_node(dest) {
        dest
    } else {
        0
    }
}

// ============================================================================
// Byte readers
// ============================================================================

pub fn le_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub fn le_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
