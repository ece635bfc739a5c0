// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDO command layer.
//!
//! ```text
//! 0         1          2                    3           4..6          6..8
//! reserved | trans. id | resp|abort|seg(2)  | command id | segment size | reserved
//! [Initiate only]  8..12 data size (u32 LE)
//! data ...
//! ```
//!
//! The segment size counts the bytes after the 8-byte header, data size
//! field included. Payload reads are clamped to it and to the captured
//! bytes.

use crate::frame::{le_u16, le_u32};
use crate::mapping::ObjectAddress;

/// Fixed command layer header length.
pub const COMMAND_HEADER_LEN: usize = 8;

const FLAG_RESPONSE: u8 = 0x80;
const FLAG_ABORT: u8 = 0x40;
const SEGMENTATION_MASK: u8 = 0x30;

/// Transfer segmentation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Segmentation {
    Expedited,
    Initiate,
    Segment,
    Complete,
}

impl Segmentation {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Expedited,
            1 => Self::Initiate,
            2 => Self::Segment,
            _ => Self::Complete,
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Expedited => "Exp",
            Self::Initiate => "Init",
            Self::Segment => "Seg",
            Self::Complete => "End",
        }
    }
}

/// SDO command identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CommandId {
    Nil,
    WriteByIndex,
    ReadByIndex,
    WriteAllByIndex,
    ReadAllByIndex,
    WriteByName,
    ReadByName,
    FileWrite,
    FileRead,
    WriteMultipleParamByIndex,
    ReadMultipleParamByIndex,
    MaxSegmentSize,
    LinkNameToIndex,
    Unknown(u8),
}

impl CommandId {
    pub fn from_u8(id: u8) -> Self {
        match id {
            0x00 => Self::Nil,
            0x01 => Self::WriteByIndex,
            0x02 => Self::ReadByIndex,
            0x03 => Self::WriteAllByIndex,
            0x04 => Self::ReadAllByIndex,
            0x05 => Self::WriteByName,
            0x06 => Self::ReadByName,
            0x20 => Self::FileWrite,
            0x21 => Self::FileRead,
            0x31 => Self::WriteMultipleParamByIndex,
            0x32 => Self::ReadMultipleParamByIndex,
            0x70 => Self::MaxSegmentSize,
            0x71 => Self::LinkNameToIndex,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Nil => 0x00,
            Self::WriteByIndex => 0x01,
            Self::ReadByIndex => 0x02,
            Self::WriteAllByIndex => 0x03,
            Self::ReadAllByIndex => 0x04,
            Self::WriteByName => 0x05,
            Self::ReadByName => 0x06,
            Self::FileWrite => 0x20,
            Self::FileRead => 0x21,
            Self::WriteMultipleParamByIndex => 0x31,
            Self::ReadMultipleParamByIndex => 0x32,
            Self::MaxSegmentSize => 0x70,
            Self::LinkNameToIndex => 0x71,
            Self::Unknown(id) => id,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Nil => "Nil",
            Self::WriteByIndex => "WriteByIndex",
            Self::ReadByIndex => "ReadByIndex",
            Self::WriteAllByIndex => "WriteAllByIndex",
            Self::ReadAllByIndex => "ReadAllByIndex",
            Self::WriteByName => "WriteByName",
            Self::ReadByName => "ReadByName",
            Self::FileWrite => "FileWrite",
            Self::FileRead => "FileRead",
            Self::WriteMultipleParamByIndex => "WriteMultipleParamByIndex",
            Self::ReadMultipleParamByIndex => "ReadMultipleParamByIndex",
            Self::MaxSegmentSize => "MaxSegmentSize",
            Self::LinkNameToIndex => "LinkNameToIndex",
            Self::Unknown(_) => "Unknown",
        }
    }
}

// ============================================================================
// Header
// ============================================================================

/// Parsed command layer header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CommandHeader {
    pub transaction_id: u8,
    pub response: bool,
    pub abort: bool,
    pub segmentation: Segmentation,
    pub command: CommandId,
    pub segment_size: u16,
    /// Total transfer size, present on Initiate segments.
    pub data_size: Option<u32>,
}

impl CommandHeader {
    /// Parse the header at the start of `cmd`.
    ///
    /// Returns `None` when too few bytes remain to tell the command id.
    /// Missing trailing header fields read as zero.
    pub fn parse(cmd: &[u8]) -> Option<Self> {
        let flags = *cmd.get(2)?;
        let command = CommandId::from_u8(*cmd.get(3)?);
        let segmentation = Segmentation::from_bits((flags & SEGMENTATION_MASK) >> 4);
        let data_size = if segmentation == Segmentation::Initiate {
            le_u32(cmd, COMMAND_HEADER_LEN)
        } else {
            None
        };

        Some(Self {
            transaction_id: cmd.get(1).copied().unwrap_or(0),
            response: flags & FLAG_RESPONSE != 0,
            abort: flags & FLAG_ABORT != 0,
            segmentation,
            command,
            segment_size: le_u16(cmd, 4).unwrap_or(0),
            data_size,
        })
    }

    /// No command follows (id 0 without abort).
    pub fn is_empty(&self) -> bool {
        self.command == CommandId::Nil && !self.abort
    }

    /// Offset of the first data byte, relative to the command layer.
    pub fn data_offset(&self) -> usize {
        match self.segmentation {
            Segmentation::Initiate => COMMAND_HEADER_LEN + 4,
            _ => COMMAND_HEADER_LEN,
        }
    }

    /// End of the segment (exclusive), relative to the command layer.
    pub fn segment_end(&self) -> usize {
        COMMAND_HEADER_LEN + self.segment_size as usize
    }

    /// Data bytes of this segment, clamped to segment size and capture.
    pub fn data<'a>(&self, cmd: &'a [u8]) -> &'a [u8] {
        let end = self.segment_end().min(cmd.len());
        cmd.get(self.data_offset()..end).unwrap_or(&[])
    }

    /// Bytes the segment declares after the header vs bytes captured.
    pub fn captured_len(&self, cmd: &[u8]) -> usize {
        cmd.len().saturating_sub(COMMAND_HEADER_LEN).min(self.segment_size as usize)
    }
}

impl std::fmt::Display for CommandHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cmd:{},TID={:02} {}[{}]",
            self.segmentation.abbreviation(),
            self.transaction_id,
            self.command.name(),
            self.segment_size
        )?;
        if self.response {
            f.write_str(" Response")?;
        }
        Ok(())
    }
}

// ============================================================================
// Request bodies
// ============================================================================

/// Index/sub-index prefix of ByIndex requests (4 bytes with reserved).
pub fn parse_address(data: &[u8]) -> Option<ObjectAddress> {
    Some(ObjectAddress::new(le_u16(data, 0)?, *data.get(2)?))
}

/// One entry of a WriteMultipleParamByIndex request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipleEntry<'a> {
    pub address: ObjectAddress,
    pub padding: u8,
    pub data: &'a [u8],
}

const ENTRY_HEADER_LEN: usize = 8;

/// Walk the entry list of a WriteMultipleParamByIndex request.
///
/// `start..end` is the entry area relative to the command layer; each
/// entry's "next" field is an offset from the command layer start, 0 on
/// the final entry. Stops at the first inconsistent entry.
pub fn parse_multiple_entries(cmd: &[u8], start: usize, end: usize) -> Vec<MultipleEntry<'_>> {
    let end = end.min(cmd.len());
    let mut entries = Vec::new();
    let mut cursor = start;

    while cursor < end {
        let remaining = end - cursor;
        if remaining < ENTRY_HEADER_LEN {
            break;
        }
        let Some(next) = le_u32(cmd, cursor) else {
            break;
        };
        let Some(flags) = cmd.get(cursor + 7) else {
            break;
        };
        let padding = flags & 0x03;
        let last = next == 0;

        let (span, size) = if last {
            (remaining, remaining - ENTRY_HEADER_LEN)
        } else {
            let Some(span) = (next as usize).checked_sub(cursor) else {
                break;
            };
            if span > remaining || padding as usize + ENTRY_HEADER_LEN >= span {
                break;
            }
            (span, span - ENTRY_HEADER_LEN - padding as usize)
        };

        let Some(address) = parse_address(&cmd[cursor + 4..]) else {
            break;
        };
        let data_start = cursor + ENTRY_HEADER_LEN;
        entries.push(MultipleEntry {
            address,
            padding,
            data: &cmd[data_start..data_start + size],
        });

        if last {
            break;
        }
        cursor += span;
    }

    entries
}
