// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDO abort codes.

use crate::frame::{le_u16, le_u32};
use crate::mapping::ObjectAddress;

/// Standard description of an abort code.
pub fn abort_description(code: u32) -> Option<&'static str> {
    let text = match code {
        0x0503_0000 => "reserved",
        0x0504_0000 => "SDO protocol timed out.",
        0x0504_0001 => "Client/server Command ID not valid or unknown.",
        0x0504_0002 => "Invalid block size.",
        0x0504_0003 => "Invalid sequence number.",
        0x0504_0004 => "reserved",
        0x0504_0005 => "Out of memory.",
        0x0601_0000 => "Unsupported access to an object.",
        0x0601_0001 => "Attempt to read a write-only object.",
        0x0601_0002 => "Attempt to write a read-only object.",
        0x0602_0000 => "Object does not exist in the object dictionary.",
        0x0604_0041 => "Object cannot be mapped to the PDO.",
        0x0604_0042 => "The number and length of the objects to be mapped would exceed PDO length.",
        0x0604_0043 => "General parameter incompatibility.",
        0x0604_0047 => "General internal incompatibility in the device.",
        0x0606_0000 => "Access failed due to a hardware error.",
        0x0607_0010 => "Data type does not match, length of service parameter does not match.",
        0x0607_0012 => "Data type does not match, length of service parameter too high.",
        0x0607_0013 => "Data type does not match, length of service parameter too low.",
        0x0609_0011 => "Sub-index does not exist.",
        0x0609_0030 => "Value range of parameter exceeded (only for write access).",
        0x0609_0031 => "Value of parameter written too high.",
        0x0609_0032 => "Value of parameter written too low.",
        0x0609_0036 => "Maximum value is less then minimum value.",
        0x0800_0000 => "General error",
        0x0800_0020 => "Data cannot be transferred or stored to the application.",
        0x0800_0021 => "Data cannot be transferred or stored to the application because of local control.",
        0x0800_0022 => "Data cannot be transferred or stored to the application because of the present device state.",
        0x0800_0023 => "Object dictionary dynamic generation fails or no object dictionary is present.",
        0x0800_0024 => "EDS, DCF or Concise DCF Data set empty.",
        _ => return None,
    };
    Some(text)
}

/// Abort code with its description, `Unknown` when not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AbortCode(pub u32);

impl AbortCode {
    pub fn description(self) -> &'static str {
        abort_description(self.0).unwrap_or("Unknown")
    }
}

impl std::fmt::Display for AbortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X} ({})", self.0, self.description())
    }
}

/// One entry of a WriteMultipleParamByIndex abort response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AbortRecord {
    pub address: ObjectAddress,
    pub sub_abort: u8,
    pub code: AbortCode,
}

/// Parse consecutive 8-byte abort records; a trailing partial record is
/// ignored.
pub fn parse_abort_records(buf: &[u8]) -> Vec<AbortRecord> {
    buf.chunks_exact(8)
        .filter_map(|rec| {
            Some(AbortRecord {
                address: ObjectAddress::new(le_u16(rec, 0)?, rec[2]),
                sub_abort: rec[3],
                code: AbortCode(le_u32(rec, 4)?),
            })
        })
        .collect()
}
