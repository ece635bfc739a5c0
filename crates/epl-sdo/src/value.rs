// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object dictionary value types and payload decoding.
//!
//! A payload window is decoded with its dictionary type when the type is
//! variable-width or its fixed width matches the window. Anything else
//! falls back to an unsigned little-endian integer (1..=8 bytes) and
//! finally to a raw byte dump:
//!
//! ```text
//! typed (width == len || width == 0)  ->  Value::{Boolean, Integer, ...}
//! 1 <= len <= 8                        ->  Value::Unsigned
//! otherwise                            ->  Value::Bytes
//! ```

use std::fmt;
use std::net::Ipv4Addr;

/// Dictionary value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    Boolean,
    Integer8,
    Integer16,
    Integer24,
    Integer32,
    Integer40,
    Integer48,
    Integer56,
    Integer64,
    Unsigned8,
    Unsigned16,
    Unsigned24,
    Unsigned32,
    Unsigned40,
    Unsigned48,
    Unsigned56,
    Unsigned64,
    Real32,
    Real64,
    VisibleString,
    OctetString,
    UnicodeString,
    NetTime,
    MacAddress,
    IpAddress,
}

const ALL_TYPES: [ValueType; 25] = [
    ValueType::Boolean,
    ValueType::Integer8,
    ValueType::Integer16,
    ValueType::Integer24,
    ValueType::Integer32,
    ValueType::Integer40,
    ValueType::Integer48,
    ValueType::Integer56,
    ValueType::Integer64,
    ValueType::Unsigned8,
    ValueType::Unsigned16,
    ValueType::Unsigned24,
    ValueType::Unsigned32,
    ValueType::Unsigned40,
    ValueType::Unsigned48,
    ValueType::Unsigned56,
    ValueType::Unsigned64,
    ValueType::Real32,
    ValueType::Real64,
    ValueType::VisibleString,
    ValueType::OctetString,
    ValueType::UnicodeString,
    ValueType::NetTime,
    ValueType::MacAddress,
    ValueType::IpAddress,
];

impl ValueType {
    /// Fixed width in bytes, 0 for variable-length types.
    pub fn width(self) -> usize {
        match self {
            Self::Boolean | Self::Integer8 | Self::Unsigned8 => 1,
            Self::Integer16 | Self::Unsigned16 => 2,
            Self::Integer24 | Self::Unsigned24 => 3,
            Self::Integer32 | Self::Unsigned32 | Self::Real32 | Self::IpAddress => 4,
            Self::Integer40 | Self::Unsigned40 => 5,
            Self::Integer48 | Self::Unsigned48 | Self::MacAddress => 6,
            Self::Integer56 | Self::Unsigned56 => 7,
            Self::Integer64 | Self::Unsigned64 | Self::Real64 | Self::NetTime => 8,
            Self::VisibleString | Self::OctetString | Self::UnicodeString => 0,
        }
    }

    /// Canonical device-description name (`Unsigned16`, `MAC_ADDRESS`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Integer8 => "Integer8",
            Self::Integer16 => "Integer16",
            Self::Integer24 => "Integer24",
            Self::Integer32 => "Integer32",
            Self::Integer40 => "Integer40",
            Self::Integer48 => "Integer48",
            Self::Integer56 => "Integer56",
            Self::Integer64 => "Integer64",
            Self::Unsigned8 => "Unsigned8",
            Self::Unsigned16 => "Unsigned16",
            Self::Unsigned24 => "Unsigned24",
            Self::Unsigned32 => "Unsigned32",
            Self::Unsigned40 => "Unsigned40",
            Self::Unsigned48 => "Unsigned48",
            Self::Unsigned56 => "Unsigned56",
            Self::Unsigned64 => "Unsigned64",
            Self::Real32 => "Real32",
            Self::Real64 => "Real64",
            Self::VisibleString => "Visible_String",
            Self::OctetString => "Octet_String",
            Self::UnicodeString => "Unicode_String",
            Self::NetTime => "NETTIME",
            Self::MacAddress => "MAC_ADDRESS",
            Self::IpAddress => "IP_ADDRESS",
        }
    }

    /// Resolve a textual type name (exact, then case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_TYPES
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .or_else(|| ALL_TYPES.iter().copied().find(|t| t.name().eq_ignore_ascii_case(name)))
    }

    /// Resolve a numeric data type id as used by device descriptions.
    ///
    /// Ids without a decodable representation (Time_of_Day, Domain, ...)
    /// return `None`.
    pub fn from_type_id(id: u16) -> Option<Self> {
        Some(match id {
            0x0001 => Self::Boolean,
            0x0002 => Self::Integer8,
            0x0003 => Self::Integer16,
            0x0004 => Self::Integer32,
            0x0005 => Self::Unsigned8,
            0x0006 => Self::Unsigned16,
            0x0007 => Self::Unsigned32,
            0x0008 => Self::Real32,
            0x0009 => Self::VisibleString,
            0x000A => Self::OctetString,
            0x000B => Self::UnicodeString,
            0x0010 => Self::Integer24,
            0x0011 => Self::Real64,
            0x0012 => Self::Integer40,
            0x0013 => Self::Integer48,
            0x0014 => Self::Integer56,
            0x0015 => Self::Integer64,
            0x0016 => Self::Unsigned24,
            0x0018 => Self::Unsigned40,
            0x0019 => Self::Unsigned48,
            0x001A => Self::Unsigned56,
            0x001B => Self::Unsigned64,
            0x0401 => Self::MacAddress,
            0x0402 => Self::IpAddress,
            0x0403 => Self::NetTime,
            _ => return None,
        })
    }

    /// True if a window of `len` bytes can be decoded with this type.
    pub fn fits(self, len: usize) -> bool {
        self.width() == 0 || self.width() == len
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded payload value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Unsigned(u64),
    Real32(f32),
    Real64(f64),
    Text(String),
    Octets(Vec<u8>),
    NetTime { seconds: u32, nanoseconds: u32 },
    Mac([u8; 6]),
    Ipv4(Ipv4Addr),
    /// Opaque bytes (type unknown or width mismatch).
    Bytes(Vec<u8>),
    /// Zero-length window.
    Empty,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Unsigned(v) => write!(f, "{} (0x{:X})", v, v),
            Self::Real32(v) => write!(f, "{}", v),
            Self::Real64(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "\"{}\"", s),
            Self::Octets(b) | Self::Bytes(b) => {
                for (i, byte) in b.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Self::NetTime {
                seconds,
                nanoseconds,
            } => write!(f, "{}.{:09}s", seconds, nanoseconds),
            Self::Mac(m) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                m[0], m[1], m[2], m[3], m[4], m[5]
            ),
            Self::Ipv4(ip) => write!(f, "{}", ip),
            Self::Empty => f.write_str("<empty>"),
        }
    }
}

/// Result of decoding one payload window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DecodedValue {
    pub value: Value,
    /// Bytes the protocol declared for this window.
    pub declared: usize,
    /// Bytes actually present in the capture.
    pub captured: usize,
}

impl DecodedValue {
    pub fn is_truncated(&self) -> bool {
        self.captured < self.declared
    }
}

/// Decode `declared` bytes from `data` (which may be shorter).
///
/// Never reads past `data`; a short window degrades to a byte dump of
/// whatever was captured.
pub fn decode_value(ty: Option<ValueType>, data: &[u8], declared: usize) -> DecodedValue {
    let captured = data.len().min(declared);
    let window = &data[..captured];

    let value = match ty {
        Some(t) if t.fits(declared) => decode_typed(t, window, declared),
        _ if declared == 0 => Value::Empty,
        _ if captured == declared && declared <= 8 => Value::Unsigned(read_unsigned(window)),
        _ => Value::Bytes(window.to_vec()),
    };

    DecodedValue {
        value,
        declared,
        captured,
    }
}

fn decode_typed(ty: ValueType, window: &[u8], declared: usize) -> Value {
    let width = ty.width();
    if width != 0 && window.len() < width {
        return Value::Bytes(window.to_vec());
    }

    match ty {
        ValueType::Boolean => Value::Boolean(window[0] != 0),
        ValueType::Integer8
        | ValueType::Integer16
        | ValueType::Integer24
        | ValueType::Integer32
        | ValueType::Integer40
        | ValueType::Integer48
        | ValueType::Integer56
        | ValueType::Integer64 => Value::Integer(read_signed(&window[..width])),
        ValueType::Unsigned8
        | ValueType::Unsigned16
        | ValueType::Unsigned24
        | ValueType::Unsigned32
        | ValueType::Unsigned40
        | ValueType::Unsigned48
        | ValueType::Unsigned56
        | ValueType::Unsigned64 => Value::Unsigned(read_unsigned(&window[..width])),
        ValueType::Real32 => Value::Real32(f32::from_bits(read_unsigned(&window[..4]) as u32)),
        ValueType::Real64 => Value::Real64(f64::from_bits(read_unsigned(&window[..8]))),
        ValueType::VisibleString => {
            let end = window.iter().position(|&b| b == 0).unwrap_or(window.len());
            Value::Text(String::from_utf8_lossy(&window[..end]).into_owned())
        }
        ValueType::OctetString => {
            if declared == 0 {
                Value::Empty
            } else {
                Value::Octets(window.to_vec())
            }
        }
        ValueType::UnicodeString => {
            let units = window
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .take_while(|&u| u != 0);
            Value::Text(
                char::decode_utf16(units)
                    .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect(),
            )
        }
        ValueType::NetTime => Value::NetTime {
            seconds: u32::from_le_bytes([window[0], window[1], window[2], window[3]]),
            nanoseconds: u32::from_le_bytes([window[4], window[5], window[6], window[7]]),
        },
        ValueType::MacAddress => {
            let mut mac = [0u8; 6];
            mac.copy_from_slice(&window[..6]);
            Value::Mac(mac)
        }
        ValueType::IpAddress => Value::Ipv4(Ipv4Addr::new(window[0], window[1], window[2], window[3])),
    }
}

/// Little-endian unsigned integer of up to 8 bytes.
pub fn read_unsigned(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Little-endian two's complement integer of 1..=8 bytes, sign-extended.
pub fn read_signed(bytes: &[u8]) -> i64 {
    let len = bytes.len().min(8);
    if len == 0 {
        return 0;
    }
    let raw = read_unsigned(&bytes[..len]);
    let shift = 64 - (len as u32 * 8);
    ((raw << shift) as i64) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_table_lookups() {
        assert_eq!(ValueType::from_name("Unsigned16"), Some(ValueType::Unsigned16));
        assert_eq!(ValueType::from_name("mac_address"), Some(ValueType::MacAddress));
        assert_eq!(ValueType::from_name("Domain"), None);
        assert_eq!(ValueType::from_type_id(0x0007), Some(ValueType::Unsigned32));
        assert_eq!(ValueType::from_type_id(0x0403), Some(ValueType::NetTime));
        assert_eq!(ValueType::from_type_id(0x000F), None);
    }

    #[test]
    fn test_widths() {
        assert_eq!(ValueType::Integer24.width(), 3);
        assert_eq!(ValueType::MacAddress.width(), 6);
        assert_eq!(ValueType::VisibleString.width(), 0);
        assert!(ValueType::OctetString.fits(17));
        assert!(!ValueType::Unsigned16.fits(4));
    }

    #[test]
    fn test_signed_sign_extension() {
        assert_eq!(read_signed(&[0xFF]), -1);
        assert_eq!(read_signed(&[0xFE, 0xFF, 0xFF]), -2);
        assert_eq!(read_signed(&[0x00, 0x80]), -32768);
        assert_eq!(read_signed(&[0x7F]), 127);
    }

    #[test]
    fn test_typed_decode() {
        let d = decode_value(Some(ValueType::Integer16), &[0x18, 0xFC], 2);
        assert_eq!(d.value, Value::Integer(-1000));

        let d = decode_value(Some(ValueType::VisibleString), b"HELLO\0\0", 7);
        assert_eq!(d.value, Value::Text("HELLO".into()));

        let d = decode_value(Some(ValueType::IpAddress), &[192, 168, 100, 1], 4);
        assert_eq!(d.value, Value::Ipv4(Ipv4Addr::new(192, 168, 100, 1)));

        let d = decode_value(Some(ValueType::Real32), &1.5f32.to_le_bytes(), 4);
        assert_eq!(d.value, Value::Real32(1.5));

        let d = decode_value(Some(ValueType::UnicodeString), &[0x48, 0x00, 0x69, 0x00], 4);
        assert_eq!(d.value, Value::Text("Hi".into()));
    }

    #[test]
    fn test_width_mismatch_falls_back_to_unsigned() {
        // Unsigned32 declared, but only a 2 byte window is mapped
        let d = decode_value(Some(ValueType::Unsigned32), &[0x34, 0x12], 2);
        assert_eq!(d.value, Value::Unsigned(0x1234));
    }

    #[test]
    fn test_unknown_type_large_window_is_dump() {
        let data = [1u8; 12];
        let d = decode_value(None, &data, 12);
        assert_eq!(d.value, Value::Bytes(data.to_vec()));
    }

    #[test]
    fn test_truncated_window_never_reads_past_capture() {
        let d = decode_value(Some(ValueType::Unsigned32), &[0xAA, 0xBB], 4);
        assert!(d.is_truncated());
        assert_eq!(d.captured, 2);
        assert_eq!(d.value, Value::Bytes(vec![0xAA, 0xBB]));

        let d = decode_value(None, &[0xAA], 2);
        assert_eq!(d.value, Value::Bytes(vec![0xAA]));
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(Value::Mac([0, 0x60, 0x65, 1, 2, 3]).to_string(), "00:60:65:01:02:03");
        assert_eq!(Value::Unsigned(255).to_string(), "255 (0xFF)");
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_string(), "de ad");
    }
}
