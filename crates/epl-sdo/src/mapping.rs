// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PDO mapping timelines.
//!
//! A mapping binds a bit window of the cyclic PReq/PRes payload to a
//! dictionary entry. Mappings are established by writes to a mapping
//! parameter (0x1600.. for RPDO, 0x1A00.. for TPDO) and can be rewritten
//! while the capture runs, so every row carries the frame range it was
//! in effect for.
//!
//! ```text
//! bit   0        8        16       24       32
//!       |  A (0x6000:01, frames 0..12)        |
//!       |  B (0x6200:01, frames 12..)  |
//!                         |  C (0x6000:02, frames 0..) |
//! ```
//!
//! Inserting B at frame 12 truncates A (bit ranges overlap) to `[0, 12)`.
//! Rows are never removed; superseded rows keep answering queries for
//! the frames they covered.
//!
//! # Raw mapping value
//!
//! ```text
//! 63      56 55      48 47             32 31   24 23    16 15            0
//! | reserved | length  |    bit offset    |  res  |  sub   |     index     |
//! ```

use crate::dictionary::{EntryInfo, EntryKind, ObjectDictionary};
use crate::value::ValueType;

/// Sentinel for a mapping that has not been superseded.
pub const UNBOUNDED: u32 = u32::MAX;

/// Transfer direction of a PDO, seen from the controlled node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PdoDirection {
    /// MN to CN (carried in PReq).
    Receive,
    /// CN to MN (carried in PRes).
    Transmit,
}

impl PdoDirection {
    /// Direction of a mapping parameter, `None` for anything else.
    ///
    /// Sub-index 0 holds the entry count and 0xFF is reserved, so only
    /// 1..=0xFE address mapping rows.
    pub fn for_parameter(index: u16, sub_index: u8) -> Option<Self> {
        if sub_index == 0 || sub_index == 0xFF {
            return None;
        }
        match index {
            0x1600..=0x16FF => Some(Self::Receive),
            0x1A00..=0x1AFF => Some(Self::Transmit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Receive => "RPDO",
            Self::Transmit => "TPDO",
        }
    }
}

/// Dictionary address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectAddress {
    pub index: u16,
    pub sub_index: u8,
}

impl ObjectAddress {
    pub const fn new(index: u16, sub_index: u8) -> Self {
        Self { index, sub_index }
    }
}

impl std::fmt::Display for ObjectAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}:{:02X}", self.index, self.sub_index)
    }
}

// ============================================================================
// ObjectMapping
// ============================================================================

/// One binding of a payload bit window to a dictionary entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectMapping {
    /// Entry the payload window represents.
    pub pdo: ObjectAddress,
    /// Mapping parameter that established the binding.
    pub param: ObjectAddress,
    pub bit_offset: u16,
    pub bit_length: u16,
    /// First frame the binding is in effect for.
    pub first: u32,
    /// First frame the binding is no longer in effect for.
    pub last: u32,
    pub index_name: Option<String>,
    pub target: Option<EntryInfo>,
}

impl ObjectMapping {
    /// Unpack a raw 64-bit mapping value written to `param`.
    pub fn from_raw(param: ObjectAddress, raw: u64, first: u32) -> Self {
        Self {
            pdo: ObjectAddress::new(raw as u16, (raw >> 16) as u8),
            param,
            bit_offset: (raw >> 32) as u16,
            bit_length: ((raw >> 48) & 0xFF) as u16,
            first,
            last: UNBOUNDED,
            index_name: None,
            target: None,
        }
    }

    /// Unpack from the 8-byte little-endian wire form.
    ///
    /// Returns `None` when fewer than 8 bytes are available.
    pub fn from_bytes(param: ObjectAddress, bytes: &[u8], first: u32) -> Option<Self> {
        let raw: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
        Some(Self::from_raw(param, u64::from_le_bytes(raw), first))
    }

    /// Pack back into the 64-bit form.
    pub fn raw(&self) -> u64 {
        self.pdo.index as u64
            | (self.pdo.sub_index as u64) << 16
            | (self.bit_offset as u64) << 32
            | ((self.bit_length & 0xFF) as u64) << 48
    }

    /// Fill in names and type of the target from `dict`.
    pub fn resolve(&mut self, dict: Option<&ObjectDictionary>) {
        let Some(dict) = dict else {
            return;
        };
        let res = dict.resolve(self.pdo.index, self.pdo.sub_index);
        self.index_name = res.index_name;
        self.target = res.entry;
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.target.as_ref().and_then(|t| t.value_type)
    }

    /// Display title: `PDO - 6000` for a plain variable at sub 0,
    /// `PDO - 6000:01` otherwise.
    pub fn title(&self) -> String {
        let scalar = self.target.as_ref().is_some_and(|t| t.kind == EntryKind::Variable);
        if scalar && self.pdo.sub_index == 0 {
            format!("PDO - {:04X}", self.pdo.index)
        } else {
            format!("PDO - {}", self.pdo)
        }
    }

    /// Provenance note attached to decoded fields.
    pub fn provenance(&self) -> String {
        let last = if self.is_open() {
            "open".to_string()
        } else {
            format!("#{}", self.last)
        };
        format!(
            "Mapping set by {}, Life time: Frame #{}-{}, Offset: 0x{:04x}, Length {} bits",
            self.param, self.first, last, self.bit_offset, self.bit_length
        )
    }

    pub fn is_open(&self) -> bool {
        self.last == UNBOUNDED
    }

    /// Frame falls within `[first, last)`.
    pub fn is_active_at(&self, frame: u32) -> bool {
        self.first <= frame && frame < self.last
    }

    /// End of the bit window (exclusive).
    pub fn bit_end(&self) -> u32 {
        self.bit_offset as u32 + self.bit_length as u32
    }

    /// Half-open bit windows intersect.
    pub fn bits_overlap(&self, other: &Self) -> bool {
        range_overlap(
            (self.bit_offset as u32, self.bit_end()),
            (other.bit_offset as u32, other.bit_end()),
        )
    }

    /// Same target, parameter and start frame.
    pub fn same_binding(&self, other: &Self) -> bool {
        self.pdo == other.pdo && self.param == other.param && self.first == other.first
    }
}

fn range_overlap(x: (u32, u32), y: (u32, u32)) -> bool {
    x.0 < y.1 && y.0 < x.1
}

// ============================================================================
// MappingTimeline
// ============================================================================

/// Append-only, frame-ranged list of mappings for one direction.
///
/// Kept sorted by bit offset (stable, so rows with the same offset stay
/// in insertion order).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTimeline {
    entries: Vec<ObjectMapping>,
}

impl MappingTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding, superseding overlapping older rows.
    ///
    /// An older row is closed at `mapping.first` when its bit window
    /// overlaps the new one, or when it came from the same parameter and
    /// was still in effect at `mapping.first`. Closing never extends a
    /// row's existing range. Returns `false` if an identical binding is
    /// already present.
    pub fn insert(&mut self, mapping: ObjectMapping) -> bool {
        if self.entries.iter().any(|m| m.same_binding(&mapping)) {
            return false;
        }

        for old in self.entries.iter_mut() {
            if old.first >= mapping.first {
                continue;
            }
            let same_param_live = old.param == mapping.param && mapping.first < old.last;
            if old.bits_overlap(&mapping) || same_param_live {
                if old.last > mapping.first {
                    log::trace!(
                        "[mapping] {} {} closed at frame {} by {}",
                        old.param,
                        old.pdo,
                        mapping.first,
                        mapping.param
                    );
                }
                old.last = old.last.min(mapping.first);
            }
        }

        self.entries.push(mapping);
        self.entries.sort_by_key(|m| m.bit_offset);
        true
    }

    /// Rows in effect at `frame`, in bit-offset order.
    pub fn active_at(&self, frame: u32) -> impl Iterator<Item = &ObjectMapping> {
        self.entries.iter().filter(move |m| m.is_active_at(frame))
    }

    /// Full history, in bit-offset order.
    pub fn entries(&self) -> &[ObjectMapping] {
        &self.entries
    }

    /// Copy every row of `other` in (used to seed from a profile).
    pub fn extend_from(&mut self, other: &MappingTimeline) {
        for mapping in &other.entries {
            self.insert(mapping.clone());
        }
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

// ============================================================================
// Bit window extraction
// ============================================================================

/// Copy `bit_length` bits starting at `bit_offset` out of `payload`.
///
/// Bits are numbered LSB-first within each byte. Returns `None` if the
/// window does not fit the captured bytes.
pub fn extract_bits(payload: &[u8], bit_offset: u32, bit_length: u32) -> Option<Vec<u8>> {
    let end = bit_offset.checked_add(bit_length)?;
    if end as usize > payload.len() * 8 {
        return None;
    }
    let out_len = (bit_length as usize).div_ceil(8);

    if bit_offset % 8 == 0 && bit_length % 8 == 0 {
        let start = bit_offset as usize / 8;
        return Some(payload[start..start + out_len].to_vec());
    }

    let mut out = vec![0u8; out_len];
    for i in 0..bit_length as usize {
        let src = bit_offset as usize + i;
        if payload[src / 8] >> (src % 8) & 1 == 1 {
            out[i / 8] |= 1 << (i % 8);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(param_sub: u8, pdo: u16, offset: u16, len: u16, first: u32) -> ObjectMapping {
        let raw = pdo as u64 | (offset as u64) << 32 | (len as u64) << 48;
        ObjectMapping::from_raw(ObjectAddress::new(0x1A00, param_sub), raw, first)
    }

    // ------------------------------------------------------------------------
    // ObjectMapping
    // ------------------------------------------------------------------------

    #[test]
    fn test_raw_unpack() {
        let m = ObjectMapping::from_raw(
            ObjectAddress::new(0x1600, 2),
            0x0010_0020_0003_2000,
            7,
        );
        assert_eq!(m.pdo, ObjectAddress::new(0x2000, 3));
        assert_eq!(m.bit_offset, 0x20);
        assert_eq!(m.bit_length, 0x10);
        assert_eq!(m.first, 7);
        assert!(m.is_open());
        assert_eq!(m.raw(), 0x0010_0020_0003_2000);
    }

    #[test]
    fn test_from_bytes_short() {
        let param = ObjectAddress::new(0x1600, 1);
        assert!(ObjectMapping::from_bytes(param, &[0u8; 7], 0).is_none());
        let m = ObjectMapping::from_bytes(param, &[0x00, 0x60, 0x01, 0, 0x08, 0, 0x08, 0], 3).unwrap();
        assert_eq!(m.pdo, ObjectAddress::new(0x6000, 1));
        assert_eq!(m.bit_offset, 8);
        assert_eq!(m.bit_length, 8);
    }

    #[test]
    fn test_title_without_target_shows_sub() {
        let m = mapping(1, 0x6000, 0, 8, 0);
        assert_eq!(m.title(), "PDO - 6000:00");
    }

    #[test]
    fn test_direction_for_parameter() {
        assert_eq!(PdoDirection::for_parameter(0x1600, 1), Some(PdoDirection::Receive));
        assert_eq!(PdoDirection::for_parameter(0x1AFF, 0xFE), Some(PdoDirection::Transmit));
        assert_eq!(PdoDirection::for_parameter(0x1A00, 0), None);
        assert_eq!(PdoDirection::for_parameter(0x1800, 1), None);
    }

    // ------------------------------------------------------------------------
    // MappingTimeline
    // ------------------------------------------------------------------------

    #[test]
    fn test_overlap_truncates_at_new_first() {
        let mut tl = MappingTimeline::new();
        tl.insert(mapping(1, 0x6000, 0, 16, 0));
        tl.insert(mapping(2, 0x6200, 8, 8, 12));

        let a = &tl.entries()[0];
        assert_eq!(a.pdo.index, 0x6000);
        assert_eq!((a.first, a.last), (0, 12));

        let at = |f| tl.active_at(f).map(|m| m.pdo.index).collect::<Vec<_>>();
        assert_eq!(at(11), vec![0x6000]);
        assert_eq!(at(12), vec![0x6200]);
    }

    #[test]
    fn test_disjoint_bits_coexist() {
        let mut tl = MappingTimeline::new();
        tl.insert(mapping(1, 0x6000, 0, 8, 0));
        tl.insert(mapping(2, 0x6001, 8, 8, 5));
        assert!(tl.entries().iter().all(ObjectMapping::is_open));
        assert_eq!(tl.active_at(6).count(), 2);
    }

    #[test]
    fn test_same_param_rewrite_supersedes() {
        let mut tl = MappingTimeline::new();
        tl.insert(mapping(1, 0x6000, 0, 8, 0));
        // Same parameter moved to a disjoint window
        tl.insert(mapping(1, 0x6000, 32, 8, 20));

        let old = tl.entries().iter().find(|m| m.bit_offset == 0).unwrap();
        assert_eq!(old.last, 20);
        assert_eq!(tl.active_at(25).count(), 1);
    }

    #[test]
    fn test_truncation_never_extends() {
        let mut tl = MappingTimeline::new();
        tl.insert(mapping(1, 0x6000, 0, 8, 0));
        tl.insert(mapping(2, 0x6001, 0, 8, 10));
        tl.insert(mapping(3, 0x6002, 0, 8, 30));

        let first = tl.entries().iter().find(|m| m.pdo.index == 0x6000).unwrap();
        assert_eq!(first.last, 10);
        let second = tl.entries().iter().find(|m| m.pdo.index == 0x6001).unwrap();
        assert_eq!(second.last, 30);
    }

    #[test]
    fn test_identical_binding_skipped() {
        let mut tl = MappingTimeline::new();
        assert!(tl.insert(mapping(1, 0x6000, 0, 8, 4)));
        assert!(!tl.insert(mapping(1, 0x6000, 0, 8, 4)));
        assert_eq!(tl.len(), 1);
        assert!(tl.entries()[0].is_open());
    }

    #[test]
    fn test_sorted_by_bit_offset() {
        let mut tl = MappingTimeline::new();
        tl.insert(mapping(3, 0x6003, 24, 8, 0));
        tl.insert(mapping(1, 0x6001, 0, 8, 0));
        tl.insert(mapping(2, 0x6002, 8, 16, 0));
        let offsets: Vec<u16> = tl.entries().iter().map(|m| m.bit_offset).collect();
        assert_eq!(offsets, vec![0, 8, 24]);
    }

    #[test]
    fn test_zero_length_never_overlaps() {
        let mut tl = MappingTimeline::new();
        tl.insert(mapping(1, 0x6000, 0, 0, 0));
        tl.insert(mapping(2, 0x6001, 0, 8, 3));
        assert!(tl.entries().iter().all(ObjectMapping::is_open));
    }

    // ------------------------------------------------------------------------
    // Bit extraction
    // ------------------------------------------------------------------------

    #[test]
    fn test_extract_aligned() {
        let payload = [0x11, 0x22, 0x33, 0x44];
        assert_eq!(extract_bits(&payload, 8, 16), Some(vec![0x22, 0x33]));
        assert_eq!(extract_bits(&payload, 24, 16), None);
    }

    #[test]
    fn test_extract_unaligned() {
        // 0b1010_1100: bits 2..6 = 0b1011
        assert_eq!(extract_bits(&[0xAC], 2, 4), Some(vec![0x0B]));
        // Window straddling a byte boundary
        assert_eq!(extract_bits(&[0xF0, 0x0F], 4, 8), Some(vec![0xFF]));
        assert_eq!(extract_bits(&[0x01], 0, 1), Some(vec![0x01]));
    }
}
