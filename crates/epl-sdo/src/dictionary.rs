// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object dictionaries and the swappable dictionary set.
//!
//! A dictionary is built once (by a profile loader outside this crate),
//! locked, and then only read. Aggregate entries keep their sub-entries
//! in an [`IntervalIndex`] so long runs of identical slots collapse into
//! a single range.
//!
//! ```text
//! ObjectDictionary
//!   0x1000 -> Scalar("NMT_DeviceType_U32", Unsigned32)
//!   0x1018 -> Aggregate("NMT_IdentityObject_REC")
//!               [0..=0] NumberOfEntries   Unsigned8
//!               [1..=1] VendorId_U32      Unsigned32
//!               ...
//!   rpdo / tpdo: preloaded mapping rows (frame 0)
//! ```
//!
//! Dictionaries are looked up per node id (explicit binding) or per
//! device type with vendor/product refinement (bound when an
//! IdentResponse reveals the device).

use std::collections::HashMap;
use std::sync::Arc;

use crate::interval_index::IntervalIndex;
use crate::mapping::{MappingTimeline, ObjectAddress, ObjectMapping, PdoDirection};
use crate::value::ValueType;

/// Maximum stored name length in bytes.
pub const MAX_NAME_LEN: usize = 63;

/// Dictionary construction error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionaryError {
    /// Object type code outside VAR/ARRAY/RECORD.
    UnknownObjectKind(u16),
    /// Data type name or id without a known representation.
    UnknownDataType(String),
    /// Sub-entry attached to an object declared as a plain variable.
    SubentryOnVariable { index: u16, sub_index: u8 },
}

impl std::fmt::Display for DictionaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownObjectKind(code) => write!(f, "unknown object kind: {}", code),
            Self::UnknownDataType(name) => write!(f, "unknown data type: {}", name),
            Self::SubentryOnVariable { index, sub_index } => write!(
                f,
                "sub-entry {:04X}:{:02X} on a variable object",
                index, sub_index
            ),
        }
    }
}

impl std::error::Error for DictionaryError {}

// ============================================================================
// Entries
// ============================================================================

/// Object kind as declared by the device description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntryKind {
    /// Plain variable, no sub-indices (object code 7).
    Variable,
    /// Array of same-typed sub-entries (object code 8).
    Array,
    /// Record of heterogeneous sub-entries (object code 9).
    Record,
}

impl EntryKind {
    pub fn from_object_code(code: u16) -> Result<Self, DictionaryError> {
        match code {
            7 => Ok(Self::Variable),
            8 => Ok(Self::Array),
            9 => Ok(Self::Record),
            other => Err(DictionaryError::UnknownObjectKind(other)),
        }
    }

    pub fn object_code(self) -> u16 {
        match self {
            Self::Variable => 7,
            Self::Array => 8,
            Self::Record => 9,
        }
    }
}

/// Name, kind and type of an object or sub-object.
///
/// Two sub-entries are interchangeable for range compaction when all
/// three fields are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EntryInfo {
    pub name: String,
    pub kind: EntryKind,
    pub value_type: Option<ValueType>,
}

impl EntryInfo {
    /// Create an entry, truncating the name to [`MAX_NAME_LEN`] bytes.
    pub fn new(name: &str, kind: EntryKind, value_type: Option<ValueType>) -> Self {
        Self {
            name: bounded_name(name),
            kind,
            value_type,
        }
    }
}

fn bounded_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

/// One addressable dictionary index.
#[derive(Debug, Clone)]
pub enum DictionaryEntry {
    Scalar(EntryInfo),
    Aggregate {
        info: EntryInfo,
        subentries: IntervalIndex<EntryInfo>,
    },
}

impl DictionaryEntry {
    pub fn info(&self) -> &EntryInfo {
        match self {
            Self::Scalar(info) | Self::Aggregate { info, .. } => info,
        }
    }

    /// Sub-entry lookup; scalars have none.
    pub fn subentry(&self, sub_index: u8) -> Option<&EntryInfo> {
        match self {
            Self::Scalar(_) => None,
            Self::Aggregate { subentries, .. } => subentries.find(sub_index as u32).ok().flatten(),
        }
    }

    /// Declared as a plain variable without sub-indices.
    pub fn has_no_subindices(&self) -> bool {
        self.info().kind == EntryKind::Variable
    }

    fn lock(&mut self) {
        if let Self::Aggregate { subentries, .. } = self {
            subentries.lock();
        }
    }
}

/// Result of resolving an `(index, sub-index)` address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Resolution {
    /// Name of the index-level object.
    pub index_name: Option<String>,
    /// Most specific entry found: the sub-entry if any, else the object.
    pub entry: Option<EntryInfo>,
    /// Object is a plain variable (no sub-index display).
    pub no_subindices: bool,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.entry.is_some()
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.entry.as_ref().and_then(|e| e.value_type)
    }

    /// Entry name when it differs from the index name.
    pub fn entry_name(&self) -> Option<&str> {
        match (&self.entry, &self.index_name) {
            (Some(e), Some(idx)) if &e.name == idx => None,
            (Some(e), _) => Some(e.name.as_str()),
            _ => None,
        }
    }
}

// ============================================================================
// ObjectDictionary
// ============================================================================

/// Identity a dictionary is registered under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviceIdentity {
    pub device_type: u16,
    pub vendor_id: u32,
    pub product_code: u32,
}

/// Per-device table of addressable entries.
#[derive(Debug, Clone, Default)]
pub struct ObjectDictionary {
    name: Option<String>,
    source: Option<String>,
    node_id: Option<u8>,
    identity: DeviceIdentity,
    entries: HashMap<u16, DictionaryEntry>,
    rpdo: MappingTimeline,
    tpdo: MappingTimeline,
}

impl ObjectDictionary {
    pub fn builder() -> DictionaryBuilder {
        DictionaryBuilder::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Where the dictionary was loaded from (file path, URL...).
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Node id this dictionary is explicitly bound to.
    pub fn node_id(&self) -> Option<u8> {
        self.node_id
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn lookup(&self, index: u16) -> Option<&DictionaryEntry> {
        self.entries.get(&index)
    }

    pub fn subentry(&self, index: u16, sub_index: u8) -> Option<&EntryInfo> {
        self.lookup(index)?.subentry(sub_index)
    }

    /// Resolve an address transitively: object, then optional sub-object.
    pub fn resolve(&self, index: u16, sub_index: u8) -> Resolution {
        match self.lookup(index) {
            None => Resolution::default(),
            Some(entry) => Resolution {
                index_name: Some(entry.info().name.clone()),
                entry: Some(entry.subentry(sub_index).unwrap_or(entry.info()).clone()),
                no_subindices: entry.has_no_subindices(),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Preloaded mapping rows for one direction.
    pub fn mappings(&self, direction: PdoDirection) -> &MappingTimeline {
        match direction {
            PdoDirection::Receive => &self.rpdo,
            PdoDirection::Transmit => &self.tpdo,
        }
    }
}

/// Resolve against an optional dictionary.
pub fn resolve_in(dict: Option<&ObjectDictionary>, index: u16, sub_index: u8) -> Resolution {
    dict.map(|d| d.resolve(index, sub_index)).unwrap_or_default()
}

/// Incremental dictionary construction.
///
/// ```ignore
/// let dict = ObjectDictionary::builder()
///     .name("IO module")
///     .device(401, 0x0000_0100, 0)
///     .object(0x6000, EntryInfo::new("DigitalInput", EntryKind::Array, Some(ValueType::Unsigned8)))
///     .subentry(0x6000, 1, EntryInfo::new("DigitalInput_01", EntryKind::Variable, Some(ValueType::Unsigned8)))?
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct DictionaryBuilder {
    dict: ObjectDictionary,
    pending_mappings: Vec<(u16, u8, u64)>,
}

impl DictionaryBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.dict.name = Some(name.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.dict.source = Some(source.into());
        self
    }

    pub fn node_id(mut self, node_id: u8) -> Self {
        self.dict.node_id = Some(node_id);
        self
    }

    pub fn device(mut self, device_type: u16, vendor_id: u32, product_code: u32) -> Self {
        self.dict.identity = DeviceIdentity {
            device_type,
            vendor_id,
            product_code,
        };
        self
    }

    /// Define (or redefine) an index-level object.
    ///
    /// Sub-entries already attached to the index are kept.
    pub fn object(mut self, index: u16, info: EntryInfo) -> Self {
        self.add_object(index, info);
        self
    }

    pub fn add_object(&mut self, index: u16, info: EntryInfo) {
        let entry = match self.dict.entries.remove(&index) {
            Some(DictionaryEntry::Aggregate { subentries, .. }) => DictionaryEntry::Aggregate { info, subentries },
            _ => DictionaryEntry::Scalar(info),
        };
        self.dict.entries.insert(index, entry);
    }

    /// Attach a sub-entry, creating a placeholder record if needed.
    pub fn subentry(mut self, index: u16, sub_index: u8, info: EntryInfo) -> Result<Self, DictionaryError> {
        self.add_subentry(index, sub_index, info)?;
        Ok(self)
    }

    /// Attach a sub-entry; objects declared as [`EntryKind::Variable`]
    /// have no sub-indices and reject it.
    pub fn add_subentry(&mut self, index: u16, sub_index: u8, info: EntryInfo) -> Result<(), DictionaryError> {
        if self
            .dict
            .entries
            .get(&index)
            .is_some_and(DictionaryEntry::has_no_subindices)
        {
            return Err(DictionaryError::SubentryOnVariable { index, sub_index });
        }

        let entry = self
            .dict
            .entries
            .remove(&index)
            .unwrap_or_else(|| DictionaryEntry::Scalar(EntryInfo::new("", EntryKind::Record, None)));

        let entry = match entry {
            DictionaryEntry::Scalar(parent) => {
                let mut subentries = IntervalIndex::with_partial_eq();
                subentries.insert(sub_index as u32, info);
                DictionaryEntry::Aggregate {
                    info: parent,
                    subentries,
                }
            }
            DictionaryEntry::Aggregate {
                info: parent,
                mut subentries,
            } => {
                subentries.insert(sub_index as u32, info);
                DictionaryEntry::Aggregate {
                    info: parent,
                    subentries,
                }
            }
        };
        self.dict.entries.insert(index, entry);
        Ok(())
    }

    /// Queue a declared PDO mapping value (raw 64-bit packed row).
    ///
    /// Only mapping parameters (0x1600.., 0x1A00.., sub 1..=0xFE) are
    /// accepted; returns `false` for anything else.
    pub fn add_mapping(&mut self, index: u16, sub_index: u8, raw: u64) -> bool {
        if PdoDirection::for_parameter(index, sub_index).is_none() {
            return false;
        }
        self.pending_mappings.push((index, sub_index, raw));
        true
    }

    pub fn mapping(mut self, index: u16, sub_index: u8, raw: u64) -> Self {
        self.add_mapping(index, sub_index, raw);
        self
    }

    /// Lock every sub-entry index and resolve preloaded mappings.
    pub fn build(mut self) -> ObjectDictionary {
        for entry in self.dict.entries.values_mut() {
            entry.lock();
        }

        for (index, sub_index, raw) in std::mem::take(&mut self.pending_mappings) {
            let Some(direction) = PdoDirection::for_parameter(index, sub_index) else {
                continue;
            };
            let param = ObjectAddress::new(index, sub_index);
            let mut mapping = ObjectMapping::from_raw(param, raw, 0);
            mapping.resolve(Some(&self.dict));
            match direction {
                PdoDirection::Receive => self.dict.rpdo.insert(mapping),
                PdoDirection::Transmit => self.dict.tpdo.insert(mapping),
            };
        }

        log::debug!(
            "[dictionary] built {:?}: {} objects, {} RPDO / {} TPDO rows",
            self.dict.name,
            self.dict.entries.len(),
            self.dict.rpdo.len(),
            self.dict.tpdo.len()
        );
        self.dict
    }
}

// ============================================================================
// DictionarySet
// ============================================================================

/// Read-only collection of loaded dictionaries.
///
/// Rebuilt wholesale when configuration changes, never mutated while a
/// decode run uses it.
#[derive(Debug, Clone, Default)]
pub struct DictionarySet {
    by_node: HashMap<u8, Arc<ObjectDictionary>>,
    by_device: HashMap<u16, Vec<Arc<ObjectDictionary>>>,
}

impl DictionarySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dictionary under its node id, or under its device type
    /// when it is not bound to a node.
    pub fn insert(&mut self, dict: ObjectDictionary) {
        let dict = Arc::new(dict);
        match dict.node_id {
            Some(node) => {
                self.by_node.insert(node, dict);
            }
            None => self
                .by_device
                .entry(dict.identity.device_type)
                .or_default()
                .push(dict),
        }
    }

    pub fn with(mut self, dict: ObjectDictionary) -> Self {
        self.insert(dict);
        self
    }

    pub fn for_node(&self, node_id: u8) -> Option<Arc<ObjectDictionary>> {
        self.by_node.get(&node_id).cloned()
    }

    /// Best device dictionary for an identity.
    ///
    /// Preference: exact vendor+product, then vendor with generic
    /// product, then fully generic. Falls back to the first registered
    /// dictionary of that device type.
    pub fn for_device(&self, identity: DeviceIdentity) -> Option<Arc<ObjectDictionary>> {
        let candidates = self.by_device.get(&identity.device_type)?;

        let score = |d: &ObjectDictionary| -> u8 {
            let id = d.identity;
            if id.vendor_id == identity.vendor_id && id.product_code == identity.product_code {
                3
            } else if id.vendor_id == identity.vendor_id && id.product_code == 0 {
                2
            } else if id.vendor_id == 0 && id.product_code == 0 {
                1
            } else {
                0
            }
        };

        let mut best: Option<(&Arc<ObjectDictionary>, u8)> = None;
        for candidate in candidates {
            let s = score(candidate);
            if best.map_or(true, |(_, b)| s > b) {
                best = Some((candidate, s));
            }
        }
        best.map(|(d, _)| Arc::clone(d))
    }

    pub fn len(&self) -> usize {
        self.by_node.len() + self.by_device.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
