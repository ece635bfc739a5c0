// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML / JSON object dictionary descriptions.
//!
//! ```yaml
//! name: io-module
//! node_id: 1                 # optional, binds the dictionary to a node
//! device_type: 401           # optional identity for IdentResponse binding
//! vendor_id: 0x00000100
//! product_code: 0
//! objects:
//!   - index: 0x1018
//!     name: NMT_IdentityObject_REC
//!     kind: record           # var | array | record, or object code 7/8/9
//!     subentries:
//!       - { sub: 1, name: VendorId_U32, type: Unsigned32 }
//!       - { sub: 2, name: ProductCode_U32, type: 0x0007 }
//! mappings:
//!   - { index: 0x1A00, sub: 1, value: 0x0008000000016000 }
//! ```
//!
//! Numbers may be written as integers or as decimal / `0x` hex strings.
//! A sub-entry without a type inherits its object's type.

use epl_sdo::{DictionaryError, DictionarySet, EntryInfo, EntryKind, ObjectDictionary, ValueType};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Dictionary file errors.
#[derive(Debug, Error)]
pub enum DictionaryFileError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid {what}: {value}")]
    InvalidNumber { what: &'static str, value: String },

    #[error("Mapping {index:04X}:{sub:02X} is not a PDO mapping parameter")]
    NotAMappingParameter { index: u16, sub: u8 },

    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
}

// ============================================================================
// File model
// ============================================================================

/// Integer written either as a number or as a decimal / hex string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(u64),
    Text(String),
}

impl Number {
    fn parse(&self, what: &'static str) -> Result<u64, DictionaryFileError> {
        let invalid = || DictionaryFileError::InvalidNumber {
            what,
            value: self.to_string(),
        };
        match self {
            Self::Int(v) => Ok(*v),
            Self::Text(text) => {
                let text = text.trim();
                let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
                    None => text.replace('_', "").parse(),
                };
                parsed.map_err(|_| invalid())
            }
        }
    }

    fn parse_as<T: TryFrom<u64>>(&self, what: &'static str) -> Result<T, DictionaryFileError> {
        T::try_from(self.parse(what)?).map_err(|_| DictionaryFileError::InvalidNumber {
            what,
            value: self.to_string(),
        })
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Object kind as a keyword or an object code.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KindSpec {
    Code(u16),
    Name(String),
}

impl KindSpec {
    fn resolve(&self) -> Result<EntryKind, DictionaryFileError> {
        match self {
            Self::Code(code) => Ok(EntryKind::from_object_code(*code)?),
            Self::Name(name) => match name.to_ascii_lowercase().as_str() {
                "var" | "variable" => Ok(EntryKind::Variable),
                "array" | "arr" => Ok(EntryKind::Array),
                "record" | "rec" => Ok(EntryKind::Record),
                other => {
                    let code = Number::Text(other.to_string()).parse_as::<u16>("object kind")?;
                    Ok(EntryKind::from_object_code(code)?)
                }
            },
        }
    }
}

/// Data type as a name (`Unsigned16`, `Visible_String`) or a type id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    Id(u16),
    Name(String),
}

impl TypeSpec {
    fn resolve(&self) -> Result<ValueType, DictionaryFileError> {
        let unknown = |s: String| DictionaryFileError::Dictionary(DictionaryError::UnknownDataType(s));
        match self {
            Self::Id(id) => ValueType::from_type_id(*id).ok_or_else(|| unknown(format!("0x{:04X}", id))),
            Self::Name(name) => {
                if let Some(ty) = ValueType::from_name(name.trim()) {
                    return Ok(ty);
                }
                let id = Number::Text(name.clone())
                    .parse_as::<u16>("data type")
                    .map_err(|_| unknown(name.clone()))?;
                ValueType::from_type_id(id).ok_or_else(|| unknown(name.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubentrySpec {
    pub sub: Number,
    pub name: String,
    #[serde(default, rename = "type")]
    pub value_type: Option<TypeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectSpec {
    pub index: Number,
    pub name: String,
    #[serde(default)]
    pub kind: Option<KindSpec>,
    #[serde(default, rename = "type")]
    pub value_type: Option<TypeSpec>,
    #[serde(default)]
    pub subentries: Vec<SubentrySpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingSpec {
    pub index: Number,
    pub sub: Number,
    pub value: Number,
}

/// Top-level dictionary description.
#[derive(Debug, Clone, Deserialize)]
pub struct DictionaryFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub node_id: Option<Number>,
    #[serde(default)]
    pub device_type: Option<Number>,
    #[serde(default)]
    pub vendor_id: Option<Number>,
    #[serde(default)]
    pub product_code: Option<Number>,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub mappings: Vec<MappingSpec>,
}

// ============================================================================
// Loading
// ============================================================================

impl DictionaryFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, DictionaryFileError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DictionaryFileError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a file, JSON for `.json`, YAML otherwise.
    pub fn from_file(path: &Path) -> Result<Self, DictionaryFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| DictionaryFileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Build the dictionary described by this file.
    pub fn into_dictionary(self, source: Option<&str>) -> Result<ObjectDictionary, DictionaryFileError> {
        let mut builder = ObjectDictionary::builder();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        if let Some(source) = source {
            builder = builder.source(source);
        }
        if let Some(node_id) = &self.node_id {
            builder = builder.node_id(node_id.parse_as("node id")?);
        }
        if self.device_type.is_some() || self.vendor_id.is_some() || self.product_code.is_some() {
            builder = builder.device(
                optional(&self.device_type, "device type")?,
                optional(&self.vendor_id, "vendor id")?,
                optional(&self.product_code, "product code")?,
            );
        }

        for object in &self.objects {
            let index: u16 = object.index.parse_as("object index")?;
            let kind = match &object.kind {
                Some(kind) => kind.resolve()?,
                None if object.subentries.is_empty() => EntryKind::Variable,
                None => EntryKind::Record,
            };
            let value_type = object.value_type.as_ref().map(TypeSpec::resolve).transpose()?;
            builder.add_object(index, EntryInfo::new(&object.name, kind, value_type));

            for sub in &object.subentries {
                let sub_index: u8 = sub.sub.parse_as("sub-index")?;
                let sub_type = match &sub.value_type {
                    Some(spec) => Some(spec.resolve()?),
                    None => value_type,
                };
                builder.add_subentry(index, sub_index, EntryInfo::new(&sub.name, EntryKind::Variable, sub_type))?;
            }
        }

        for mapping in &self.mappings {
            let index: u16 = mapping.index.parse_as("mapping index")?;
            let sub: u8 = mapping.sub.parse_as("mapping sub-index")?;
            if !builder.add_mapping(index, sub, mapping.value.parse("mapping value")?) {
                return Err(DictionaryFileError::NotAMappingParameter { index, sub });
            }
        }

        Ok(builder.build())
    }
}

fn optional<T: TryFrom<u64> + Default>(
    number: &Option<Number>,
    what: &'static str,
) -> Result<T, DictionaryFileError> {
    number.as_ref().map_or(Ok(T::default()), |n| n.parse_as(what))
}

/// Load one dictionary file.
pub fn load_dictionary(path: &Path) -> Result<ObjectDictionary, DictionaryFileError> {
    let source = path.display().to_string();
    DictionaryFile::from_file(path)?.into_dictionary(Some(&source))
}

/// Load every file into one set.
pub fn load_dictionaries<P: AsRef<Path>>(paths: &[P]) -> Result<DictionarySet, DictionaryFileError> {
    let mut set = DictionarySet::new();
    for path in paths {
        set.insert(load_dictionary(path.as_ref())?);
    }
    Ok(set)
}
