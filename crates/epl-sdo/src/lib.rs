// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! POWERLINK SDO decoder
//!
//! Passive, frame-sequential decoding of the asynchronous SDO transport
//! of POWERLINK captures:
//! - Sequence layer state machine with duplicate suppression
//! - Per-direction reassembly of segmented transfers
//! - ReadByIndex request/response correlation
//! - Frame-ranged PDO mapping timelines driving PReq/PRes payload decode
//! - Per-node conversations with cut-over on node restart
//!
//! # Quick Start
//!
//! ```ignore
//! use epl_sdo::{Decoder, DecoderConfig, Frame};
//!
//! let decoder = Decoder::new(DecoderConfig::from_env());
//! let report = decoder.decode(&Frame::new(1, bytes));
//! for field in &report.fields {
//!     println!("{}", field);
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Role |
//! |--------|------|
//! | [`interval_index`] | Lock-then-query range table |
//! | [`dictionary`] | Object dictionaries and the dictionary set |
//! | [`mapping`] | PDO mapping rows and timelines |
//! | [`sdo`] | Sequence layer, duplicates, reassembly, correlation, command layer |
//! | [`conversation`] | Per-node state and registry |
//! | [`decoder`] | Frame driver and reports |
//!
//! The crate logs through the `log` facade and never installs a logger.

pub mod config;
pub mod conversation;
pub mod decoder;
pub mod diagnostics;
pub mod dictionary;
pub mod frame;
pub mod interval_index;
pub mod mapping;
pub mod scratch;
pub mod sdo;
pub mod value;

pub use config::DecoderConfig;
pub use conversation::{BoundProfiles, Conversation, ConversationRegistry};
pub use decoder::{Decoder, DecoderStats, Field, FrameReport};
pub use diagnostics::{
    CollectingSink, Diagnostic, DiagnosticKind, DiagnosticsSink, LogSink, SequenceField, Severity,
};
pub use dictionary::{
    DeviceIdentity, DictionaryBuilder, DictionaryEntry, DictionaryError, DictionarySet, EntryInfo,
    EntryKind, ObjectDictionary, Resolution,
};
pub use frame::{Frame, MessageType, ServiceId};
pub use interval_index::{IndexError, Interval, IntervalIndex};
pub use mapping::{MappingTimeline, ObjectAddress, ObjectMapping, PdoDirection, UNBOUNDED};
pub use scratch::{ScratchKey, ScratchStore, ScratchValue};
pub use sdo::{
    CommandHeader, CommandId, DuplicateCache, FragmentReassembler, ReadRequest,
    ReadRequestCorrelator, Reassembled, Segmentation, SequenceHeader, SequenceStateMachine,
    SequenceVerdict, TransferDirection,
};
pub use value::{DecodedValue, Value, ValueType};
