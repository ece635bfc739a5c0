// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Asynchronous SDO transport.
//!
//! ```text
//! ASnd/AInv payload
//! +----------------+----------------------------------------------+
//! | sequence layer |                command layer                 |
//! |  4 bytes       | 8 byte header [+ data size] | data ...       |
//! +----------------+----------------------------------------------+
//!        |                        |
//!  SequenceStateMachine     CommandHeader
//!  DuplicateCache           FragmentReassembler (per direction)
//!                           ReadRequestCorrelator
//! ```

pub mod abort;
pub mod command;
pub mod correlator;
pub mod dedup;
pub mod reassembly;
pub mod sequence;

pub use abort::{abort_description, parse_abort_records, AbortCode, AbortRecord};
pub use command::{
    parse_address, parse_multiple_entries, CommandHeader, CommandId, MultipleEntry, Segmentation,
    COMMAND_HEADER_LEN,
};
pub use correlator::{ReadRequest, ReadRequestCorrelator, READ_RING_SLOTS};
pub use dedup::{DuplicateCache, DuplicateKey};
pub use reassembly::{Fragment, FragmentReassembler, ReassemblerStats, Reassembled, TransferDirection};
pub use sequence::{
    ConnectionCode, LinkState, SequenceHeader, SequenceStateMachine, SequenceVerdict,
    DEFAULT_DUPLICATE_WINDOW, MAX_SEQUENCE, SEQUENCE_HEADER_LEN, SEQUENCE_WRAP,
};
