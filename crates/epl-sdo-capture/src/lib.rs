// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capture input for the POWERLINK SDO decoder.
//!
//! Reads frames from capture files, loads object dictionary descriptions
//! and decoder configuration, and hosts the `epl-sdo-decode` tool.
//!
//! # Quick Start
//!
//! ```bash
//! # Decode a pcap with one device description
//! epl-sdo-decode --input cycle.pcap --dictionary io-module.yaml
//!
//! # Machine-readable reports, duplicates fully decoded
//! epl-sdo-decode --input cycle.pcap --json --show-duplicates
//!
//! # Extract POWERLINK frames to JSON lines
//! epl-sdo-decode --input cycle.pcap --export-frames frames.jsonl
//! ```
//!
//! # Inputs
//!
//! | Input | Format |
//! |-------|--------|
//! | Capture | libpcap (Ethernet, EtherType 0x88AB, 802.1Q) or JSON lines |
//! | Dictionary | YAML or JSON object list with optional PDO mappings |
//! | Config | YAML or JSON [`epl_sdo::DecoderConfig`] |

pub mod dictionary_file;
pub mod format;
pub mod settings;

pub use dictionary_file::{load_dictionaries, load_dictionary, DictionaryFile, DictionaryFileError};
pub use format::{
    open_capture, read_capture, CaptureError, CaptureFormat, FrameRecord, FrameSource, JsonlReader,
    PcapReader,
};
pub use settings::{load_config, SettingsError};
