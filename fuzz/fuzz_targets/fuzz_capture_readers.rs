// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use epl_sdo_capture::{FrameSource, JsonlReader, PcapReader};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Fuzz pcap reader
    if let Ok(mut reader) = PcapReader::new(Cursor::new(data)) {
        let _ = reader.read_all();
    }

    // Fuzz JSON-lines reader
    let _ = JsonlReader::new(Cursor::new(data)).read_all();
});
