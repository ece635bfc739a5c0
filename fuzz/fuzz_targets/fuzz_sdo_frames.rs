// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use epl_sdo::{
    Decoder, DecoderConfig, DictionaryError, DictionarySet, EntryInfo, EntryKind, Frame,
    ObjectDictionary, ValueType,
};

fn dictionaries() -> Result<DictionarySet, DictionaryError> {
    let node = ObjectDictionary::builder()
        .node_id(1)
        .object(0x2000, EntryInfo::new("Text", EntryKind::Variable, Some(ValueType::VisibleString)))
        .object(0x6000, EntryInfo::new("In", EntryKind::Array, Some(ValueType::Unsigned8)))
        .subentry(0x6000, 1, EntryInfo::new("In_01", EntryKind::Variable, Some(ValueType::Unsigned16)))?
        .mapping(0x1A00, 1, 0x0010_0000_0001_6000)
        .build();
    Ok(DictionarySet::new().with(node))
}

fuzz_target!(|data: &[u8]| {
    // Input: repeated [len u8][frame bytes]; frame numbers may repeat or go back
    let mut frames = Vec::new();
    let mut rest = data;
    let mut number = 0u32;
    while let Some((&len, tail)) = rest.split_first() {
        let take = (len as usize).min(tail.len());
        number = number.wrapping_add(u32::from(len & 0x03));
        frames.push(Frame::new(number, &tail[..take]));
        rest = &tail[take..];
    }

    let Ok(dictionaries) = dictionaries() else {
        return;
    };
    let decoder = Decoder::new(DecoderConfig::default()).with_dictionaries(dictionaries);
    let first = decoder.decode_all(&frames);
    let second = decoder.decode_all(&frames);
    assert_eq!(first, second);
});
