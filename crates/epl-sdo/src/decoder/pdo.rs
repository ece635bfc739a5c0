// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PReq / PRes payload decoding through a mapping timeline.
//!
//! ```text
//! 0 .. 8      9..10      10 ..
//! header      size (LE)  payload
//! ```
//!
//! Mappings active at the frame are applied in bit-offset order. The
//! first one that does not fit the captured payload ends decoding; the
//! bytes after the last applied window are dumped as one raw field.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::frame::le_u16;
use crate::mapping::{extract_bits, MappingTimeline};
use crate::value::decode_value;

use super::report::Field;

const PDO_SIZE_OFFSET: usize = 8;
const PDO_PAYLOAD_OFFSET: usize = 10;

/// Decode the PDO payload of `data` into `fields`.
pub(crate) fn decode_pdo(
    timeline: &MappingTimeline,
    frame: u32,
    data: &[u8],
    show_meta: bool,
    fields: &mut Vec<Field>,
    findings: &mut Vec<Diagnostic>,
) {
    let Some(declared) = le_u16(data, PDO_SIZE_OFFSET) else {
        return;
    };
    let declared = declared as usize;
    let available = data.len().saturating_sub(PDO_PAYLOAD_OFFSET);
    let captured = available.min(declared);
    if captured < declared {
        findings.push(Diagnostic::new(
            frame,
            DiagnosticKind::PayloadLengthMismatch { declared, captured },
        ));
    }
    let payload = &data[PDO_PAYLOAD_OFFSET.min(data.len())..][..captured];

    let mut end_bits = 0u32;
    for mapping in timeline.active_at(frame) {
        let Some(bytes) = extract_bits(payload, mapping.bit_offset as u32, mapping.bit_length as u32)
        else {
            log::trace!(
                "[pdo] frame {}: {} does not fit {} captured bytes",
                frame,
                mapping.title(),
                captured
            );
            break;
        };

        let target = mapping.target.as_ref();
        fields.push(Field {
            label: mapping.title(),
            address: Some(mapping.pdo),
            index_name: mapping.index_name.clone(),
            entry_name: target
                .map(|t| t.name.clone())
                .filter(|name| Some(name) != mapping.index_name.as_ref()),
            value: decode_value(mapping.value_type(), &bytes, bytes.len()),
            note: show_meta.then(|| mapping.provenance()),
        });
        end_bits = end_bits.max(mapping.bit_end());
    }

    let tail = (end_bits as usize).div_ceil(8);
    if tail < payload.len() {
        fields.push(Field::raw("Payload", &payload[tail..]));
    }
}
