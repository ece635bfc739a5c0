// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::unreadable_literal)] // Protocol constants

//! Segmented transfer and duplicate suppression, end to end.
//!
//! Drives the public decoder with hand-built ASnd frames:
//! - WriteByIndex split over Initiate + Complete, then a retransmission
//! - Segmented ReadByIndex upload resolved through the read ring, closed by
//!   Complete or by the announced size
//! - Abort responses
//! - Link re-initialization between identical tuples

mod common;

use std::sync::Arc;

use common::*;
use epl_sdo::{
    CollectingSink, Decoder, DecoderConfig, DiagnosticKind, DictionarySet, SequenceVerdict,
    TransferDirection, Value,
};

const CN: u8 = 1;

fn decoder_with_sink() -> (Decoder, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let decoder = Decoder::new(DecoderConfig::default())
        .with_dictionaries(DictionarySet::new().with(io_module(CN)))
        .with_sink(sink.clone());
    (decoder, sink)
}

// ---------------------------------------------------------------------------
// Test: HELLO download with a duplicated Complete
// ---------------------------------------------------------------------------

#[test]
fn test_hello_reassembled_once_and_duplicate_reported() {
    let (decoder, sink) = decoder_with_sink();
    let complete = write_segment(b"LO", true);
    let frames = vec![
        sdo(1, MN, CN, 3, 5, &write_initiate(0x2000, 0, 5, b"HEL")),
        sdo(2, MN, CN, 3, 6, &complete),
        sdo(3, MN, CN, 3, 6, &complete),
    ];

    let reports = decoder.decode_all(&frames);

    assert!(reports[0].reassembled.is_none());
    let done = reports[1].reassembled.as_ref().expect("transfer completes on frame 2");
    assert_eq!(done.data, b"HELLO");
    assert_eq!(done.direction, TransferDirection::Download);
    assert_eq!(done.declared, Some(5));
    assert_eq!((done.first_frame, done.last_frame), (1, 2));

    let field = &reports[1].fields[0];
    assert_eq!(field.label, "2000:00");
    assert_eq!(field.index_name.as_deref(), Some("Greeting"));
    assert_eq!(field.value.value, Value::Text("HELLO".into()));

    assert_eq!(reports[2].verdict, Some(SequenceVerdict::Duplicate { original: 2 }));
    assert!(reports[2].command.is_none());
    assert!(reports[2].reassembled.is_none());

    let reassembled: Vec<_> = reports.iter().filter_map(|r| r.reassembled.as_ref()).collect();
    assert_eq!(reassembled.len(), 1);

    let diagnostics = sink.snapshot();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].frame, 3);
    assert_eq!(
        diagnostics[0].kind,
        DiagnosticKind::DuplicatedFrame {
            original: 2,
            recv_seq: 3,
            send_seq: 6
        }
    );

    let stats = decoder.stats();
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.sdo_frames, 3);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.reassembled, 1);
    assert_eq!(stats.diagnostics, 1);
}

#[test]
fn test_duplicate_command_layer_shown_when_configured() {
    let decoder = Decoder::new(DecoderConfig::default().with_show_duplicates(true));
    let complete = write_segment(b"LO", true);
    decoder.decode(&sdo(1, MN, CN, 3, 5, &write_initiate(0x2000, 0, 5, b"HEL")));
    decoder.decode(&sdo(2, MN, CN, 3, 6, &complete));
    let dup = decoder.decode(&sdo(3, MN, CN, 3, 6, &complete));

    assert!(dup.is_duplicate());
    assert!(dup.command.is_some());
    // Slot already recorded: not appended a second time
    assert!(dup.reassembled.is_none());
}

#[test]
fn test_short_transfer_flags_length_mismatch() {
    let (decoder, sink) = decoder_with_sink();
    decoder.decode(&sdo(1, MN, CN, 3, 5, &write_initiate(0x2000, 0, 8, b"HEL")));
    let report = decoder.decode(&sdo(2, MN, CN, 3, 6, &write_segment(b"LO", true)));

    assert_eq!(report.reassembled.as_ref().map(|r| r.data.len()), Some(5));
    assert!(sink.snapshot().iter().any(|d| d.kind
        == DiagnosticKind::ReassemblyLengthMismatch {
            declared: 8,
            reassembled: 5
        }));
}

// ---------------------------------------------------------------------------
// Test: segmented upload
// ---------------------------------------------------------------------------

#[test]
fn test_segmented_upload_uses_initiating_request() {
    let (decoder, _) = decoder_with_sink();
    decoder.decode(&sdo(20, MN, CN, 4, 12, &read_request(0x1008, 0)));
    let initiate = decoder.decode(&sdo(21, CN, MN, 12, 12, &read_response_initiate(8, b"EPL-")));
    let complete = decoder.decode(&sdo(22, CN, MN, 12, 13, &read_response_segment(b"NODE", true)));

    assert_eq!(
        initiate.read_request.as_ref().map(|r| r.address.index),
        Some(0x1008)
    );
    let done = complete.reassembled.as_ref().unwrap();
    assert_eq!(done.direction, TransferDirection::Upload);
    assert_eq!(done.data, b"EPL-NODE");
    assert_eq!(complete.fields[0].label, "1008:00");
    assert_eq!(complete.fields[0].value.value, Value::Text("EPL-NODE".into()));
}

#[test]
fn test_segmented_upload_completes_on_declared_length() {
    let (decoder, sink) = decoder_with_sink();
    decoder.decode(&sdo(20, MN, CN, 4, 12, &read_request(0x1008, 0)));
    decoder.decode(&sdo(21, CN, MN, 12, 12, &read_response_initiate(8, b"EPL-")));
    let last = decoder.decode(&sdo(22, CN, MN, 12, 13, &read_response_segment(b"NODE", false)));

    let done = last.reassembled.as_ref().expect("all announced bytes received");
    assert_eq!(done.direction, TransferDirection::Upload);
    assert_eq!(done.data, b"EPL-NODE");
    assert_eq!(done.declared, Some(8));
    assert_eq!(last.fields[0].label, "1008:00");
    assert_eq!(last.fields[0].value.value, Value::Text("EPL-NODE".into()));
    assert!(sink.is_empty());
}

// ---------------------------------------------------------------------------
// Test: aborts
// ---------------------------------------------------------------------------

#[test]
fn test_abort_code_decoded() {
    let (decoder, _) = decoder_with_sink();
    let report = decoder.decode(&sdo(1, CN, MN, 2, 2, &abort(WRITE_BY_INDEX, 0x0602_0000)));

    let code = report.abort.expect("abort code");
    assert_eq!(code.0, 0x0602_0000);
    assert_eq!(code.description(), "Object does not exist in the object dictionary.");
    assert!(report.fields.is_empty());
}

// ---------------------------------------------------------------------------
// Test: re-initialization between identical tuples
// ---------------------------------------------------------------------------

#[test]
fn test_reinitialization_clears_duplicate_history() {
    let (decoder, sink) = decoder_with_sink();
    let body = write_expedited(0x6200, 0, &[0x01]);

    decoder.decode(&sdo(1, MN, CN, 3, 5, &body));
    let init = decoder.decode(&sdo_with_codes(2, MN, CN, (0, 1), (0, 1), &[]));
    let again = decoder.decode(&sdo(3, MN, CN, 3, 5, &body));

    assert_eq!(init.verdict, Some(SequenceVerdict::Empty));
    assert_eq!(again.verdict, Some(SequenceVerdict::Normal));
    assert_eq!(again.fields[0].value.value, Value::Unsigned(1));
    assert!(sink.is_empty());
}

#[test]
fn test_out_of_window_repeat_is_new() {
    let decoder = Decoder::new(DecoderConfig::default().with_duplicate_window(10));
    let body = write_expedited(0x6200, 0, &[0x01]);
    decoder.decode(&sdo(1, MN, CN, 3, 5, &body));
    let late = decoder.decode(&sdo(50, MN, CN, 3, 5, &body));
    assert_eq!(late.verdict, Some(SequenceVerdict::Normal));
}
