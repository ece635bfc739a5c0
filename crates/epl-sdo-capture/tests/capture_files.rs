// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unreadable_literal)] // Protocol constants

//! Capture and dictionary files on disk driving the decoder.

use epl_sdo::{Decoder, DecoderConfig, Value};
use epl_sdo_capture::{load_config, load_dictionaries, read_capture, CaptureError};
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

const MN: u8 = 240;
const CN: u8 = 1;

const IO_MODULE: &str = r#"
name: io-module
node_id: 1
objects:
  - index: 0x2000
    name: Greeting
    type: Visible_String
  - index: 0x6000
    name: DigitalInput
    kind: array
    type: Unsigned8
    subentries:
      - { sub: 1, name: DigitalInput_01 }
"#;

fn ethernet(payload: &[u8]) -> Vec<u8> {
    let mut p = vec![0x01, 0x11, 0x1E, 0, 0, 0x01, 0x00, 0x60, 0x65, 0, 0, 0xF0, 0x88, 0xAB];
    p.extend_from_slice(payload);
    p
}

fn sdo(src: u8, dest: u8, recv: u8, send: u8, cmd: &[u8]) -> Vec<u8> {
    let mut data = vec![0x06, dest, src, 0x05, (recv << 2) | 2, (send << 2) | 2, 0, 0];
    data.extend_from_slice(cmd);
    data
}

fn write_pcap(packets: &[Vec<u8>]) -> NamedTempFile {
    let mut file = Builder::new().suffix(".pcap").tempfile().unwrap();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xA1B2_C3D4u32.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&4u16.to_le_bytes());
    for word in [0u32, 0, 65535, 1] {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    for packet in packets {
        for word in [0u32, 0, packet.len() as u32, packet.len() as u32] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.extend_from_slice(packet);
    }
    file.write_all(&bytes).unwrap();
    file
}

fn write_text(suffix: &str, text: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_pcap_with_yaml_dictionary() {
    // WriteByIndex 2000:00 "HELLO" in two segments, duplicated Complete,
    // then a TPDO mapping write and a PRes using it.
    let initiate = [
        0x00, 0x01, 0x10, 0x01, 11, 0, 0, 0, 5, 0, 0, 0, 0x00, 0x20, 0x00, 0x00, b'H', b'E', b'L',
    ];
    let complete = [0x00, 0x01, 0x30, 0x01, 2, 0, 0, 0, b'L', b'O'];
    let mapping = [
        0x00, 0x01, 0x00, 0x01, 12, 0, 0, 0, 0x00, 0x1A, 0x01, 0x00, 0x00, 0x60, 0x01, 0x00, 0x00,
        0x00, 0x08, 0x00,
    ];
    let pres = [0x04, 0xFF, CN, 0, 0, 0, 0, 0, 1, 0, 0x2A];

    let capture = write_pcap(&[
        ethernet(&sdo(MN, CN, 3, 5, &initiate)),
        vec![0u8; 60], // not POWERLINK
        ethernet(&sdo(MN, CN, 3, 6, &complete)),
        ethernet(&sdo(MN, CN, 3, 6, &complete)),
        ethernet(&sdo(MN, CN, 3, 7, &mapping)),
        ethernet(&pres),
    ]);
    let dictionary = write_text(".yaml", IO_MODULE);

    let frames = read_capture(capture.path()).unwrap();
    assert_eq!(
        frames.iter().map(|f| f.number).collect::<Vec<_>>(),
        vec![1, 3, 4, 5, 6]
    );

    let decoder = Decoder::new(DecoderConfig::default())
        .with_dictionaries(load_dictionaries(&[dictionary.path()]).unwrap());
    let reports = decoder.decode_all(&frames);

    let hello = reports[1].reassembled.as_ref().expect("transfer completes on frame 3");
    assert_eq!(hello.data, b"HELLO");
    assert_eq!(reports[1].fields[0].index_name.as_deref(), Some("Greeting"));
    assert_eq!(reports[1].fields[0].value.value, Value::Text("HELLO".into()));
    assert!(reports[2].is_duplicate());

    assert_eq!(reports[3].mapping_updates.len(), 1);
    let pdo = &reports[4];
    assert_eq!(pdo.fields[0].label, "PDO - 6000:01");
    assert_eq!(pdo.fields[0].entry_name.as_deref(), Some("DigitalInput_01"));
    assert_eq!(pdo.fields[0].value.value, Value::Unsigned(0x2A));

    let stats = decoder.stats();
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.reassembled, 1);
}

#[test]
fn test_jsonl_detected_by_content() {
    let capture = write_text(
        ".txt",
        "{\"number\": 10, \"data\": [6, 1, 240, 5, 14, 22, 0, 0]}\n{\"data\": [4, 255, 1, 0, 0, 0, 0, 0, 0, 0]}\n",
    );
    let frames = read_capture(capture.path()).unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].number, 11);
}

#[test]
fn test_unrecognized_capture_is_error() {
    let capture = write_text(".bin", "POWERLINK");
    assert!(matches!(
        read_capture(capture.path()),
        Err(CaptureError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_config_file_feeds_decoder() {
    let config_file = write_text(".yaml", "duplicate_window: 2\nshow_pdo_meta_info: true\n");
    let config = load_config(config_file.path()).unwrap();
    assert_eq!(config.duplicate_window, 2);

    let body = [0x00, 0x01, 0x00, 0x01, 5, 0, 0, 0, 0x00, 0x62, 0x00, 0x00, 0x01];
    let frames = vec![
        epl_sdo::Frame::new(1, sdo(MN, CN, 3, 5, &body)),
        epl_sdo::Frame::new(5, sdo(MN, CN, 3, 5, &body)),
    ];
    let reports = Decoder::new(config).decode_all(&frames);
    assert!(!reports[1].is_duplicate());
}
