// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame builders shared by the integration tests.

#![allow(dead_code)]

use epl_sdo::{DictionaryError, EntryInfo, EntryKind, Frame, ObjectDictionary, ValueType};

pub const MN: u8 = 240;
pub const BROADCAST: u8 = 255;

const VALID: u8 = 2;

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// ASnd SDO frame with both connection codes Valid.
pub fn sdo(number: u32, src: u8, dest: u8, recv_seq: u8, send_seq: u8, cmd: &[u8]) -> Frame {
    sdo_with_codes(number, src, dest, (recv_seq, VALID), (send_seq, VALID), cmd)
}

/// ASnd SDO frame with explicit `(sequence, connection code)` pairs.
pub fn sdo_with_codes(
    number: u32,
    src: u8,
    dest: u8,
    recv: (u8, u8),
    send: (u8, u8),
    cmd: &[u8],
) -> Frame {
    let mut data = vec![
        0x06,
        dest,
        src,
        0x05,
        (recv.0 << 2) | recv.1,
        (send.0 << 2) | send.1,
        0x00,
        0x00,
    ];
    data.extend_from_slice(cmd);
    Frame::new(number, data)
}

/// PRes from a controlled node with `payload`.
pub fn pres(number: u32, src: u8, payload: &[u8]) -> Frame {
    pdo_frame(number, 0x04, BROADCAST, src, payload)
}

/// PReq from the managing node with `payload`.
pub fn preq(number: u32, dest: u8, payload: &[u8]) -> Frame {
    pdo_frame(number, 0x03, dest, MN, payload)
}

fn pdo_frame(number: u32, mtype: u8, dest: u8, src: u8, payload: &[u8]) -> Frame {
    let mut data = vec![mtype, dest, src, 0, 0, 0, 0, 0];
    data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    data.extend_from_slice(payload);
    Frame::new(number, data)
}

/// ASnd IdentResponse announcing a device identity.
pub fn ident_response(number: u32, src: u8, device_type: u16, vendor: u32, product: u32) -> Frame {
    let mut data = vec![0u8; 4 + 40];
    data[0] = 0x06;
    data[1] = BROADCAST;
    data[2] = src;
    data[3] = 0x01;
    data[26..28].copy_from_slice(&device_type.to_le_bytes());
    data[30..34].copy_from_slice(&vendor.to_le_bytes());
    data[34..38].copy_from_slice(&product.to_le_bytes());
    Frame::new(number, data)
}

// ---------------------------------------------------------------------------
// Command layer
// ---------------------------------------------------------------------------

pub const WRITE_BY_INDEX: u8 = 0x01;
pub const READ_BY_INDEX: u8 = 0x02;
pub const WRITE_MULTIPLE: u8 = 0x31;

const RESPONSE: u8 = 0x80;
const ABORT: u8 = 0x40;
const INITIATE: u8 = 0x10;
const SEGMENT: u8 = 0x20;
const COMPLETE: u8 = 0x30;

/// Command layer with a segment size covering `body`.
pub fn command(flags: u8, id: u8, body: &[u8]) -> Vec<u8> {
    let size = (body.len() as u16).to_le_bytes();
    let mut cmd = vec![0x00, 0x01, flags, id, size[0], size[1], 0x00, 0x00];
    cmd.extend_from_slice(body);
    cmd
}

fn address(index: u16, sub: u8) -> Vec<u8> {
    let i = index.to_le_bytes();
    vec![i[0], i[1], sub, 0x00]
}

pub fn write_expedited(index: u16, sub: u8, data: &[u8]) -> Vec<u8> {
    let mut body = address(index, sub);
    body.extend_from_slice(data);
    command(0x00, WRITE_BY_INDEX, &body)
}

/// Initiate of a segmented WriteByIndex; `total` excludes the address.
pub fn write_initiate(index: u16, sub: u8, total: u32, first: &[u8]) -> Vec<u8> {
    let mut body = total.to_le_bytes().to_vec();
    body.extend_from_slice(&address(index, sub));
    body.extend_from_slice(first);
    command(INITIATE, WRITE_BY_INDEX, &body)
}

pub fn write_segment(data: &[u8], complete: bool) -> Vec<u8> {
    command(if complete { COMPLETE } else { SEGMENT }, WRITE_BY_INDEX, data)
}

pub fn read_request(index: u16, sub: u8) -> Vec<u8> {
    command(0x00, READ_BY_INDEX, &address(index, sub))
}

pub fn read_response(data: &[u8]) -> Vec<u8> {
    command(RESPONSE, READ_BY_INDEX, data)
}

pub fn read_response_initiate(total: u32, first: &[u8]) -> Vec<u8> {
    let mut body = total.to_le_bytes().to_vec();
    body.extend_from_slice(first);
    command(RESPONSE | INITIATE, READ_BY_INDEX, &body)
}

pub fn read_response_segment(data: &[u8], complete: bool) -> Vec<u8> {
    command(
        RESPONSE | if complete { COMPLETE } else { SEGMENT },
        READ_BY_INDEX,
        data,
    )
}

pub fn abort(id: u8, code: u32) -> Vec<u8> {
    command(ABORT, id, &code.to_le_bytes())
}

/// WriteMultipleParamByIndex request; entries are `(index, sub, data)`.
pub fn write_multiple(entries: &[(u16, u8, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (i, (index, sub, data)) in entries.iter().enumerate() {
        let padding = (4 - data.len() % 4) % 4;
        let span = 8 + data.len() + padding;
        let last = i + 1 == entries.len();
        // Offsets count from the command layer start (8-byte header).
        let next = if last { 0 } else { (8 + body.len() + span) as u32 };
        body.extend_from_slice(&next.to_le_bytes());
        let idx = index.to_le_bytes();
        body.extend_from_slice(&[idx[0], idx[1], *sub, padding as u8]);
        body.extend_from_slice(data);
        if !last {
            body.extend(std::iter::repeat(0u8).take(padding));
        }
    }
    command(0x00, WRITE_MULTIPLE, &body)
}

/// Packed mapping value in wire order.
pub fn mapping_bytes(index: u16, sub: u8, bit_offset: u16, bit_length: u8) -> Vec<u8> {
    let raw = index as u64
        | (sub as u64) << 16
        | (bit_offset as u64) << 32
        | (bit_length as u64) << 48;
    raw.to_le_bytes().to_vec()
}

// ---------------------------------------------------------------------------
// Dictionaries
// ---------------------------------------------------------------------------

/// Small IO module profile bound to `node`.
pub fn io_module(node: u8) -> ObjectDictionary {
    io_module_profile(node).expect("io-module profile is well formed")
}

fn io_module_profile(node: u8) -> Result<ObjectDictionary, DictionaryError> {
    Ok(ObjectDictionary::builder()
        .name("io-module")
        .node_id(node)
        .object(0x1008, EntryInfo::new("NMT_ManufactDevName_VS", EntryKind::Variable, Some(ValueType::VisibleString)))
        .object(0x1018, EntryInfo::new("NMT_IdentityObject_REC", EntryKind::Record, None))
        .subentry(0x1018, 1, EntryInfo::new("VendorId_U32", EntryKind::Variable, Some(ValueType::Unsigned32)))?
        .subentry(0x1018, 2, EntryInfo::new("ProductCode_U32", EntryKind::Variable, Some(ValueType::Unsigned32)))?
        .object(0x2000, EntryInfo::new("Greeting", EntryKind::Variable, Some(ValueType::VisibleString)))
        .object(0x6000, EntryInfo::new("DigitalInput", EntryKind::Array, Some(ValueType::Unsigned8)))
        .subentry(0x6000, 1, EntryInfo::new("DigitalInput_01", EntryKind::Variable, Some(ValueType::Unsigned8)))?
        .subentry(0x6000, 2, EntryInfo::new("DigitalInput_02", EntryKind::Variable, Some(ValueType::Unsigned16)))?
        .object(0x6200, EntryInfo::new("DigitalOutput", EntryKind::Variable, Some(ValueType::Unsigned8)))
        .build())
}
