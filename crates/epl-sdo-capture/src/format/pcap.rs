// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! libpcap capture reader.
//!
//! # File layout
//!
//! ```text
//! +---------------------------------------------------------+
//! | Global header (24 bytes)                                 |
//! |  magic (4) | major (2) | minor (2) | zone (4)            |
//! |  sigfigs (4) | snaplen (4) | link type (4)               |
//! +---------------------------------------------------------+
//! | Record header (16) | packet bytes (incl_len)             |
//! +---------------------------------------------------------+
//! | ...                                                      |
//! ```
//!
//! Packets are numbered from 1 in file order, including packets that
//! are not POWERLINK, so frame numbers line up with other capture tools.

use super::{CaptureError, FrameSource};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use epl_sdo::Frame;
use std::io::{self, Read};

/// Ethernet (DLT_EN10MB).
pub const LINKTYPE_ETHERNET: u32 = 1;

/// EtherType carried by POWERLINK frames.
pub const ETHERTYPE_POWERLINK: u16 = 0x88AB;

/// IEEE 802.1Q tag.
pub const ETHERTYPE_VLAN: u16 = 0x8100;

const GLOBAL_HEADER_LEN: usize = 24;
const RECORD_HEADER_LEN: usize = 16;
const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;

/// Upper bound on a single captured packet.
const MAX_PACKET_LEN: u32 = 256 * 1024;

/// Byte order announced by the magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Magic {
    Little,
    Big,
}

impl Magic {
    pub(crate) fn parse(bytes: [u8; 4]) -> Option<Self> {
        match bytes {
            // Microsecond and nanosecond variants.
            [0xD4, 0xC3, 0xB2, 0xA1] | [0x4D, 0x3C, 0xB2, 0xA1] => Some(Self::Little),
            [0xA1, 0xB2, 0xC3, 0xD4] | [0xA1, 0xB2, 0x3C, 0x4D] => Some(Self::Big),
            _ => None,
        }
    }

    fn u32(self, bytes: &[u8]) -> u32 {
        match self {
            Self::Little => LittleEndian::read_u32(bytes),
            Self::Big => BigEndian::read_u32(bytes),
        }
    }
}

/// Streaming pcap reader yielding POWERLINK frames.
pub struct PcapReader<R> {
    reader: R,
    magic: Magic,
    snaplen: u32,
    packets: u32,
    skipped: u32,
}

impl<R: Read> PcapReader<R> {
    /// Read and validate the global header.
    pub fn new(mut reader: R) -> Result<Self, CaptureError> {
        let mut header = [0u8; GLOBAL_HEADER_LEN];
        reader.read_exact(&mut header).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => CaptureError::InvalidPcap("truncated global header".into()),
            _ => CaptureError::Io(e),
        })?;

        let magic = Magic::parse([header[0], header[1], header[2], header[3]])
            .ok_or_else(|| CaptureError::InvalidPcap(format!("bad magic {:02X?}", &header[..4])))?;

        let link_type = magic.u32(&header[20..24]);
        if link_type != LINKTYPE_ETHERNET {
            return Err(CaptureError::UnsupportedLinkType(link_type));
        }

        Ok(Self {
            reader,
            magic,
            snaplen: magic.u32(&header[16..20]),
            packets: 0,
            skipped: 0,
        })
    }

    /// Snapshot length declared in the global header.
    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    /// Packets read so far, POWERLINK or not.
    pub fn packets(&self) -> u32 {
        self.packets
    }

    /// Packets skipped because they were not POWERLINK.
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    /// Next raw packet as `(captured bytes, original length)`.
    fn next_packet(&mut self) -> Result<Option<(Vec<u8>, usize)>, CaptureError> {
        let mut record = [0u8; RECORD_HEADER_LEN];
        match read_full(&mut self.reader, &mut record)? {
            0 => return Ok(None),
            RECORD_HEADER_LEN => {}
            n => {
                return Err(CaptureError::InvalidPcap(format!(
                    "truncated record header after packet {} ({} of {} bytes)",
                    self.packets, n, RECORD_HEADER_LEN
                )))
            }
        }

        let incl_len = self.magic.u32(&record[8..12]);
        let orig_len = self.magic.u32(&record[12..16]);
        if incl_len > MAX_PACKET_LEN {
            return Err(CaptureError::InvalidPcap(format!(
                "packet {} claims {} captured bytes",
                self.packets + 1,
                incl_len
            )));
        }

        let mut data = vec![0u8; incl_len as usize];
        self.reader.read_exact(&mut data).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                CaptureError::InvalidPcap(format!("truncated packet {}", self.packets + 1))
            }
            _ => CaptureError::Io(e),
        })?;

        self.packets += 1;
        Ok(Some((data, orig_len.max(incl_len) as usize)))
    }
}

impl<R: Read> FrameSource for PcapReader<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        while let Some((packet, orig_len)) = self.next_packet()? {
            let Some(offset) = powerlink_offset(&packet) else {
                self.skipped += 1;
                continue;
            };
            let frame = Frame::new(self.packets, &packet[offset..])
                .with_reported_len(orig_len.saturating_sub(offset));
            return Ok(Some(frame));
        }
        Ok(None)
    }
}

/// Offset of the POWERLINK header inside an Ethernet packet.
fn powerlink_offset(packet: &[u8]) -> Option<usize> {
    let mut offset = ETHERNET_HEADER_LEN - 2;
    let mut ethertype = BigEndian::read_u16(packet.get(offset..offset + 2)?);
    if ethertype == ETHERTYPE_VLAN {
        offset += VLAN_TAG_LEN;
        ethertype = BigEndian::read_u16(packet.get(offset..offset + 2)?);
    }
    (ethertype == ETHERTYPE_POWERLINK).then_some(offset + 2)
}

/// Fill `buf`, returning fewer bytes only at end of input.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn global_header(little: bool, link: u32) -> Vec<u8> {
        let words = [0u32, 0, 65535, link];
        let mut buf = Vec::new();
        if little {
            buf.extend_from_slice(&0xA1B2_C3D4u32.to_le_bytes());
            buf.extend_from_slice(&2u16.to_le_bytes());
            buf.extend_from_slice(&4u16.to_le_bytes());
            words.iter().for_each(|w| buf.extend_from_slice(&w.to_le_bytes()));
        } else {
            buf.extend_from_slice(&0xA1B2_C3D4u32.to_be_bytes());
            buf.extend_from_slice(&2u16.to_be_bytes());
            buf.extend_from_slice(&4u16.to_be_bytes());
            words.iter().for_each(|w| buf.extend_from_slice(&w.to_be_bytes()));
        }
        buf
    }

    fn record(buf: &mut Vec<u8>, packet: &[u8], orig: u32) {
        for word in [1, 0, packet.len() as u32, orig] {
            buf.extend_from_slice(&word.to_le_bytes());
        }
        buf.extend_from_slice(packet);
    }

    fn ethernet(ethertype: u16, vlan: bool, payload: &[u8]) -> Vec<u8> {
        let mut p = vec![0x01, 0x11, 0x1E, 0, 0, 0x01, 0x00, 0x60, 0x65, 0, 0, 0xF0];
        if vlan {
            p.extend_from_slice(&[0x81, 0x00, 0x00, 0x05]);
        }
        p.extend_from_slice(&ethertype.to_be_bytes());
        p.extend_from_slice(payload);
        p
    }

    #[test]
    fn test_reads_powerlink_and_numbers_all_packets() {
        let mut file = global_header(true, LINKTYPE_ETHERNET);
        let soc = [0x01, 0xFF, 0xF0, 0x00];
        record(&mut file, &ethernet(0x0800, false, &[0x45; 20]), 34);
        record(&mut file, &ethernet(ETHERTYPE_POWERLINK, false, &soc), 18);
        record(&mut file, &ethernet(ETHERTYPE_POWERLINK, true, &soc), 22);

        let mut reader = PcapReader::new(Cursor::new(file)).unwrap();
        let frames = reader.read_all().unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].number, 2);
        assert_eq!(frames[0].data, soc);
        assert_eq!(frames[1].number, 3);
        assert_eq!(frames[1].data, soc);
        assert_eq!(reader.packets(), 3);
        assert_eq!(reader.skipped(), 1);
    }

    #[test]
    fn test_snapped_packet_keeps_original_length() {
        let mut file = global_header(true, LINKTYPE_ETHERNET);
        record(&mut file, &ethernet(ETHERTYPE_POWERLINK, false, &[0x06, 0x01, 0xF0]), 114);

        let frame = PcapReader::new(Cursor::new(file))
            .unwrap()
            .next_frame()
            .unwrap()
            .unwrap();
        assert!(frame.is_truncated());
        assert_eq!(frame.reported_len, 100);
    }

    #[test]
    fn test_big_endian_header() {
        let file = global_header(false, LINKTYPE_ETHERNET);
        let reader = PcapReader::new(Cursor::new(file)).unwrap();
        assert_eq!(reader.snaplen(), 65535);
    }

    #[test]
    fn test_rejects_other_link_types() {
        let file = global_header(true, 113);
        assert!(matches!(
            PcapReader::new(Cursor::new(file)),
            Err(CaptureError::UnsupportedLinkType(113))
        ));
    }

    #[test]
    fn test_truncated_record_is_error() {
        let mut file = global_header(true, LINKTYPE_ETHERNET);
        file.extend_from_slice(&[1, 0, 0, 0, 0, 0]);
        let mut reader = PcapReader::new(Cursor::new(file)).unwrap();
        assert!(matches!(reader.next_frame(), Err(CaptureError::InvalidPcap(_))));
    }
}
