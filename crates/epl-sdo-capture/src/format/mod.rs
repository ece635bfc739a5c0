// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capture file formats.
//!
//! Supports:
//! - libpcap (`.pcap`, `.cap`), Ethernet link type, EtherType 0x88AB
//! - JSON lines (`.jsonl`, `.ndjson`), one frame object per line

pub mod jsonl;
pub mod pcap;

pub use jsonl::{FrameRecord, JsonlReader};
pub use pcap::{PcapReader, ETHERTYPE_POWERLINK, ETHERTYPE_VLAN, LINKTYPE_ETHERNET};

use epl_sdo::Frame;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Capture reading errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unrecognized capture format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid pcap file: {0}")]
    InvalidPcap(String),

    #[error("Unsupported pcap link type {0} (only Ethernet is decoded)")]
    UnsupportedLinkType(u32),

    #[error("Invalid frame record on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of captured frames, in capture order.
pub trait FrameSource {
    /// Next POWERLINK frame, `None` at end of capture.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Drain the remaining frames.
    fn read_all(&mut self) -> Result<Vec<Frame>, CaptureError> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}

/// Supported capture formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// libpcap, microsecond or nanosecond timestamps, either byte order.
    Pcap,
    /// JSON lines of [`FrameRecord`].
    JsonLines,
}

impl CaptureFormat {
    /// Detect format from file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("pcap" | "cap") => Some(Self::Pcap),
            Some("jsonl" | "ndjson") => Some(Self::JsonLines),
            _ => None,
        }
    }

    /// Detect format from the first bytes of a file.
    pub fn sniff(head: &[u8]) -> Option<Self> {
        if head.len() >= 4 && pcap::Magic::parse(head[..4].try_into().ok()?).is_some() {
            return Some(Self::Pcap);
        }
        match head.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Open a capture file, detecting the format by extension then content.
pub fn open_capture(path: &Path) -> Result<Box<dyn FrameSource>, CaptureError> {
    let format = match CaptureFormat::from_extension(path) {
        Some(format) => format,
        None => {
            let mut head = [0u8; 16];
            let n = File::open(path)?.read(&mut head)?;
            CaptureFormat::sniff(&head[..n])
                .ok_or_else(|| CaptureError::UnsupportedFormat(path.display().to_string()))?
        }
    };

    let reader = BufReader::new(File::open(path)?);
    Ok(match format {
        CaptureFormat::Pcap => Box::new(PcapReader::new(reader)?),
        CaptureFormat::JsonLines => Box::new(JsonlReader::new(reader)),
    })
}

/// Read every POWERLINK frame of a capture file.
pub fn read_capture(path: &Path) -> Result<Vec<Frame>, CaptureError> {
    open_capture(path)?.read_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_format_from_extension() {
        assert_eq!(
            CaptureFormat::from_extension(Path::new("cycle.pcap")),
            Some(CaptureFormat::Pcap)
        );
        assert_eq!(
            CaptureFormat::from_extension(Path::new("frames.jsonl")),
            Some(CaptureFormat::JsonLines)
        );
        assert_eq!(CaptureFormat::from_extension(Path::new("frames.txt")), None);
    }

    #[test]
    fn test_sniff() {
        assert_eq!(
            CaptureFormat::sniff(&[0xD4, 0xC3, 0xB2, 0xA1, 2, 0]),
            Some(CaptureFormat::Pcap)
        );
        assert_eq!(
            CaptureFormat::sniff(b"  {\"number\":1"),
            Some(CaptureFormat::JsonLines)
        );
        assert_eq!(CaptureFormat::sniff(b"EPL"), None);
    }
}
