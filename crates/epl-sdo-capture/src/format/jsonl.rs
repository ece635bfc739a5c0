// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON-lines frame captures.
//!
//! One object per line, blank lines and `#` comments ignored:
//!
//! ```text
//! {"number": 1, "data": [6, 1, 240, 5, 14, 22, 0, 0]}
//! {"data": [4, 255, 1, 0, 0, 0, 0, 0, 1, 0, 42], "reported_len": 60}
//! ```
//!
//! `data` starts at the POWERLINK message type byte. A missing `number`
//! continues from the previous record.

use super::{CaptureError, FrameSource};
use epl_sdo::Frame;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// One captured frame as stored on a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    pub data: Vec<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_len: Option<usize>,
}

impl FrameRecord {
    fn into_frame(self, fallback_number: u32) -> Frame {
        let number = self.number.unwrap_or(fallback_number);
        let frame = Frame::new(number, self.data);
        match self.reported_len {
            Some(len) => frame.with_reported_len(len),
            None => frame,
        }
    }
}

impl From<&Frame> for FrameRecord {
    fn from(frame: &Frame) -> Self {
        Self {
            number: Some(frame.number),
            data: frame.data.clone(),
            reported_len: frame.is_truncated().then_some(frame.reported_len),
        }
    }
}

/// Streaming JSON-lines reader.
pub struct JsonlReader<R> {
    reader: R,
    line: usize,
    last_number: u32,
    buf: String,
}

impl<R: BufRead> JsonlReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            last_number: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> FrameSource for JsonlReader<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let record: FrameRecord = serde_json::from_str(text).map_err(|source| CaptureError::Json {
                line: self.line,
                source,
            })?;
            let frame = record.into_frame(self.last_number.saturating_add(1));
            self.last_number = frame.number;
            return Ok(Some(frame));
        }
    }
}
