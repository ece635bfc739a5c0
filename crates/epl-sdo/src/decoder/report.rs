// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-frame decode output.

use std::fmt;

use crate::diagnostics::Diagnostic;
use crate::dictionary::{DeviceIdentity, Resolution};
use crate::frame::{MessageType, ServiceId};
use crate::mapping::{ObjectAddress, ObjectMapping};
use crate::sdo::{
    AbortCode, AbortRecord, CommandHeader, ReadRequest, Reassembled, SequenceHeader,
    SequenceVerdict,
};
use crate::value::{decode_value, DecodedValue};

/// One decoded value with its dictionary context.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Field {
    /// Display label (`PDO - 6000:01`, `2000:00`, `Payload`).
    pub label: String,
    pub address: Option<ObjectAddress>,
    pub index_name: Option<String>,
    pub entry_name: Option<String>,
    pub value: DecodedValue,
    /// Mapping provenance when enabled.
    pub note: Option<String>,
}

impl Field {
    /// Value of an addressed object, typed from `resolution`.
    pub fn object(address: ObjectAddress, resolution: &Resolution, data: &[u8]) -> Self {
        Self {
            label: address.to_string(),
            address: Some(address),
            index_name: resolution.index_name.clone(),
            entry_name: resolution.entry_name().map(str::to_string),
            value: decode_value(resolution.value_type(), data, data.len()),
            note: None,
        }
    }

    /// Untyped byte dump.
    pub fn raw(label: &str, data: &[u8]) -> Self {
        Self {
            label: label.to_string(),
            address: None,
            index_name: None,
            entry_name: None,
            value: decode_value(None, data, data.len()),
            note: None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)?;
        match (&self.index_name, &self.entry_name) {
            (Some(idx), Some(entry)) => write!(f, " ({}/{})", idx, entry)?,
            (Some(idx), None) => write!(f, " ({})", idx)?,
            (None, Some(entry)) => write!(f, " ({})", entry)?,
            (None, None) => {}
        }
        write!(f, ": {}", self.value.value)?;
        if let Some(note) = &self.note {
            write!(f, " [{}]", note)?;
        }
        Ok(())
    }
}

/// Everything the decoder learned from one frame.
///
/// Built once per frame number and cached; decoding the same frame again
/// returns the same report.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FrameReport {
    pub frame: u32,
    /// `None` when the frame is too short to classify.
    pub message_type: Option<MessageType>,
    pub src: u8,
    pub dest: u8,
    /// Conversation key, for frames routed to a conversation.
    pub conversation: Option<u8>,
    pub service: Option<ServiceId>,
    pub sequence: Option<SequenceHeader>,
    pub verdict: Option<SequenceVerdict>,
    pub command: Option<CommandHeader>,
    pub abort: Option<AbortCode>,
    pub abort_records: Vec<AbortRecord>,
    pub fields: Vec<Field>,
    pub reassembled: Option<Reassembled>,
    /// Mapping rows this frame inserted into a timeline.
    pub mapping_updates: Vec<ObjectMapping>,
    /// Read request recorded (request) or correlated (response).
    pub read_request: Option<ReadRequest>,
    /// Identity announced by an IdentResponse.
    pub identity: Option<DeviceIdentity>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FrameReport {
    pub fn new(frame: u32) -> Self {
        Self {
            frame,
            ..Default::default()
        }
    }

    /// Frame was classified as POWERLINK.
    pub fn is_powerlink(&self) -> bool {
        matches!(self.message_type, Some(t) if !matches!(t, MessageType::Unknown(_)))
    }

    pub fn is_duplicate(&self) -> bool {
        self.verdict.is_some_and(SequenceVerdict::is_duplicate)
    }

    /// One-line summary used by the capture tool.
    pub fn summary(&self) -> String {
        let Some(mtype) = self.message_type else {
            return format!("#{} <short frame>", self.frame);
        };

        let mut out = format!(
            "#{} {} {:>3}->{:<3}",
            self.frame,
            mtype.abbreviation(),
            self.src,
            self.dest
        );
        if let Some(service) = self.service {
            out.push_str(&format!(" {:?}", service));
        }
        if let Some(seq) = &self.sequence {
            out.push_str(&format!(" {}", seq));
        }
        if let Some(SequenceVerdict::Duplicate { original }) = self.verdict {
            out.push_str(&format!(" [dup of #{}]", original));
        }
        if let Some(cmd) = &self.command {
            out.push_str(&format!(" {}", cmd));
        }
        if let Some(code) = self.abort {
            out.push_str(&format!(" Abort {}", code));
        }
        if let Some(req) = &self.read_request {
            out.push_str(&format!(" -> {}", req.address));
        }
        out
    }
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())?;
        for field in &self.fields {
            write!(f, "\n    {}", field)?;
        }
        for mapping in &self.mapping_updates {
            write!(f, "\n    {} <- {}", mapping.title(), mapping.provenance())?;
        }
        if let Some(done) = &self.reassembled {
            write!(
                f,
                "\n    reassembled {} bytes from {} fragments (#{}..#{})",
                done.data.len(),
                done.fragments,
                done.first_frame,
                done.last_frame
            )?;
        }
        for rec in &self.abort_records {
            write!(f, "\n    abort {} sub {}: {}", rec.address, rec.sub_abort, rec.code)?;
        }
        for diag in &self.diagnostics {
            write!(f, "\n    ! {}", diag.kind)?;
        }
        Ok(())
    }
}
