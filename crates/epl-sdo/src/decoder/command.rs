// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDO frame handling: sequence layer verdict, then command dispatch.
//!
//! ```text
//! request  WriteByIndex        Exp      -> field / mapping update
//!                              Init/Seg -> download reassembly
//! request  WriteMultipleParam  Exp      -> entries -> field / mapping update
//!                              Init/Seg -> download reassembly -> entries
//! request  ReadByIndex                  -> read ring
//! response ReadByIndex         Exp      -> correlated field
//!                              Init/Seg -> upload reassembly -> correlated field
//! any      abort flag                   -> abort code / abort records
//! ```

use crate::config::DecoderConfig;
use crate::conversation::Conversation;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::dictionary::{resolve_in, ObjectDictionary};
use crate::frame::le_u32;
use crate::mapping::{ObjectAddress, ObjectMapping, PdoDirection};
use crate::scratch::{ScratchKey, ScratchStore, ScratchValue};
use crate::sdo::{
    parse_abort_records, parse_address, parse_multiple_entries, AbortCode, CommandHeader,
    CommandId, Fragment, ReadRequest, Reassembled, Segmentation, SequenceHeader,
    SequenceStateMachine, COMMAND_HEADER_LEN, SEQUENCE_HEADER_LEN,
};

use super::report::{Field, FrameReport};

/// Length of the index/sub-index prefix of ByIndex data.
const ADDRESS_LEN: usize = 4;

/// Frame-wide inputs to SDO decoding.
pub(crate) struct SdoContext<'a> {
    pub frame: u32,
    pub src: u8,
    pub dest: u8,
    pub machine: &'a SequenceStateMachine,
    pub scratch: &'a ScratchStore,
    pub config: &'a DecoderConfig,
}

/// Decode the SDO layer starting at `sdo`.
///
/// Returns the number of reassembly restarts this frame caused.
pub(crate) fn decode_sdo(
    ctx: &SdoContext<'_>,
    convo: &mut Conversation,
    sdo: &[u8],
    report: &mut FrameReport,
) -> u64 {
    let Some(header) = SequenceHeader::parse(sdo) else {
        return 0;
    };
    report.sequence = Some(header);
    convo.seq_send = header.raw_send();

    let verdict = match ctx.scratch.verdict(ctx.frame) {
        Some(verdict) => verdict,
        None => {
            let verdict = ctx.machine.process(
                &mut convo.duplicates,
                ctx.src,
                ctx.dest,
                &header,
                ctx.frame,
                &mut report.diagnostics,
            );
            ctx.scratch
                .insert(ctx.frame, ScratchKey::Verdict, ScratchValue::Verdict(verdict));
            verdict
        }
    };
    report.verdict = Some(verdict);
    if !verdict.decodes_command_layer(ctx.config.show_command_layer_for_duplicates) {
        return 0;
    }

    let cmd = sdo.get(SEQUENCE_HEADER_LEN..).unwrap_or(&[]);
    let Some(command) = CommandHeader::parse(cmd) else {
        return 0;
    };
    report.command = Some(command);
    if command.is_empty() {
        return 0;
    }

    let captured = command.captured_len(cmd);
    if captured < command.segment_size as usize {
        report.diagnostics.push(Diagnostic::new(
            ctx.frame,
            DiagnosticKind::PayloadLengthMismatch {
                declared: command.segment_size as usize,
                captured,
            },
        ));
    }

    if command.abort {
        decode_abort(&command, cmd, report);
        return 0;
    }

    let restarts_before = convo.download.stats().restarts + convo.upload.stats().restarts;
    let server = if command.response { ctx.src } else { ctx.dest };
    let dict = convo.profiles.for_server(server);
    let step = CommandStep {
        frame: ctx.frame,
        header,
        command,
        cmd,
        dict: dict.as_deref(),
        scratch: ctx.scratch,
    };

    match (command.command, command.response) {
        (CommandId::WriteByIndex, false) => step.write_by_index(convo, report),
        (CommandId::WriteMultipleParamByIndex, false) => step.write_multiple(convo, report),
        (CommandId::ReadByIndex, false) => step.read_request(convo, report),
        (CommandId::ReadByIndex, true) => step.read_response(convo, report),
        _ => {
            let data = command.data(cmd);
            if !data.is_empty() {
                report.fields.push(Field::raw("Data", data));
            }
        }
    }

    convo.download.stats().restarts + convo.upload.stats().restarts - restarts_before
}

fn decode_abort(command: &CommandHeader, cmd: &[u8], report: &mut FrameReport) {
    if command.response && command.command == CommandId::WriteMultipleParamByIndex {
        let end = command.segment_end().min(cmd.len());
        let records = cmd.get(COMMAND_HEADER_LEN..end).unwrap_or(&[]);
        report.abort_records = parse_abort_records(records);
    } else if let Some(code) = le_u32(cmd, COMMAND_HEADER_LEN) {
        report.abort = Some(AbortCode(code));
    }
}

// ============================================================================
// Command handlers
// ============================================================================

struct CommandStep<'a> {
    frame: u32,
    header: SequenceHeader,
    command: CommandHeader,
    cmd: &'a [u8],
    dict: Option<&'a ObjectDictionary>,
    scratch: &'a ScratchStore,
}

impl CommandStep<'_> {
    fn data(&self) -> &[u8] {
        self.command.data(self.cmd)
    }

    fn fragment(&self) -> Fragment<'_> {
        Fragment {
            frame: self.frame,
            recv_seq: self.header.recv_seq,
            send_seq: self.header.send_seq,
            data: self.data(),
        }
    }

    fn complete(&self) -> bool {
        self.command.segmentation == Segmentation::Complete
    }

    fn write_by_index(&self, convo: &mut Conversation, report: &mut FrameReport) {
        match self.command.segmentation {
            Segmentation::Expedited => {
                let data = self.data();
                if let Some(address) = parse_address(data) {
                    self.apply_write(convo, address, data.get(ADDRESS_LEN..).unwrap_or(&[]), report);
                }
            }
            Segmentation::Initiate => {
                let data = self.data();
                let Some(address) = parse_address(data) else {
                    return;
                };
                convo.download_target = Some(address);
                convo.download.initiate(
                    self.frame,
                    self.command.data_size.unwrap_or(0),
                    self.header.ack_requested(),
                    data.get(ADDRESS_LEN..).unwrap_or(&[]),
                );
            }
            Segmentation::Segment | Segmentation::Complete => {
                if let Some(done) = convo.download.segment(self.fragment(), self.complete()) {
                    self.check_length(&done, report);
                    match convo.download_target.take() {
                        Some(address) => self.apply_write(convo, address, &done.data, report),
                        None => report.fields.push(Field::raw("Data", &done.data)),
                    }
                    report.reassembled = Some(done);
                }
            }
        }
    }

    fn write_multiple(&self, convo: &mut Conversation, report: &mut FrameReport) {
        match self.command.segmentation {
            Segmentation::Expedited => {
                let entries = parse_multiple_entries(
                    self.cmd,
                    self.command.data_offset(),
                    self.command.segment_end(),
                );
                for entry in entries {
                    self.apply_write(convo, entry.address, entry.data, report);
                }
            }
            Segmentation::Initiate => {
                convo.download_target = None;
                convo.download.initiate(
                    self.frame,
                    self.command.data_size.unwrap_or(0),
                    self.header.ack_requested(),
                    self.data(),
                );
            }
            Segmentation::Segment | Segmentation::Complete => {
                if let Some(done) = convo.download.segment(self.fragment(), self.complete()) {
                    self.check_length(&done, report);
                    // Entry offsets count from the command layer start.
                    let mut buf = vec![0u8; COMMAND_HEADER_LEN];
                    buf.extend_from_slice(&done.data);
                    for entry in parse_multiple_entries(&buf, COMMAND_HEADER_LEN, buf.len()) {
                        self.apply_write(convo, entry.address, entry.data, report);
                    }
                    report.reassembled = Some(done);
                }
            }
        }
    }

    fn read_request(&self, convo: &mut Conversation, report: &mut FrameReport) {
        let Some(address) = parse_address(self.data()) else {
            return;
        };
        let resolution = resolve_in(self.dict, address.index, address.sub_index);
        convo
            .correlator
            .record(convo.seq_send, address, resolution.clone());
        report.read_request = Some(ReadRequest {
            send_sequence: convo.seq_send,
            address,
            resolution,
        });
    }

    fn read_response(&self, convo: &mut Conversation, report: &mut FrameReport) {
        let found = convo
            .correlator
            .resolve(self.scratch, self.frame, convo.seq_send);
        report.read_request = found.clone();

        match self.command.segmentation {
            Segmentation::Expedited => {
                report.fields.push(response_field(found.as_ref(), self.data()));
            }
            Segmentation::Initiate => {
                convo.upload_request = found;
                convo.upload.initiate(
                    self.frame,
                    self.command.data_size.unwrap_or(0),
                    self.header.ack_requested(),
                    self.data(),
                );
            }
            Segmentation::Segment | Segmentation::Complete => {
                if let Some(done) = convo.upload.segment(self.fragment(), self.complete()) {
                    self.check_length(&done, report);
                    let request = convo.upload_request.take().or(found);
                    report.fields.push(response_field(request.as_ref(), &done.data));
                    report.reassembled = Some(done);
                }
            }
        }
    }

    /// Store a written value: mapping parameters update the timeline,
    /// everything else becomes a typed field.
    fn apply_write(
        &self,
        convo: &mut Conversation,
        address: ObjectAddress,
        data: &[u8],
        report: &mut FrameReport,
    ) {
        if let Some(direction) = PdoDirection::for_parameter(address.index, address.sub_index) {
            if let Some(mut mapping) = ObjectMapping::from_bytes(address, data, self.frame) {
                mapping.resolve(self.dict);
                if convo.timeline_mut(direction).insert(mapping.clone()) {
                    log::debug!(
                        "[sdo] frame {}: {} mapping {} -> {} ({} bits @ {})",
                        self.frame,
                        direction.as_str(),
                        address,
                        mapping.pdo,
                        mapping.bit_length,
                        mapping.bit_offset
                    );
                    report.mapping_updates.push(mapping);
                }
                return;
            }
        }
        let resolution = resolve_in(self.dict, address.index, address.sub_index);
        report.fields.push(Field::object(address, &resolution, data));
    }

    fn check_length(&self, done: &Reassembled, report: &mut FrameReport) {
        if let Some(declared) = done.declared.filter(|_| done.length_mismatch()) {
            report.diagnostics.push(Diagnostic::new(
                self.frame,
                DiagnosticKind::ReassemblyLengthMismatch {
                    declared,
                    reassembled: done.data.len(),
                },
            ));
        }
    }
}

fn response_field(request: Option<&ReadRequest>, data: &[u8]) -> Field {
    match request {
        Some(req) => Field::object(req.address, &req.resolution, data),
        None => Field::raw("Data", data),
    }
}
