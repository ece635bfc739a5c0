// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame-sequential decoder.
//!
//! # Architecture
//!
//! ```text
//! Frame --> classify --+-- PReq/PRes -----> MappingTimeline --> fields
//!                      |
//!                      +-- ASnd/AInv --+-- IdentResponse --> cut-over, profile binding
//!                      |               |
//!                      |               +-- SDO --> SequenceStateMachine
//!                      |                            +-- DuplicateCache
//!                      |                            +-- FragmentReassembler x2
//!                      |                            +-- ReadRequestCorrelator
//!                      +-- other ------> classification only
//!
//! ConversationRegistry: node -> [Conversation ...]
//! ScratchStore:         (frame, key) -> pinned verdicts / reports
//! ```
//!
//! Frames must be fed in capture order. A frame number that was already
//! decoded returns its cached [`FrameReport`] without touching any state,
//! so a second pass over the capture is free and identical.
//!
//! # Usage
//!
//! ```ignore
//! use epl_sdo::{Decoder, DecoderConfig, DictionarySet, Frame};
//!
//! let decoder = Decoder::new(DecoderConfig::default())
//!     .with_dictionaries(DictionarySet::new().with(io_module));
//! for frame in frames {
//!     let report = decoder.decode(&frame);
//!     println!("{}", report);
//! }
//! println!("{:?}", decoder.stats());
//! ```

mod command;
mod pdo;
mod report;

pub use report::{Field, FrameReport};

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::config::DecoderConfig;
use crate::conversation::{Conversation, ConversationRegistry};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticsSink, LogSink};
use crate::dictionary::{DeviceIdentity, DictionarySet};
use crate::frame::{
    conversation_key, le_u16, le_u32, Frame, MessageType, ServiceId, MN_NODE_ID,
};
use crate::mapping::PdoDirection;
use crate::scratch::{ScratchKey, ScratchStore, ScratchValue};
use crate::sdo::SequenceStateMachine;

use command::{decode_sdo, SdoContext};
use pdo::decode_pdo;

/// Offset of the service id in an ASnd frame.
const ASND_SERVICE_OFFSET: usize = 3;
/// Offset of the service id in an AInv frame.
const AINV_SERVICE_OFFSET: usize = 6;

// IdentResponse fields, relative to the service payload.
const IDENT_DEVICE_TYPE: usize = 22;
const IDENT_VENDOR_ID: usize = 26;
const IDENT_PRODUCT_CODE: usize = 30;

/// Decoder statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames decoded (cached re-decodes excluded).
    pub frames: u64,
    /// Frames carrying an SDO sequence layer.
    pub sdo_frames: u64,
    /// Frames flagged as duplicates.
    pub duplicates: u64,
    /// Segmented transfers completed.
    pub reassembled: u64,
    /// Reassembly groups restarted or abandoned.
    pub restarts: u64,
    /// Diagnostics raised.
    pub diagnostics: u64,
    /// Conversations created (cut-overs included).
    pub conversations: u64,
    /// IdentResponse cut-overs.
    pub cut_overs: u64,
}

/// Passive POWERLINK SDO decoder over a captured frame sequence.
pub struct Decoder {
    config: DecoderConfig,
    machine: SequenceStateMachine,
    dictionaries: ArcSwap<DictionarySet>,
    registry: ConversationRegistry,
    scratch: ScratchStore,
    sink: Arc<dyn DiagnosticsSink>,
    stats: Mutex<DecoderStats>,
}

impl Decoder {
    /// Create a decoder with no dictionaries, reporting to [`LogSink`].
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            machine: SequenceStateMachine::new(config.duplicate_window),
            config,
            dictionaries: ArcSwap::from_pointee(DictionarySet::new()),
            registry: ConversationRegistry::new(),
            scratch: ScratchStore::new(),
            sink: Arc::new(LogSink),
            stats: Mutex::new(DecoderStats::default()),
        }
    }

    pub fn with_dictionaries(self, dictionaries: DictionarySet) -> Self {
        self.dictionaries.store(Arc::new(dictionaries));
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConversationRegistry {
        &self.registry
    }

    pub fn scratch(&self) -> &ScratchStore {
        &self.scratch
    }

    pub fn dictionaries(&self) -> Arc<DictionarySet> {
        self.dictionaries.load_full()
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats.lock().clone()
    }

    /// Replace the dictionary set.
    ///
    /// Everything derived from the old set is stale, so this is a
    /// capture-wide reset.
    pub fn reload_dictionaries(&self, dictionaries: DictionarySet) {
        log::info!("[decoder] reloading {} dictionaries", dictionaries.len());
        self.dictionaries.store(Arc::new(dictionaries));
        self.reset();
    }

    /// Forget all conversations, pinned values and statistics.
    pub fn reset(&self) {
        self.registry.reset();
        self.scratch.clear();
        *self.stats.lock() = DecoderStats::default();
    }

    /// Decode frames in order.
    pub fn decode_all<'a, I>(&self, frames: I) -> Vec<Arc<FrameReport>>
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        frames.into_iter().map(|f| self.decode(f)).collect()
    }

    /// Decode one frame, or return its cached report.
    pub fn decode(&self, frame: &Frame) -> Arc<FrameReport> {
        if let Some(cached) = self.scratch.report(frame.number) {
            return cached;
        }

        let mut report = FrameReport::new(frame.number);
        let mut stats = FrameStats::default();
        self.classify(frame, &mut report, &mut stats);

        for diagnostic in &report.diagnostics {
            self.sink.report(diagnostic);
        }
        self.record_stats(&report, stats);

        let report = Arc::new(report);
        self.scratch.insert(
            frame.number,
            ScratchKey::Report,
            ScratchValue::Report(Arc::clone(&report)),
        );
        report
    }

    fn classify(&self, frame: &Frame, report: &mut FrameReport, stats: &mut FrameStats) {
        let (Some(message_type), Some(dest), Some(src)) =
            (frame.message_type(), frame.dest(), frame.src())
        else {
            log::trace!("[decoder] frame {}: too short, ignored", frame.number);
            return;
        };
        report.message_type = Some(message_type);
        report.src = src;
        report.dest = dest;

        let direction = match message_type {
            MessageType::Unknown(_) => return,
            MessageType::Preq => Some(PdoDirection::Receive),
            MessageType::Pres => Some(PdoDirection::Transmit),
            _ => None,
        };

        if frame.is_truncated() {
            report.diagnostics.push(Diagnostic::new(
                frame.number,
                DiagnosticKind::CaptureTruncated {
                    reported: frame.reported_len,
                    captured: frame.data.len(),
                },
            ));
        }

        let key = conversation_key(src, dest);
        report.conversation = Some(key);
        if self
            .registry
            .touch(key, frame.number, || self.new_conversation(key, frame.number))
        {
            stats.conversations += 1;
        }

        if let Some(direction) = direction {
            let show_meta = self.config.show_pdo_meta_info;
            self.registry.inspect(key, frame.number, |convo| {
                decode_pdo(
                    convo.timeline(direction),
                    frame.number,
                    &frame.data,
                    show_meta,
                    &mut report.fields,
                    &mut report.diagnostics,
                )
            });
            return;
        }

        match message_type {
            MessageType::Asnd => self.decode_async(frame, key, ASND_SERVICE_OFFSET, report, stats),
            MessageType::Ainv => self.decode_async(frame, key, AINV_SERVICE_OFFSET, report, stats),
            _ => {}
        }
    }

    fn decode_async(
        &self,
        frame: &Frame,
        key: u8,
        service_offset: usize,
        report: &mut FrameReport,
        stats: &mut FrameStats,
    ) {
        let Some(&service) = frame.data.get(service_offset) else {
            return;
        };
        let service = ServiceId::from_u8(service);
        report.service = Some(service);
        let payload = service_offset + 1;

        match service {
            ServiceId::IdentResponse => self.ident_response(frame, key, payload, report, stats),
            ServiceId::Sdo => {
                let Some(sdo) = frame.data.get(payload..) else {
                    return;
                };
                let ctx = SdoContext {
                    frame: frame.number,
                    src: report.src,
                    dest: report.dest,
                    machine: &self.machine,
                    scratch: &self.scratch,
                    config: &self.config,
                };
                stats.sdo = true;
                if let Some(restarts) = self
                    .registry
                    .with_active(key, frame.number, |convo| decode_sdo(&ctx, convo, sdo, report))
                {
                    stats.restarts += restarts;
                }
            }
            _ => {}
        }
    }

    /// The node (re)booted: cut the conversation over and bind the
    /// profile matching the announced identity.
    fn ident_response(
        &self,
        frame: &Frame,
        key: u8,
        payload: usize,
        report: &mut FrameReport,
        stats: &mut FrameStats,
    ) {
        let number = frame.number;
        if self
            .registry
            .cut_over(key, number, || self.new_conversation(key, number))
        {
            stats.cut_overs += 1;
            stats.conversations += 1;
        }

        let data = &frame.data;
        let (Some(device_type), Some(vendor_id), Some(product_code)) = (
            le_u16(data, payload + IDENT_DEVICE_TYPE),
            le_u32(data, payload + IDENT_VENDOR_ID),
            le_u32(data, payload + IDENT_PRODUCT_CODE),
        ) else {
            return;
        };
        let identity = DeviceIdentity {
            device_type,
            vendor_id,
            product_code,
        };
        report.identity = Some(identity);

        let dictionaries = self.dictionaries.load();
        let seed = self.config.read_profile_mappings;
        self.registry.with_active(key, number, |convo| {
            convo.identity = identity;
            if convo.profiles.is_node_bound() {
                return;
            }
            if let Some(profile) = dictionaries.for_device(identity) {
                convo.bind_profile(profile, seed);
            }
        });
    }

    fn new_conversation(&self, key: u8, frame: u32) -> Conversation {
        let mut convo = Conversation::new(key, frame);
        let dictionaries = self.dictionaries.load();
        if let Some(profile) = dictionaries.for_node(key) {
            convo.bind_profile(profile, self.config.read_profile_mappings);
        }
        convo.profiles.managing = dictionaries.for_node(MN_NODE_ID);
        convo
    }

    fn record_stats(&self, report: &FrameReport, frame: FrameStats) {
        let mut stats = self.stats.lock();
        stats.frames += 1;
        stats.sdo_frames += u64::from(frame.sdo);
        stats.duplicates += u64::from(report.is_duplicate());
        stats.reassembled += u64::from(report.reassembled.is_some());
        stats.restarts += frame.restarts;
        stats.diagnostics += report.diagnostics.len() as u64;
        stats.conversations += frame.conversations;
        stats.cut_overs += frame.cut_overs;
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("config", &self.config)
            .field("conversations", &self.registry.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Counters gathered while decoding one frame.
#[derive(Debug, Default)]
struct FrameStats {
    sdo: bool,
    restarts: u64,
    conversations: u64,
    cut_overs: u64,
}
