// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-node decode state and its registry.
//!
//! A conversation is keyed by the controlled node taking part in a frame
//! and owns all order-dependent state for that node: duplicate cache,
//! reassembly tables, read ring and PDO mapping timelines.
//!
//! ```text
//! key 7:  [frames 1..=340] --cut-over--> [frames 341..]
//!          history, immutable           active
//! ```
//!
//! An IdentResponse means the node (re)booted: the active conversation
//! is closed at the last frame it was seen on and a fresh one starts at
//! the current frame. Older conversations stay queryable.

use std::sync::Arc;

use dashmap::DashMap;

use crate::dictionary::{DeviceIdentity, ObjectDictionary};
use crate::frame::MN_NODE_ID;
use crate::mapping::{MappingTimeline, ObjectAddress, PdoDirection, UNBOUNDED};
use crate::sdo::{
    DuplicateCache, FragmentReassembler, ReadRequest, ReadRequestCorrelator, TransferDirection,
};

/// Dictionaries bound to the two ends of a conversation.
#[derive(Debug, Clone, Default)]
pub struct BoundProfiles {
    /// Profile of the controlled node.
    pub controlled: Option<Arc<ObjectDictionary>>,
    /// Profile of the managing node.
    pub managing: Option<Arc<ObjectDictionary>>,
}

impl BoundProfiles {
    /// Profile of the node serving requests, by its node id.
    pub fn for_server(&self, server: u8) -> Option<Arc<ObjectDictionary>> {
        if server == MN_NODE_ID {
            self.managing.clone()
        } else {
            self.controlled.clone()
        }
    }

    /// Controlled node profile bound explicitly by node id.
    pub fn is_node_bound(&self) -> bool {
        self.controlled.as_ref().is_some_and(|p| p.node_id().is_some())
    }
}

/// Decode state of one controlled node over a frame range.
#[derive(Debug, Clone)]
pub struct Conversation {
    key: u8,
    first_frame: u32,
    last_frame: u32,
    last_seen: u32,
    previous_seen: Option<u32>,
    /// Raw send-sequence byte of the latest SDO frame.
    pub seq_send: u8,
    pub correlator: ReadRequestCorrelator,
    pub duplicates: DuplicateCache,
    pub download: FragmentReassembler,
    pub upload: FragmentReassembler,
    pub rpdo: MappingTimeline,
    pub tpdo: MappingTimeline,
    pub profiles: BoundProfiles,
    pub identity: DeviceIdentity,
    /// Object addressed by the segmented download in progress.
    pub download_target: Option<ObjectAddress>,
    /// Request answered by the segmented upload in progress.
    pub upload_request: Option<ReadRequest>,
}

impl Conversation {
    pub fn new(key: u8, first_frame: u32) -> Self {
        Self {
            key,
            first_frame,
            last_frame: UNBOUNDED,
            last_seen: first_frame,
            previous_seen: None,
            seq_send: 0,
            correlator: ReadRequestCorrelator::new(),
            duplicates: DuplicateCache::new(),
            download: FragmentReassembler::new(TransferDirection::Download),
            upload: FragmentReassembler::new(TransferDirection::Upload),
            rpdo: MappingTimeline::new(),
            tpdo: MappingTimeline::new(),
            profiles: BoundProfiles::default(),
            identity: DeviceIdentity::default(),
            download_target: None,
            upload_request: None,
        }
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn first_frame(&self) -> u32 {
        self.first_frame
    }

    /// Last frame covered (inclusive); `UNBOUNDED` while active.
    pub fn last_frame(&self) -> u32 {
        self.last_frame
    }

    pub fn is_active(&self) -> bool {
        self.last_frame == UNBOUNDED
    }

    pub fn covers(&self, frame: u32) -> bool {
        self.first_frame <= frame && frame <= self.last_frame
    }

    /// Frame seen before the current one, `None` on the first frame.
    pub fn previous_seen(&self) -> Option<u32> {
        self.previous_seen
    }

    fn touch(&mut self, frame: u32) {
        if frame > self.last_seen {
            self.previous_seen = Some(self.last_seen);
            self.last_seen = frame;
        }
    }

    pub fn timeline(&self, direction: PdoDirection) -> &MappingTimeline {
        match direction {
            PdoDirection::Receive => &self.rpdo,
            PdoDirection::Transmit => &self.tpdo,
        }
    }

    pub fn timeline_mut(&mut self, direction: PdoDirection) -> &mut MappingTimeline {
        match direction {
            PdoDirection::Receive => &mut self.rpdo,
            PdoDirection::Transmit => &mut self.tpdo,
        }
    }

    /// Bind the controlled node profile.
    ///
    /// With `seed`, empty timelines are filled from the profile's
    /// preloaded mappings.
    pub fn bind_profile(&mut self, profile: Arc<ObjectDictionary>, seed: bool) {
        if seed {
            if self.rpdo.is_empty() {
                self.rpdo.extend_from(profile.mappings(PdoDirection::Receive));
            }
            if self.tpdo.is_empty() {
                self.tpdo.extend_from(profile.mappings(PdoDirection::Transmit));
            }
        }
        log::debug!(
            "[registry] node {} bound to profile {:?}",
            self.key,
            profile.name()
        );
        self.profiles.controlled = Some(profile);
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Conversations per key, oldest first.
#[derive(Debug, Default)]
pub struct ConversationRegistry {
    by_key: DashMap<u8, Vec<Conversation>>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `frame` references `key`, creating the conversation if
    /// none covers the frame. Returns `true` if one was created.
    pub fn touch<F>(&self, key: u8, frame: u32, create: F) -> bool
    where
        F: FnOnce() -> Conversation,
    {
        let mut list = self.by_key.entry(key).or_default();
        if let Some(convo) = list.iter_mut().rev().find(|c| c.covers(frame)) {
            convo.touch(frame);
            return false;
        }
        list.push(create());
        log::debug!("[registry] new conversation for node {} at frame {}", key, frame);
        true
    }

    /// Close the conversation covering `frame` at its previously seen
    /// frame and start a fresh one at `frame`.
    ///
    /// Does nothing (returns `false`) when the conversation has not seen
    /// an earlier frame.
    pub fn cut_over<F>(&self, key: u8, frame: u32, create: F) -> bool
    where
        F: FnOnce() -> Conversation,
    {
        let Some(mut list) = self.by_key.get_mut(&key) else {
            return false;
        };
        let Some(convo) = list.iter_mut().rev().find(|c| c.covers(frame)) else {
            return false;
        };
        let Some(previous) = convo.previous_seen else {
            return false;
        };

        convo.last_frame = previous;
        log::debug!(
            "[registry] node {}: conversation {}..={} closed, cut over at frame {}",
            key,
            convo.first_frame,
            previous,
            frame
        );
        list.push(create());
        true
    }

    /// Run `f` on the conversation covering `frame`.
    pub fn with_active<R, F>(&self, key: u8, frame: u32, f: F) -> Option<R>
    where
        F: FnOnce(&mut Conversation) -> R,
    {
        let mut list = self.by_key.get_mut(&key)?;
        let convo = list.iter_mut().rev().find(|c| c.covers(frame))?;
        Some(f(convo))
    }

    /// Read-only access to the conversation covering `frame`.
    pub fn inspect<R, F>(&self, key: u8, frame: u32, f: F) -> Option<R>
    where
        F: FnOnce(&Conversation) -> R,
    {
        let list = self.by_key.get(&key)?;
        let convo = list.iter().rev().find(|c| c.covers(frame))?;
        Some(f(convo))
    }

    /// Frame ranges of every conversation of `key`, oldest first.
    pub fn history(&self, key: u8) -> Vec<(u32, u32)> {
        self.by_key
            .get(&key)
            .map(|list| list.iter().map(|c| (c.first_frame, c.last_frame)).collect())
            .unwrap_or_default()
    }

    /// Total number of conversations, closed ones included.
    pub fn len(&self) -> usize {
        self.by_key.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every conversation.
    pub fn reset(&self) {
        self.by_key.clear();
    }
}
