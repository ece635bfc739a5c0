// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sorted interval lookup table with batch-insert-then-lock semantics.
//!
//! Dictionary sub-entries usually come as long runs of near-identical
//! slots (`ManufacturerParam_04h` .. `ManufacturerParam_7Fh`). Inserting
//! them one key at a time and compacting equal neighbours on `lock()`
//! turns hundreds of entries into a handful of ranges.
//!
//! ```text
//! insert(4,A) insert(5,A) insert(6,A) insert(9,B) insert(10,B)
//!                          |
//!                        lock()
//!                          v
//!          [4..=6] -> A            [9..=10] -> B
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut idx = IntervalIndex::with_partial_eq();
//! idx.insert(1, "Param");
//! idx.insert(2, "Param");
//! idx.lock();
//! assert_eq!(idx.find(2)?, Some(&"Param"));
//! ```

/// Interval index error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexError {
    /// `find()` called while the index has unlocked insertions.
    PreconditionViolated,
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreconditionViolated => write!(f, "interval index queried before lock()"),
        }
    }
}

impl std::error::Error for IndexError {}

/// One closed interval `[low, high]` and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval<T> {
    low: u32,
    high: u32,
    value: T,
}

impl<T> Interval<T> {
    /// Lower bound (inclusive).
    pub fn low(&self) -> u32 {
        self.low
    }

    /// Upper bound (inclusive).
    pub fn high(&self) -> u32 {
        self.high
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn contains(&self, key: u32) -> bool {
        self.low <= key && key <= self.high
    }
}

/// Range-keyed lookup table.
///
/// Values are compared with a caller-supplied predicate when adjacent
/// intervals are compacted.
#[derive(Clone)]
pub struct IntervalIndex<T> {
    entries: Vec<Interval<T>>,
    locked: bool,
    equal: fn(&T, &T) -> bool,
}

impl<T> IntervalIndex<T> {
    /// Create an empty index using `equal` for run compaction.
    pub fn new(equal: fn(&T, &T) -> bool) -> Self {
        Self {
            entries: Vec::new(),
            // An empty index has nothing to sort.
            locked: true,
            equal,
        }
    }

    /// Append a single-key interval `[key, key]`.
    ///
    /// O(1) amortized. Marks the index unlocked until the next `lock()`.
    pub fn insert(&mut self, key: u32, value: T) {
        self.entries.push(Interval {
            low: key,
            high: key,
            value,
        });
        self.locked = false;
    }

    /// Sort by lower bound and merge adjacent equal runs.
    ///
    /// Two neighbours merge when their bounds differ by at most one and
    /// the equality predicate holds; the survivor's upper bound grows.
    /// Locking an already locked index does nothing.
    pub fn lock(&mut self) {
        if self.locked {
            return;
        }

        // Stable sort: for duplicate keys the later insertion stays later.
        self.entries.sort_by_key(|e| e.low);

        let mut merged: Vec<Interval<T>> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if let Some(prev) = merged.last_mut() {
                if entry.low.abs_diff(prev.high) <= 1 && (self.equal)(&prev.value, &entry.value) {
                    prev.high = prev.high.max(entry.high);
                    continue;
                }
            }
            merged.push(entry);
        }

        self.entries = merged;
        self.locked = true;
    }

    /// Find the interval containing `key`.
    ///
    /// When several intervals contain `key` (duplicate keys with unequal
    /// values) the one inserted last wins.
    pub fn find_interval(&self, key: u32) -> Result<Option<&Interval<T>>, IndexError> {
        if !self.locked {
            return Err(IndexError::PreconditionViolated);
        }

        let pos = self.entries.partition_point(|e| e.low <= key);
        if pos == 0 {
            return Ok(None);
        }

        let candidate = &self.entries[pos - 1];
        if candidate.contains(key) {
            return Ok(Some(candidate));
        }

        // A wider interval starting earlier may still cover the key.
        Ok(self.entries[..pos - 1].iter().rev().find(|e| e.contains(key)))
    }

    /// Find the value whose interval contains `key`.
    pub fn find(&self, key: u32) -> Result<Option<&T>, IndexError> {
        Ok(self.find_interval(key)?.map(Interval::value))
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Number of stored intervals (after compaction, if locked).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval<T>> {
        self.entries.iter()
    }
}

impl<T: PartialEq> IntervalIndex<T> {
    /// Create an index that compacts runs with `PartialEq`.
    pub fn with_partial_eq() -> Self {
        Self::new(|a, b| a == b)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for IntervalIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalIndex")
            .field("entries", &self.entries)
            .field("locked", &self.locked)
            .finish()
    }
}
