//! Per-node mutation diaries and timestamp propagation.
//!
//! Every tracked node carries an optional [`Diary`]: an append-only log of
//! mutation entries plus a two-slot clock (`created`, `updated`). Recording a
//! mutation appends one entry at the mutated node and walks the parent chain,
//! stamping the chosen clock slot on every ancestor that also owns a diary.
//! The walk ends at the first diary-less node; diaries are expected to be
//! densely attached along a lineage, and a gap breaks propagation.

use crate::tree::{ElementRef, ElementTree};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which clock slot a recorded mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSlot {
    /// First creation of the node
    Created,
    /// Any subsequent mutation
    Updated,
}

/// One recorded mutation.
///
/// Opaque to this crate: the editor decides what goes into the payload,
/// diaries only append and count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Free-form description of the mutation
    pub payload: serde_json::Value,
}

impl DiaryEntry {
    /// Wrap an opaque payload into an entry.
    #[must_use]
    pub fn new(payload: serde_json::Value) -> Self {
        Self { payload }
    }
}

/// Append-only mutation log plus a two-slot clock.
///
/// The entry list is allocated lazily; a diary on an untouched node costs a
/// pair of `None`s. `created` is written at most once, `updated` on every
/// recorded mutation including the creating one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diary {
    entries: Option<Vec<DiaryEntry>>,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
}

impl Diary {
    /// Create an empty diary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, allocating the log on first use.
    pub fn append(&mut self, entry: DiaryEntry) {
        self.entries.get_or_insert_with(Vec::new).push(entry);
    }

    /// Entries in insertion order; empty slice if none were recorded.
    #[must_use]
    pub fn entries(&self) -> &[DiaryEntry] {
        self.entries.as_deref().unwrap_or(&[])
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }

    /// Creation timestamp, if a creating mutation was recorded.
    #[must_use]
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    /// Timestamp of the most recent mutation.
    #[must_use]
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// Write `at` into the chosen slot.
    ///
    /// `Created` sticks after its first write; every touch refreshes
    /// `Updated`, so a created node is also an updated node.
    pub fn touch(&mut self, slot: ClockSlot, at: DateTime<Utc>) {
        if slot == ClockSlot::Created && self.created.is_none() {
            self.created = Some(at);
        }
        self.updated = Some(at);
    }
}

/// Record a mutation against `node`, stamped with the current wall clock.
///
/// See [`record_mutation_at`] for the full semantics.
pub fn record_mutation(tree: &mut ElementTree, node: ElementRef, entry: DiaryEntry, is_create: bool) {
    record_mutation_at(tree, node, entry, is_create, Utc::now());
}

/// Record a mutation against `node` with an explicit timestamp.
///
/// Recording is opportunistic: an unknown handle or a node without a diary
/// makes this a silent no-op. Otherwise the entry is appended to the node's
/// own diary and the chosen clock slot (`Created` iff `is_create`) is
/// stamped on the node and on every ancestor up the parent chain, stopping
/// at the first node without a diary or at the root. Only the mutated node
/// receives the entry; ancestors get timestamps.
pub fn record_mutation_at(
    tree: &mut ElementTree,
    node: ElementRef,
    entry: DiaryEntry,
    is_create: bool,
    at: DateTime<Utc>,
) {
    if tree.diary(node).is_none() {
        return;
    }

    let slot = if is_create {
        ClockSlot::Created
    } else {
        ClockSlot::Updated
    };

    if let Some(diary) = tree.diary_mut(node) {
        diary.append(entry);
    }

    // The diary check runs before the write, so a diary-less node ends the
    // walk even when further ancestors above it carry diaries.
    let mut current = node;
    loop {
        match tree.diary_mut(current) {
            Some(diary) => diary.touch(slot, at),
            None => break,
        }
        match tree.parent(current) {
            Some(parent) => current = parent,
            None => break,
        }
    }

    tracing::debug!(node = node.index(), ?slot, "recorded mutation");
}
