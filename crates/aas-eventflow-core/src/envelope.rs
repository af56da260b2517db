//! Change-notification envelopes.
//!
//! A [`ChangeEnvelope`] is a self-describing snapshot of one observed change:
//! who emitted it, what kind of source it is, which root was observed, and
//! one or more payload records. Envelopes carry no references into the live
//! tree, so compaction and publication can run without holding tree locks.

use crate::matching::ElementPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a structural change happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeReason {
    /// A sub-node was created
    Create,
    /// A sub-node was replaced wholesale
    Update,
    /// A sub-node's content changed in place
    Modify,
    /// A sub-node was deleted
    Delete,
}

/// One structural change beneath the observed root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralChange {
    /// What happened
    pub reason: ChangeReason,
    /// Location of the changed sub-node relative to the observed root; the
    /// final key names the changed node itself
    pub path: ElementPath,
    /// Opaque serialized snapshot of the content at event time
    pub data: serde_json::Value,
}

impl StructuralChange {
    /// Create a structural change record.
    #[must_use]
    pub fn new(reason: ChangeReason, path: ElementPath, data: serde_json::Value) -> Self {
        Self { reason, path, data }
    }

    /// Path a compaction run tracks for this change. The chain ends in the
    /// key the change itself references, so following a run refreshes the
    /// tracked path with each incoming change's own chain.
    #[must_use]
    pub(crate) fn trace_path(&self) -> ElementPath {
        self.path.clone()
    }
}

/// A value-only refresh of an existing element.
///
/// Never compactable; carried so that the event surface covers the second
/// payload family the editor emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueUpdate {
    /// Location of the refreshed element
    pub path: ElementPath,
    /// The new value
    pub value: serde_json::Value,
}

/// Payload of an envelope.
///
/// A closed set: the compactor reasons exhaustively over these variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadItem {
    /// Structural changes at paths beneath the observed root
    StructuralChange(Vec<StructuralChange>),
    /// Value-only updates
    ValueUpdate(Vec<ValueUpdate>),
}

/// One observed-change message, decoupled from the live tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEnvelope {
    /// Identity of the emitting source
    pub source: ElementPath,
    /// Semantic classifier of the source
    pub source_semantics: ElementPath,
    /// Identity of the observed root
    pub observable: ElementPath,
    /// Change payloads in emission order
    pub payloads: Vec<PayloadItem>,
    /// Emission time
    pub timestamp: DateTime<Utc>,
}

impl ChangeEnvelope {
    /// Create an envelope with no payloads, stamped with the current time.
    #[must_use]
    pub fn new(source: ElementPath, source_semantics: ElementPath, observable: ElementPath) -> Self {
        Self {
            source,
            source_semantics,
            observable,
            payloads: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Builder-style payload attachment.
    #[must_use]
    pub fn with_payload(mut self, payload: PayloadItem) -> Self {
        self.payloads.push(payload);
        self
    }

    /// Append a payload.
    pub fn push_payload(&mut self, payload: PayloadItem) {
        self.payloads.push(payload);
    }

    /// An envelope missing its source or observable identity is never
    /// compactable.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.source.is_empty() && !self.observable.is_empty()
    }

    /// The single Modify structural change, if this envelope has exactly one
    /// payload holding exactly one change with reason [`ChangeReason::Modify`].
    /// Any other shape yields `None`.
    #[must_use]
    pub fn single_modify_change(&self) -> Option<&StructuralChange> {
        match self.payloads.as_slice() {
            [PayloadItem::StructuralChange(changes)] => match changes.as_slice() {
                [change] if change.reason == ChangeReason::Modify => Some(change),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn single_modify_change_mut(&mut self) -> Option<&mut StructuralChange> {
        match self.payloads.as_mut_slice() {
            [PayloadItem::StructuralChange(changes)] => match changes.as_mut_slice() {
                [change] if change.reason == ChangeReason::Modify => Some(change),
                _ => None,
            },
            _ => None,
        }
    }
}
