//! Handles into the host editor's element hierarchy.
//!
//! The hierarchy itself (typed submodel elements, their creation and
//! destruction) belongs to the surrounding editor. This module models only
//! what the notification core reads: a parent back-reference and an optional
//! per-node [`Diary`]. Back-references are arena indices rather than
//! pointers, so the tree owns its nodes without reference cycles.

use crate::diary::Diary;
use serde::{Deserialize, Serialize};

/// Index-style handle to a node in the element hierarchy.
///
/// Handles are only meaningful for the [`ElementTree`] that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(usize);

impl ElementRef {
    /// Raw arena index, for logging and diagnostics.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct ElementNode {
    parent: Option<ElementRef>,
    diary: Option<Diary>,
}

/// Arena of element nodes with parent back-references.
///
/// The editor populates the tree; the notification core only walks
/// `parent` links and reads diaries. Nodes are never removed here.
#[derive(Debug, Default)]
pub struct ElementTree {
    nodes: Vec<ElementNode>,
}

impl ElementTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node without a diary.
    pub fn insert(&mut self, parent: Option<ElementRef>) -> ElementRef {
        self.nodes.push(ElementNode {
            parent,
            diary: None,
        });
        ElementRef(self.nodes.len() - 1)
    }

    /// Add a node with a freshly attached diary.
    pub fn insert_with_diary(&mut self, parent: Option<ElementRef>) -> ElementRef {
        self.nodes.push(ElementNode {
            parent,
            diary: Some(Diary::new()),
        });
        ElementRef(self.nodes.len() - 1)
    }

    /// Attach a diary to an existing node. No-op if the node already has
    /// one or the handle is unknown.
    pub fn attach_diary(&mut self, node: ElementRef) {
        if let Some(entry) = self.nodes.get_mut(node.0) {
            if entry.diary.is_none() {
                entry.diary = Some(Diary::new());
            }
        }
    }

    /// Parent handle of a node, if any.
    #[must_use]
    pub fn parent(&self, node: ElementRef) -> Option<ElementRef> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    /// The node's diary, if one is attached.
    #[must_use]
    pub fn diary(&self, node: ElementRef) -> Option<&Diary> {
        self.nodes.get(node.0).and_then(|n| n.diary.as_ref())
    }

    /// Mutable access to the node's diary, if one is attached.
    pub fn diary_mut(&mut self, node: ElementRef) -> Option<&mut Diary> {
        self.nodes.get_mut(node.0).and_then(|n| n.diary.as_mut())
    }

    /// Whether the handle refers to a node of this tree.
    #[must_use]
    pub fn contains(&self, node: ElementRef) -> bool {
        node.0 < self.nodes.len()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
