//! # AAS EventFlow Core
//!
//! Diary/timestamp model and change-event compaction for hierarchical
//! administration-shell documents.
//!
//! This crate provides:
//! - Per-node mutation diaries with Created/Updated clock propagation
//! - Self-describing change envelopes decoupled from the live tree
//! - A streaming compactor collapsing same-path modification bursts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compactor;
pub mod diary;
pub mod envelope;
pub mod matching;
pub mod tree;

pub use compactor::EventCompactor;
pub use diary::{record_mutation, record_mutation_at, ClockSlot, Diary, DiaryEntry};
pub use envelope::{ChangeEnvelope, ChangeReason, PayloadItem, StructuralChange, ValueUpdate};
pub use matching::{ElementPath, MatchPolicy, PathKey};
pub use tree::{ElementRef, ElementTree};
