//! Streaming compaction of change-notification bursts.
//!
//! An [`EventCompactor`] buffers envelopes in push order. [`flush`] scans the
//! buffer once, left to right, and collapses each maximal run of adjacent,
//! same-path Modify notifications into a single envelope that carries the
//! run's first identity and the run's last data snapshot.
//!
//! Flush is lossy for non-repeated events: envelopes that never form a run
//! of at least two are dropped, not passed through. Callers that need every
//! event must tap the stream before compaction.
//!
//! The compactor is single-owner state. `push` and `flush` take `&mut self`
//! and there is no interior locking; concurrent producers should funnel
//! envelopes through a channel to the one task owning the compactor, which
//! is how the publisher runtime drives it.
//!
//! [`flush`]: EventCompactor::flush

use crate::envelope::ChangeEnvelope;
use crate::matching::{ElementPath, MatchPolicy};

/// Scan state while following a candidate run.
///
/// Lives only inside one `flush` call and is threaded through the scan, so
/// every flush starts from a clean slate.
#[derive(Debug, Clone, PartialEq)]
enum TraceState {
    /// No active run
    Idle,
    /// Tracking a modify-burst at the contained path
    StructuralChangeRun { current_path: ElementPath },
}

/// Buffering compactor for change envelopes.
#[derive(Debug, Default)]
pub struct EventCompactor {
    buffer: Vec<ChangeEnvelope>,
    policy: MatchPolicy,
}

impl EventCompactor {
    /// Create a compactor using the given comparison policy.
    #[must_use]
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            buffer: Vec::new(),
            policy,
        }
    }

    /// The comparison policy in effect.
    #[must_use]
    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Number of buffered envelopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append an envelope to the buffer.
    pub fn push(&mut self, envelope: ChangeEnvelope) {
        self.buffer.push(envelope);
    }

    /// Pairwise compactness test.
    ///
    /// True iff both envelopes are well-formed, their source, semantic
    /// classifier, and observable identities match under the policy, each is
    /// exactly one single-Modify structural change, and the two change paths
    /// match. Anything else (multiple payloads, multiple changes,
    /// Create/Update/Delete reasons, mismatched identity) is not compactable.
    #[must_use]
    pub fn compatible(&self, a: &ChangeEnvelope, b: &ChangeEnvelope) -> bool {
        if !a.is_well_formed() || !b.is_well_formed() {
            return false;
        }
        if !self.policy.paths_match(&a.source, &b.source)
            || !self.policy.paths_match(&a.source_semantics, &b.source_semantics)
            || !self.policy.paths_match(&a.observable, &b.observable)
        {
            return false;
        }
        match (a.single_modify_change(), b.single_modify_change()) {
            (Some(change_a), Some(change_b)) => {
                self.policy.paths_match(&change_a.path, &change_b.path)
            }
            _ => false,
        }
    }

    /// Drain the buffer and return the compacted sequence.
    ///
    /// With fewer than two buffered envelopes this is a degenerate no-op: the
    /// result is empty and the buffer is left untouched. Otherwise the buffer
    /// is cleared unconditionally, envelopes are processed strictly in push
    /// order, and one merged envelope is emitted per detected multi-event
    /// run. Runs broken after a single element, and envelopes that never
    /// joined a run, are discarded.
    pub fn flush(&mut self) -> Vec<ChangeEnvelope> {
        if self.buffer.len() < 2 {
            return Vec::new();
        }

        let buffer = std::mem::take(&mut self.buffer);
        let mut compacted = Vec::new();
        let mut run: Option<(usize, TraceState)> = None;

        for (i, envelope) in buffer.iter().enumerate() {
            run = match run {
                Some((start, state)) => {
                    // Identity matching is against the run's first member;
                    // the trace state follows the path chain.
                    let followed = if self.compatible(&buffer[start], envelope) {
                        self.follow_trace_state(state, envelope)
                    } else {
                        TraceState::Idle
                    };
                    match followed {
                        TraceState::Idle => {
                            if i - start >= 2 {
                                compacted.push(Self::join_run(&buffer[start], &buffer[i - 1]));
                            }
                            // The breaking envelope may seed the next run
                            self.open_run(i, envelope)
                        }
                        state => Some((start, state)),
                    }
                }
                None => self.open_run(i, envelope),
            };
        }

        if let Some((start, _)) = run {
            if buffer.len() - start >= 2 {
                compacted.push(Self::join_run(&buffer[start], &buffer[buffer.len() - 1]));
            }
        }

        tracing::debug!(
            buffered = buffer.len(),
            emitted = compacted.len(),
            "Flushed compactor"
        );

        compacted
    }

    /// Advance the trace state with the next envelope.
    ///
    /// A well-formed single-Modify envelope opens a run from `Idle`, or
    /// extends a run whose tracked path matches the incoming change's path,
    /// refreshing the tracked path. Anything else breaks the run.
    fn follow_trace_state(&self, state: TraceState, envelope: &ChangeEnvelope) -> TraceState {
        if !envelope.is_well_formed() {
            return TraceState::Idle;
        }
        let Some(change) = envelope.single_modify_change() else {
            return TraceState::Idle;
        };

        match state {
            TraceState::Idle => TraceState::StructuralChangeRun {
                current_path: change.trace_path(),
            },
            TraceState::StructuralChangeRun { current_path }
                if self.policy.paths_match(&current_path, &change.path) =>
            {
                TraceState::StructuralChangeRun {
                    current_path: change.trace_path(),
                }
            }
            TraceState::StructuralChangeRun { .. } => TraceState::Idle,
        }
    }

    fn open_run(&self, at: usize, envelope: &ChangeEnvelope) -> Option<(usize, TraceState)> {
        match self.follow_trace_state(TraceState::Idle, envelope) {
            TraceState::Idle => None,
            state => Some((at, state)),
        }
    }

    /// Merge a run: the first member's metadata with the last member's data.
    fn join_run(first: &ChangeEnvelope, last: &ChangeEnvelope) -> ChangeEnvelope {
        let mut joined = first.clone();
        if let (Some(target), Some(latest)) = (
            joined.single_modify_change_mut(),
            last.single_modify_change(),
        ) {
            target.data = latest.data.clone();
        }
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{ChangeReason, PayloadItem, StructuralChange};
    use crate::matching::PathKey;

    fn identity(value: &str) -> ElementPath {
        ElementPath::from_keys(vec![PathKey::new("Submodel", value)])
    }

    fn envelope(source: &str, reason: ChangeReason, path: &str, data: serde_json::Value) -> ChangeEnvelope {
        ChangeEnvelope::new(
            identity(source),
            identity("urn:example:semantics"),
            identity("urn:example:sm:observed"),
        )
        .with_payload(PayloadItem::StructuralChange(vec![StructuralChange::new(
            reason,
            ElementPath::from_short_path(path),
            data,
        )]))
    }

    fn modify(path: &str, data: &str) -> ChangeEnvelope {
        envelope(
            "urn:example:src",
            ChangeReason::Modify,
            path,
            serde_json::json!(data),
        )
    }

    #[test]
    fn push_appends_in_order() {
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);

        compactor.push(modify("a.b", "1"));
        compactor.push(modify("a.b", "2"));
        compactor.push(modify("c", "3"));

        assert_eq!(compactor.len(), 3);
    }

    #[test]
    fn flush_below_two_keeps_buffer() {
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);
        compactor.push(modify("a.b", "1"));

        assert!(compactor.flush().is_empty());
        assert_eq!(compactor.len(), 1);
    }

    #[test]
    fn flush_clears_buffer() {
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);
        compactor.push(modify("a.b", "1"));
        compactor.push(envelope("urn:example:src", ChangeReason::Create, "c", serde_json::Value::Null));

        let _ = compactor.flush();
        assert!(compactor.is_empty());
    }

    #[test]
    fn burst_collapses_to_last_value() {
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);
        compactor.push(modify("a.b", "1"));
        compactor.push(modify("a.b", "2"));
        compactor.push(modify("a.b", "3"));

        let result = compactor.flush();
        assert_eq!(result.len(), 1);

        let change = result[0].single_modify_change().unwrap();
        assert_eq!(change.path.to_short_path(), "a.b");
        assert_eq!(change.data, serde_json::json!("3"));
    }

    #[test]
    fn merged_envelope_carries_first_metadata() {
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);

        // First member carries a versioned key; relaxed matching merges it
        // with the unqualified follow-ups.
        let mut first = modify("a.b", "1");
        first.source = ElementPath::from_keys(vec![PathKey::with_qualifier(
            "Submodel",
            "urn:example:src",
            "1.0",
        )]);
        let first_stamp = first.timestamp;

        compactor.push(first);
        compactor.push(modify("a.b", "2"));

        let result = compactor.flush();
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].source.keys[0].qualifier.as_deref(),
            Some("1.0")
        );
        assert_eq!(result[0].timestamp, first_stamp);
        assert_eq!(
            result[0].single_modify_change().unwrap().data,
            serde_json::json!("2")
        );
    }

    #[test]
    fn heterogeneous_pair_is_dropped() {
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);
        compactor.push(envelope("urn:example:src", ChangeReason::Create, "x", serde_json::Value::Null));
        compactor.push(envelope("urn:example:src", ChangeReason::Delete, "x", serde_json::Value::Null));

        assert!(compactor.flush().is_empty());
        assert!(compactor.is_empty());
    }

    #[test]
    fn interrupted_run_is_dropped() {
        // Modify /x, Create /y, Modify /x: no adjacency, nothing survives
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);
        compactor.push(modify("x", "v1"));
        compactor.push(envelope("urn:example:src", ChangeReason::Create, "y", serde_json::Value::Null));
        compactor.push(modify("x", "v2"));

        assert!(compactor.flush().is_empty());
    }

    #[test]
    fn back_to_back_runs_both_emit() {
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);
        compactor.push(modify("a", "a1"));
        compactor.push(modify("a", "a2"));
        compactor.push(modify("b", "b1"));
        compactor.push(modify("b", "b2"));
        compactor.push(modify("b", "b3"));

        let result = compactor.flush();
        assert_eq!(result.len(), 2);

        let first = result[0].single_modify_change().unwrap();
        assert_eq!(first.path.to_short_path(), "a");
        assert_eq!(first.data, serde_json::json!("a2"));

        let second = result[1].single_modify_change().unwrap();
        assert_eq!(second.path.to_short_path(), "b");
        assert_eq!(second.data, serde_json::json!("b3"));
    }

    #[test]
    fn different_sources_never_merge() {
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);
        compactor.push(modify("a.b", "1"));
        compactor.push(envelope(
            "urn:example:other",
            ChangeReason::Modify,
            "a.b",
            serde_json::json!("2"),
        ));

        assert!(compactor.flush().is_empty());
    }

    #[test]
    fn exact_policy_respects_qualifiers() {
        let qualified = |data: &str| {
            let mut env = modify("a", data);
            if let Some(change) = env.single_modify_change_mut() {
                change.path = ElementPath::from_keys(vec![PathKey::with_qualifier(
                    "Element", "a", "2.0",
                )]);
            }
            env
        };

        let mut relaxed = EventCompactor::new(MatchPolicy::Relaxed);
        relaxed.push(qualified("1"));
        relaxed.push(modify("a", "2"));
        assert_eq!(relaxed.flush().len(), 1);

        let mut exact = EventCompactor::new(MatchPolicy::Exact);
        exact.push(qualified("1"));
        exact.push(modify("a", "2"));
        assert!(exact.flush().is_empty());
    }

    #[test]
    fn malformed_envelope_never_compacts() {
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);

        let mut broken = modify("a.b", "1");
        broken.source = ElementPath::root();

        compactor.push(broken);
        compactor.push(modify("a.b", "2"));

        assert!(compactor.flush().is_empty());
    }

    #[test]
    fn multi_change_payload_is_not_compactable() {
        let multi = ChangeEnvelope::new(
            identity("urn:example:src"),
            identity("urn:example:semantics"),
            identity("urn:example:sm:observed"),
        )
        .with_payload(PayloadItem::StructuralChange(vec![
            StructuralChange::new(
                ChangeReason::Modify,
                ElementPath::from_short_path("a"),
                serde_json::json!("1"),
            ),
            StructuralChange::new(
                ChangeReason::Modify,
                ElementPath::from_short_path("a"),
                serde_json::json!("2"),
            ),
        ]));

        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);
        compactor.push(multi);
        compactor.push(modify("a", "3"));

        assert!(compactor.flush().is_empty());
    }

    #[test]
    fn long_tail_after_run_reseeds() {
        // Run at /a, then a lone modify at /b: the run emits, the tail drops
        let mut compactor = EventCompactor::new(MatchPolicy::Relaxed);
        compactor.push(modify("a", "1"));
        compactor.push(modify("a", "2"));
        compactor.push(modify("b", "solo"));

        let result = compactor.flush();
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].single_modify_change().unwrap().path.to_short_path(),
            "a"
        );
    }
}
