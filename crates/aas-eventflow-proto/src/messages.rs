//! Protocol messages for compacted-change publication.

use aas_eventflow_core::ChangeEnvelope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Publisher discovery and capability advertisement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherHello {
    /// Unique publisher identifier
    pub publisher_id: Uuid,
    /// Observable roots this publisher covers (short-path form)
    pub observables: Vec<String>,
    /// Publisher version
    pub version: String,
}

impl PublisherHello {
    /// Create a new hello message.
    #[must_use]
    pub fn new(publisher_id: Uuid, observables: Vec<String>) -> Self {
        Self {
            publisher_id,
            observables,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, MessageError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| MessageError::Serialize(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, MessageError> {
        ciborium::from_reader(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
    }
}

/// One flush worth of compacted envelopes.
///
/// Batches carry a per-publisher sequence number so consumers can detect
/// gaps; envelopes inside a batch keep their push order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Publisher that produced the batch
    pub publisher_id: Uuid,
    /// Monotonic per-publisher batch counter
    pub sequence: u64,
    /// Compacted envelopes, in original push order
    pub envelopes: Vec<ChangeEnvelope>,
}

impl ChangeBatch {
    /// Create a new batch message.
    #[must_use]
    pub fn new(publisher_id: Uuid, sequence: u64, envelopes: Vec<ChangeEnvelope>) -> Self {
        Self {
            publisher_id,
            sequence,
            envelopes,
        }
    }

    /// Whether the batch carries no envelopes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, MessageError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| MessageError::Serialize(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, MessageError> {
        ciborium::from_reader(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
    }
}

/// Errors for message serialization/deserialization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),
    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),
}
