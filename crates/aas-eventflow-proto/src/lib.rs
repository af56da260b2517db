//! # AAS EventFlow Protocol
//!
//! Wire messages and MQTT topic scheme for publishing compacted change
//! batches downstream.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod messages;
pub mod topics;

pub use messages::{ChangeBatch, MessageError, PublisherHello};
pub use topics::TopicScheme;
