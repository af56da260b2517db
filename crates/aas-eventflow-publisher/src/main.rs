//! # AAS EventFlow Publisher
//!
//! Publishes compacted change notifications over MQTT.
//!
//! ## Architecture
//!
//! Three concurrent pieces:
//! 1. **Ingress**: reads change envelopes as newline-delimited JSON on stdin
//!    (the editor process pipes its raw notification stream here)
//! 2. **Compaction**: a single task owns the event compactor and flushes it
//!    on a fixed cadence
//! 3. **Publication**: compacted batches go out per observable root on the
//!    MQTT topic scheme

use aas_eventflow_core::ChangeEnvelope;
use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

mod config;
mod runtime;
mod transport;

pub use config::PublisherConfig;
pub use runtime::{EnvelopeSender, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting AAS EventFlow publisher"
    );

    // Load configuration
    let config = PublisherConfig::from_env()?;

    let (publisher, sender) = Publisher::new(config);
    tracing::info!(publisher_id = %publisher.publisher_id(), "Publisher initialized");

    tokio::spawn(read_stdin(sender));

    publisher.run().await?;

    Ok(())
}

/// Feed stdin lines into the publisher until EOF.
///
/// Dropping the sender on exit lets the publisher drain and stop once the
/// ingress is gone.
async fn read_stdin(sender: EnvelopeSender) {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ChangeEnvelope>(line) {
                    Ok(envelope) => {
                        if sender.record(envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Skipping malformed envelope");
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read stdin");
                break;
            }
        }
    }
}
