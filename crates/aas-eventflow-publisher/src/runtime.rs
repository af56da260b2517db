//! Publisher runtime orchestration.
//!
//! Realizes the single-consumer ownership model for the compactor: any
//! number of producers push envelopes through an [`EnvelopeSender`], and one
//! [`Publisher`] task exclusively owns the [`EventCompactor`], flushing it on
//! a fixed cadence and publishing the compacted batches per observable root.

use crate::config::PublisherConfig;
use crate::transport::MqttTransport;
use aas_eventflow_core::{ChangeEnvelope, ElementPath, EventCompactor};
use aas_eventflow_proto::{ChangeBatch, PublisherHello, TopicScheme};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Cloneable producer handle feeding the publisher's channel.
#[derive(Debug, Clone)]
pub struct EnvelopeSender {
    tx: mpsc::Sender<ChangeEnvelope>,
}

impl EnvelopeSender {
    /// Queue an envelope, waiting for channel capacity.
    ///
    /// # Errors
    ///
    /// Returns error if the publisher has stopped.
    pub async fn record(&self, envelope: ChangeEnvelope) -> Result<(), RecordError> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| RecordError::Closed)
    }

    /// Queue an envelope without waiting.
    ///
    /// # Errors
    ///
    /// Returns error if the channel is full or the publisher has stopped.
    pub fn try_record(&self, envelope: ChangeEnvelope) -> Result<(), RecordError> {
        self.tx.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RecordError::Full,
            mpsc::error::TrySendError::Closed(_) => RecordError::Closed,
        })
    }
}

/// Errors when handing an envelope to the publisher.
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum RecordError {
    /// The publisher task has stopped
    #[error("publisher stopped")]
    Closed,
    /// The producer channel is at capacity
    #[error("producer channel full")]
    Full,
}

/// The publishing task: owns the compactor and the receiving end of the
/// producer channel.
pub struct Publisher {
    config: PublisherConfig,
    publisher_id: Uuid,
    rx: mpsc::Receiver<ChangeEnvelope>,
    compactor: EventCompactor,
}

impl Publisher {
    /// Create a publisher and its producer handle.
    #[must_use]
    pub fn new(config: PublisherConfig) -> (Self, EnvelopeSender) {
        let publisher_id = config.publisher_id.unwrap_or_else(Uuid::new_v4);
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let compactor = EventCompactor::new(config.policy);

        (
            Self {
                config,
                publisher_id,
                rx,
                compactor,
            },
            EnvelopeSender { tx },
        )
    }

    /// This publisher's identity.
    #[must_use]
    pub fn publisher_id(&self) -> Uuid {
        self.publisher_id
    }

    /// Run the publisher's main loop until shutdown.
    ///
    /// The loop absorbs incoming envelopes, flushes the compactor on every
    /// interval tick, and publishes one batch per observable root. It stops
    /// on Ctrl+C or when every producer handle has been dropped, flushing a
    /// final time on the way out.
    ///
    /// # Errors
    ///
    /// Returns error if the MQTT transport cannot be created.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            publisher_id,
            mut rx,
            mut compactor,
        } = self;

        tracing::info!("Starting publisher runtime");

        let scheme = TopicScheme::new(&config.tenant);
        let client_id = format!("aas-eventflow-{publisher_id}");
        let (transport, mut eventloop) =
            MqttTransport::connect(&config.mqtt_broker, &client_id, scheme)
                .context("Failed to create MQTT transport")?;

        // rumqttc needs its event loop driven even for a publish-only client
        tokio::spawn(async move {
            loop {
                if let Err(e) = eventloop.poll().await {
                    tracing::error!(error = %e, "MQTT error");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        });

        let mut ticker = tokio::time::interval(config.flush_interval);
        let mut sequence = 0u64;
        let mut announced = HashSet::new();

        tracing::info!("Publisher running, press Ctrl+C to stop");

        loop {
            tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(envelope) => compactor.push(envelope),
                    None => {
                        tracing::info!("All producers dropped");
                        break;
                    }
                },

                _ = ticker.tick() => {
                    drain_pending(&mut rx, &mut compactor);
                    sequence = publish_flush(
                        &transport,
                        &mut compactor,
                        publisher_id,
                        sequence,
                        &mut announced,
                    )
                    .await;
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Final flush so a clean shutdown does not strand a pending burst
        drain_pending(&mut rx, &mut compactor);
        publish_flush(&transport, &mut compactor, publisher_id, sequence, &mut announced).await;

        tracing::info!("Publisher stopped");
        Ok(())
    }
}

/// Move every already-queued envelope into the compactor.
fn drain_pending(rx: &mut mpsc::Receiver<ChangeEnvelope>, compactor: &mut EventCompactor) -> usize {
    let mut drained = 0;
    while let Ok(envelope) = rx.try_recv() {
        compactor.push(envelope);
        drained += 1;
    }
    drained
}

struct ObservableGroup {
    hash: String,
    observable: ElementPath,
    envelopes: Vec<ChangeEnvelope>,
}

/// Split a flush result into per-observable groups, preserving order.
fn group_by_observable(envelopes: Vec<ChangeEnvelope>) -> Vec<ObservableGroup> {
    let mut groups: Vec<ObservableGroup> = Vec::new();
    for envelope in envelopes {
        let hash = envelope.observable.topic_hash();
        match groups.iter_mut().find(|g| g.hash == hash) {
            Some(group) => group.envelopes.push(envelope),
            None => {
                let observable = envelope.observable.clone();
                groups.push(ObservableGroup {
                    hash,
                    observable,
                    envelopes: vec![envelope],
                });
            }
        }
    }
    groups
}

/// Flush the compactor and publish one batch per observable root.
///
/// Returns the advanced sequence counter. Publish failures are logged and
/// skipped so one bad observable cannot stall the rest of the flush.
async fn publish_flush(
    transport: &MqttTransport,
    compactor: &mut EventCompactor,
    publisher_id: Uuid,
    mut sequence: u64,
    announced: &mut HashSet<String>,
) -> u64 {
    let compacted = compactor.flush();
    if compacted.is_empty() {
        return sequence;
    }

    for group in group_by_observable(compacted) {
        if announced.insert(group.hash.clone()) {
            let hello =
                PublisherHello::new(publisher_id, vec![group.observable.to_short_path()]);
            if let Err(err) = transport.announce(&group.hash, &hello).await {
                tracing::warn!(error = %err, "Failed to announce publisher");
            }
        }

        let batch = ChangeBatch::new(publisher_id, sequence, group.envelopes);
        if let Err(err) = transport.publish_batch(&group.hash, &batch).await {
            tracing::warn!(error = %err, hash = %group.hash, "Failed to publish batch");
        }
        sequence += 1;
    }

    sequence
}
