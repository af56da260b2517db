//! MQTT transport for batch publication.

use aas_eventflow_proto::{ChangeBatch, PublisherHello, TopicScheme};
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use std::time::Duration;
use url::Url;

/// MQTT publisher for compacted change batches.
pub struct MqttTransport {
    client: AsyncClient,
    scheme: TopicScheme,
}

impl MqttTransport {
    /// Create a new transport.
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL is invalid.
    pub fn connect(
        broker: &str,
        client_id: &str,
        scheme: TopicScheme,
    ) -> Result<(Self, EventLoop), PublishError> {
        let (host, port) = parse_mqtt_url(broker)?;

        let mut mqtt_options = MqttOptions::new(client_id, host, port);
        mqtt_options.set_keep_alive(Duration::from_secs(30));

        let (client, eventloop) = AsyncClient::new(mqtt_options, 100);

        Ok((Self { client, scheme }, eventloop))
    }

    /// Announce this publisher for an observable.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or publish fails.
    pub async fn announce(
        &self,
        observable_hash: &str,
        hello: &PublisherHello,
    ) -> Result<(), PublishError> {
        let topic = self.scheme.hello(observable_hash);
        let payload = hello
            .to_cbor()
            .map_err(|e| PublishError::Serialize(e.to_string()))?;

        tracing::info!(topic, "Announcing publisher");

        self.client
            .publish(&topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| PublishError::Publish(e.to_string()))?;

        Ok(())
    }

    /// Publish a compacted batch for an observable.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or publish fails.
    pub async fn publish_batch(
        &self,
        observable_hash: &str,
        batch: &ChangeBatch,
    ) -> Result<(), PublishError> {
        let topic = self.scheme.changes(observable_hash);
        let payload = batch
            .to_cbor()
            .map_err(|e| PublishError::Serialize(e.to_string()))?;

        tracing::debug!(
            topic,
            sequence = batch.sequence,
            envelopes = batch.envelopes.len(),
            payload_len = payload.len(),
            "Publishing batch"
        );

        self.client
            .publish(&topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| PublishError::Publish(e.to_string()))?;

        Ok(())
    }
}

/// Parse MQTT URL into host and port.
fn parse_mqtt_url(input: &str) -> Result<(String, u16), PublishError> {
    if input.contains("://") {
        let url = Url::parse(input)
            .map_err(|e| PublishError::InvalidBrokerUrl(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(PublishError::InvalidBrokerUrl(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| PublishError::InvalidBrokerUrl(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(1883);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PublishError::InvalidBrokerUrl(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => 1883,
        Some(port) => port.parse().map_err(|_| {
            PublishError::InvalidBrokerUrl(format!("{input}: invalid port '{port}'"))
        })?,
    };
    if parts.next().is_some() {
        return Err(PublishError::InvalidBrokerUrl(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}

/// Errors for publication operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    /// Invalid MQTT broker URL
    #[error("invalid MQTT broker URL: {0}")]
    InvalidBrokerUrl(String),
    /// Publish failed
    #[error("publish error: {0}")]
    Publish(String),
    /// Serialization failed
    #[error("serialize error: {0}")]
    Serialize(String),
}
