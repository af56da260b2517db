//! Publisher configuration.

use aas_eventflow_core::MatchPolicy;
use anyhow::{Context, Result};
use std::time::Duration;
use uuid::Uuid;

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Publisher unique identifier
    pub publisher_id: Option<Uuid>,

    /// MQTT broker URL for batch publication
    pub mqtt_broker: String,

    /// Tenant identifier
    pub tenant: String,

    /// Comparison policy for compaction
    pub policy: MatchPolicy,

    /// Interval between compaction flushes
    pub flush_interval: Duration,

    /// Capacity of the producer channel
    pub channel_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            publisher_id: None,
            mqtt_broker: "tcp://localhost:1883".to_string(),
            tenant: "default".to_string(),
            policy: MatchPolicy::Relaxed,
            flush_interval: Duration::from_millis(1000),
            channel_capacity: 256,
        }
    }
}

impl PublisherConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EVENTFLOW_PUBLISHER_ID`: Publisher UUID
    /// - `EVENTFLOW_MQTT_BROKER`: MQTT broker URL
    /// - `EVENTFLOW_TENANT`: Tenant identifier
    /// - `EVENTFLOW_MATCH_POLICY`: "exact" or "relaxed"
    /// - `EVENTFLOW_FLUSH_INTERVAL_MS`: Flush interval in milliseconds
    /// - `EVENTFLOW_CHANNEL_CAPACITY`: Producer channel capacity
    ///
    /// # Errors
    ///
    /// Returns error if a present variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(id) = std::env::var("EVENTFLOW_PUBLISHER_ID") {
            config.publisher_id =
                Some(Uuid::parse_str(&id).context("Invalid EVENTFLOW_PUBLISHER_ID")?);
        }

        if let Ok(broker) = std::env::var("EVENTFLOW_MQTT_BROKER") {
            config.mqtt_broker = broker;
        }

        if let Ok(tenant) = std::env::var("EVENTFLOW_TENANT") {
            config.tenant = tenant;
        }

        if let Ok(policy) = std::env::var("EVENTFLOW_MATCH_POLICY") {
            config.policy = match policy.as_str() {
                "exact" => MatchPolicy::Exact,
                "relaxed" => MatchPolicy::Relaxed,
                other => anyhow::bail!("Invalid EVENTFLOW_MATCH_POLICY: {other}"),
            };
        }

        if let Ok(interval) = std::env::var("EVENTFLOW_FLUSH_INTERVAL_MS") {
            let millis: u64 = interval
                .parse()
                .context("Invalid EVENTFLOW_FLUSH_INTERVAL_MS")?;
            config.flush_interval = Duration::from_millis(millis);
        }

        if let Ok(capacity) = std::env::var("EVENTFLOW_CHANNEL_CAPACITY") {
            config.channel_capacity = capacity
                .parse()
                .context("Invalid EVENTFLOW_CHANNEL_CAPACITY")?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = PublisherConfig::default();

        assert_eq!(config.tenant, "default");
        assert_eq!(config.policy, MatchPolicy::Relaxed);
        assert!(config.channel_capacity > 0);
    }
}
