//! MQTT topic scheme for compacted-change publication.
//!
//! Topic structure: `aas-eventflow/v1/{tenant}/{observable_hash}/{message_type}`
//!
//! This allows:
//! - Tenant isolation
//! - Topic sharding by observable root
//! - Message-type filtering

use serde::{Deserialize, Serialize};

/// Protocol version for topic scheme.
pub const PROTOCOL_VERSION: &str = "v1";

/// Topic scheme configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicScheme {
    /// Tenant identifier
    pub tenant: String,
    /// Topic prefix (default: "aas-eventflow")
    pub prefix: String,
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self {
            tenant: "default".to_string(),
            prefix: "aas-eventflow".to_string(),
        }
    }
}

impl TopicScheme {
    /// Create a new topic scheme with the given tenant.
    #[must_use]
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            prefix: "aas-eventflow".to_string(),
        }
    }

    /// Build the base topic path.
    fn base(&self, observable_hash: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.prefix, PROTOCOL_VERSION, self.tenant, observable_hash
        )
    }

    /// Topic for publisher hello messages.
    #[must_use]
    pub fn hello(&self, observable_hash: &str) -> String {
        format!("{}/hello", self.base(observable_hash))
    }

    /// Topic for compacted change batches.
    #[must_use]
    pub fn changes(&self, observable_hash: &str) -> String {
        format!("{}/changes", self.base(observable_hash))
    }

    /// Wildcard subscription for all messages of an observable.
    #[must_use]
    pub fn observable_wildcard(&self, observable_hash: &str) -> String {
        format!("{}/#", self.base(observable_hash))
    }

    /// Wildcard subscription for all messages in the tenant.
    #[must_use]
    pub fn tenant_wildcard(&self) -> String {
        format!("{}/{}/{}/#", self.prefix, PROTOCOL_VERSION, self.tenant)
    }

    /// Parse a topic to extract components.
    ///
    /// Returns `(observable_hash, message_type)` if valid.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<(String, MessageType)> {
        let expected_prefix = format!("{}/{}/{}/", self.prefix, PROTOCOL_VERSION, self.tenant);
        let remainder = topic.strip_prefix(&expected_prefix)?;
        let parts: Vec<&str> = remainder.split('/').collect();

        if parts.len() < 2 {
            return None;
        }

        let observable_hash = parts[0].to_string();
        let msg_type = match parts[1..].join("/").as_str() {
            "hello" => MessageType::Hello,
            "changes" => MessageType::Changes,
            _ => return None,
        };

        Some((observable_hash, msg_type))
    }
}

/// Message types in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Publisher hello
    Hello,
    /// Compacted change batch
    Changes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_generation() {
        let scheme = TopicScheme::new("factory-a");
        let hash = "abc123def456";

        assert_eq!(
            scheme.hello(hash),
            "aas-eventflow/v1/factory-a/abc123def456/hello"
        );
        assert_eq!(
            scheme.changes(hash),
            "aas-eventflow/v1/factory-a/abc123def456/changes"
        );
    }

    #[test]
    fn topic_parsing() {
        let scheme = TopicScheme::new("factory-a");

        let topic = "aas-eventflow/v1/factory-a/abc123/changes";
        let (hash, msg_type) = scheme.parse(topic).unwrap();

        assert_eq!(hash, "abc123");
        assert_eq!(msg_type, MessageType::Changes);
    }

    #[test]
    fn foreign_topics_do_not_parse() {
        let scheme = TopicScheme::new("factory-a");

        assert!(scheme.parse("aas-eventflow/v1/other-tenant/h/changes").is_none());
        assert!(scheme.parse("aas-eventflow/v1/factory-a/h/unknown").is_none());
        assert!(scheme.parse("aas-eventflow/v1/factory-a/h").is_none());
    }

    #[test]
    fn wildcard_topics() {
        let scheme = TopicScheme::new("tenant1");

        assert_eq!(
            scheme.observable_wildcard("doc1"),
            "aas-eventflow/v1/tenant1/doc1/#"
        );
        assert_eq!(scheme.tenant_wildcard(), "aas-eventflow/v1/tenant1/#");
    }
}
