//! Element identities and the comparison policy used for compaction.
//!
//! Sources, semantic classifiers, observed roots, and change locations are
//! all key chains ([`ElementPath`]). The [`MatchPolicy`] decides how strictly
//! two chains are compared: exact keys, or relaxed matching that ignores
//! non-semantic qualifiers such as version and locality tags.

use serde::{Deserialize, Serialize};

/// One key in an element reference chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathKey {
    /// Element kind the key points at (e.g. "Submodel", "Property")
    pub kind: String,
    /// Identifier value
    pub value: String,
    /// Non-semantic qualifier (version or locality tag); relaxed matching
    /// ignores it
    pub qualifier: Option<String>,
}

impl PathKey {
    /// Create a key without a qualifier.
    #[must_use]
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            qualifier: None,
        }
    }

    /// Create a key carrying a version/locality qualifier.
    #[must_use]
    pub fn with_qualifier(
        kind: impl Into<String>,
        value: impl Into<String>,
        qualifier: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            qualifier: Some(qualifier.into()),
        }
    }
}

/// Ordered key chain locating an element relative to some root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementPath {
    /// Keys from the root downwards
    pub keys: Vec<PathKey>,
}

impl ElementPath {
    /// The empty path (the root itself).
    #[must_use]
    pub fn root() -> Self {
        Self { keys: vec![] }
    }

    /// Build a path from keys.
    #[must_use]
    pub fn from_keys(keys: Vec<PathKey>) -> Self {
        Self { keys }
    }

    /// Build a path of plain element keys from a dot-separated string.
    ///
    /// Each segment becomes a key of kind `Element`; richer kinds come from
    /// the editor.
    #[must_use]
    pub fn from_short_path(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self {
            keys: path.split('.').map(|s| PathKey::new("Element", s)).collect(),
        }
    }

    /// A new path with `key` appended.
    #[must_use]
    pub fn child(&self, key: PathKey) -> Self {
        let mut keys = self.keys.clone();
        keys.push(key);
        Self { keys }
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the path has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key naming the referenced element itself.
    #[must_use]
    pub fn last(&self) -> Option<&PathKey> {
        self.keys.last()
    }

    /// Dot-separated value form.
    #[must_use]
    pub fn to_short_path(&self) -> String {
        self.keys
            .iter()
            .map(|k| k.value.clone())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Generate a hash for MQTT topic sharding.
    #[must_use]
    pub fn topic_hash(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

impl std::fmt::Display for ElementPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_short_path())
    }
}

/// Comparison policy for identities and paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Byte-for-byte key equality, qualifiers included
    Exact,
    /// Ignore qualifiers, compare trimmed values case-insensitively
    #[default]
    Relaxed,
}

impl MatchPolicy {
    /// Compare two keys under this policy.
    #[must_use]
    pub fn keys_match(self, a: &PathKey, b: &PathKey) -> bool {
        match self {
            Self::Exact => a == b,
            Self::Relaxed => {
                a.kind == b.kind && a.value.trim().eq_ignore_ascii_case(b.value.trim())
            }
        }
    }

    /// Compare two key chains under this policy. Chains of different length
    /// never match.
    #[must_use]
    pub fn paths_match(self, a: &ElementPath, b: &ElementPath) -> bool {
        a.keys.len() == b.keys.len()
            && a.keys
                .iter()
                .zip(&b.keys)
                .all(|(x, y)| self.keys_match(x, y))
    }
}
