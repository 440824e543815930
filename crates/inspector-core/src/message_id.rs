//! JSON-RPC message identifier.
//!
//! The wire format allows either a number or a string for `id`; two
//! requests correlate if their IDs compare equal after this normalization,
//! regardless of which JSON form either side used.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A JSON-RPC request/response identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(i64),
    String(String),
}

impl MessageId {
    /// Canonical string key used for the correlation map, so `1` and `"1"`
    /// are treated as the same logical ID per the spec's accept-either-form
    /// requirement.
    pub fn correlation_key(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for MessageId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_forms_correlate() {
        let a = MessageId::Number(42);
        let b = MessageId::String("42".to_string());
        assert_eq!(a.correlation_key(), b.correlation_key());
    }

    #[test]
    fn round_trips_through_json() {
        let id = MessageId::Number(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let back: MessageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
