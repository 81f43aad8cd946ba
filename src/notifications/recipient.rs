//! Recipient identity bag.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Recipient identifier, either numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipientId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipientId::Number(id) => write!(f, "{}", id),
            RecipientId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for RecipientId {
    fn from(id: i64) -> Self {
        RecipientId::Number(id)
    }
}

impl From<&str> for RecipientId {
    fn from(id: &str) -> Self {
        RecipientId::Text(id.to_string())
    }
}

impl From<String> for RecipientId {
    fn from(id: String) -> Self {
        RecipientId::Text(id)
    }
}

/// Who a notification is addressed to.
///
/// Only `id` and `email` are interpreted (for addressing and logging); any
/// other attributes are carried through the queue untouched and handed to the
/// channels as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecipientId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Recipient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<RecipientId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Label used in log lines: email, then id, then a placeholder.
    pub fn label(&self) -> String {
        match (&self.email, &self.id) {
            (Some(email), _) => email.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => "unknown-recipient".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recipient_label() {
        let r = Recipient::new().with_id(7_i64).with_email("a@example.com");
        assert_eq!(r.label(), "a@example.com");

        let r = Recipient::new().with_id("user-7");
        assert_eq!(r.label(), "user-7");

        assert_eq!(Recipient::new().label(), "unknown-recipient");
    }

    #[test]
    fn test_recipient_keeps_unknown_attributes() {
        let raw = json!({ "id": 42, "email": "x@example.com", "locale": "fr", "tier": 3 });
        let r: Recipient = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(r.id, Some(RecipientId::Number(42)));
        assert_eq!(r.attributes.get("locale"), Some(&json!("fr")));
        assert_eq!(serde_json::to_value(&r).unwrap(), raw);
    }

    #[test]
    fn test_recipient_id_untagged() {
        let id: RecipientId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(id, RecipientId::Text("abc".to_string()));
        let id: RecipientId = serde_json::from_value(json!(12)).unwrap();
        assert_eq!(id, RecipientId::Number(12));
    }
}
