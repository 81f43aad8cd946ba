//! Queue-durable job record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::notifications::Recipient;

/// Serialized notification plus delivery bookkeeping.
///
/// Stored JSON-encoded in both the immediate queue and the delayed set.
/// `notification_type` must resolve through the type registry before the
/// job can be hydrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Unique job id; keeps otherwise identical payloads distinct in the
    /// delayed set
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    pub notification_type: String,

    /// The notification's own fields
    pub data: Value,

    pub recipient: Recipient,

    /// Creation time in epoch milliseconds
    pub timestamp: i64,

    #[serde(default)]
    pub attempt: u32,
}

impl Envelope {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_field_names() {
        let envelope = Envelope {
            id: Uuid::nil(),
            notification_type: "Welcome".to_string(),
            data: json!({ "name": "Ada" }),
            recipient: Recipient::new().with_id(1_i64),
            timestamp: 1_700_000_000_000,
            attempt: 2,
        };

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["notificationType"], json!("Welcome"));
        assert_eq!(value["attempt"], json!(2));
        assert_eq!(value["recipient"], json!({ "id": 1 }));
    }

    #[test]
    fn test_missing_id_and_attempt_default() {
        let raw = r#"{"notificationType":"Welcome","data":{},"recipient":{},"timestamp":5}"#;
        let envelope = Envelope::from_json(raw).unwrap();
        assert_eq!(envelope.attempt, 0);
        assert!(!envelope.id.is_nil());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(Envelope::from_json("not json").is_err());
        assert!(Envelope::from_json(r#"{"data":{}}"#).is_err());
    }
}
