// src/event.rs
use serde::Deserialize;
use tracing::warn;

use crate::error::{ConvertError, Result};
use crate::store::ObjectRef;

/// Object-created notification, in the bucket-notification wire shape:
/// `{"Records":[{"s3":{"bucket":{"name":..},"object":{"key":..}}}]}`.
/// Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectCreatedEvent {
    #[serde(rename = "Records")]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub s3: EventEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventEntity {
    pub bucket: BucketRef,
    pub object: ObjectKey,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectKey {
    pub key: String,
}

impl ObjectCreatedEvent {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| ConvertError::InvalidEvent(e.to_string()))
    }

    /// A single-record event for `container`/`key`.
    pub fn for_object(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            records: vec![EventRecord {
                s3: EventEntity {
                    bucket: BucketRef {
                        name: container.into(),
                    },
                    object: ObjectKey { key: key.into() },
                },
            }],
        }
    }

    /// The object this invocation converts. Only the first record is used.
    pub fn object_ref(&self) -> Result<ObjectRef> {
        let first = self
            .records
            .first()
            .ok_or_else(|| ConvertError::InvalidEvent("event has no records".into()))?;
        if self.records.len() > 1 {
            warn!(
                records = self.records.len(),
                "event carries several records; converting only the first"
            );
        }
        let entity = &first.s3;
        if entity.bucket.name.is_empty() || entity.object.key.is_empty() {
            return Err(ConvertError::InvalidEvent(
                "bucket name and object key must be non-empty".into(),
            ));
        }
        Ok(ObjectRef::new(&entity.bucket.name, &entity.object.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notification() {
        let payload = br#"{
            "Records": [{
                "eventVersion": "2.1",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": {"name": "superstore-raw", "arn": "arn:x"},
                    "object": {"key": "data/orders.json", "size": 120}
                }
            }]
        }"#;
        let event = ObjectCreatedEvent::from_slice(payload).unwrap();
        assert_eq!(
            event.object_ref().unwrap(),
            ObjectRef::new("superstore-raw", "data/orders.json")
        );
    }

    #[test]
    fn test_invalid_events() {
        let payloads: [&[u8]; 2] = [
            br#"{"Records": []}"#,
            br#"{"Records": [{"s3": {"bucket": {"name": ""}, "object": {"key": "k"}}}]}"#,
        ];
        for payload in payloads {
            let event = ObjectCreatedEvent::from_slice(payload).unwrap();
            assert!(matches!(
                event.object_ref(),
                Err(ConvertError::InvalidEvent(_))
            ));
        }
        assert!(matches!(
            ObjectCreatedEvent::from_slice(b"{}"),
            Err(ConvertError::InvalidEvent(_))
        ));
    }

    #[test]
    fn test_first_record_wins() {
        let mut event = ObjectCreatedEvent::for_object("b", "one.json");
        event
            .records
            .extend(ObjectCreatedEvent::for_object("b", "two.json").records);
        assert_eq!(event.object_ref().unwrap().key, "one.json");
    }
}
