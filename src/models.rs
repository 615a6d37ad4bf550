//! Request and response shapes
//!
//! Bubble documents were written by several versions of the frontend and
//! never migrated, so one logical attribute can live under several field
//! names. Each attribute reads a fixed priority list and the first present,
//! non-null field wins.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Fields, StoredDocument};

pub const TITLE_FIELDS: &[&str] = &["title", "name", "eventTitle", "event_title", "subject"];
pub const EVENT_TYPE_FIELDS: &[&str] = &["eventType", "event_type", "type", "category"];
pub const CREATED_AT_FIELDS: &[&str] = &["createdAt", "created_at", "timestamp", "time"];
pub const EVENT_TITLE_FIELDS: &[&str] = &["eventTitle", "event_title", "title", "name"];
pub const EVENT_WHEN_FIELDS: &[&str] = &["eventWhen", "event_when", "when", "eventDate", "date"];
pub const POSITION_FIELDS: &[&str] = &["position", "pos"];
pub const SIZE_FIELDS: &[&str] = &["size", "radius", "r"];
pub const COLOR_FIELDS: &[&str] = &["color", "colour", "backgroundColor", "bg"];

/// Body of `POST /api/send-data`
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl SubmissionRequest {
    /// Stored fields; the timestamp is added by the store
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::String(self.name));
        fields.insert("email".to_string(), Value::String(self.email));
        fields.insert("message".to_string(), Value::String(self.message));
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Display-oriented view of a bubble document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BubbleRecord {
    pub id: String,
    pub title: Option<String>,
    pub event_type: Option<String>,
    pub created_at: Option<String>,
    pub event_title: Option<String>,
    pub event_when: Option<String>,
    pub position: Option<Position>,
    pub size: Option<f64>,
    pub color: Option<String>,
    /// The document exactly as stored
    pub raw_payload: Fields,
}

impl BubbleRecord {
    pub fn from_document(doc: StoredDocument) -> Self {
        let fields = &doc.fields;
        Self {
            title: first_text(fields, TITLE_FIELDS),
            event_type: first_text(fields, EVENT_TYPE_FIELDS),
            created_at: first_present(fields, CREATED_AT_FIELDS).and_then(timestamp_text),
            event_title: first_text(fields, EVENT_TITLE_FIELDS),
            event_when: first_present(fields, EVENT_WHEN_FIELDS).and_then(timestamp_text),
            position: position(fields),
            size: first_present(fields, SIZE_FIELDS).and_then(number),
            color: first_text(fields, COLOR_FIELDS),
            id: doc.id,
            raw_payload: doc.fields,
        }
    }
}

fn first_present<'a>(fields: &'a Fields, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|value| !value.is_null())
}

fn first_text(fields: &Fields, candidates: &[&str]) -> Option<String> {
    first_present(fields, candidates).and_then(text)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339 rendering of the timestamp shapes found in old documents.
///
/// Numbers are epoch milliseconds, `{seconds, nanoseconds}` maps are
/// serialized Firestore timestamps, strings pass through.
fn timestamp_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single().map(render)
        }
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(number)? as i64;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(number)
                .unwrap_or(0.0) as u32;
            Utc.timestamp_opt(seconds, nanos).single().map(render)
        }
        _ => None,
    }
}

fn render(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn position(fields: &Fields) -> Option<Position> {
    let nested = first_present(fields, POSITION_FIELDS)
        .and_then(Value::as_object)
        .and_then(|map| Some(Position {
            x: map.get("x").and_then(number)?,
            y: map.get("y").and_then(number)?,
        }));

    nested.or_else(|| {
        Some(Position {
            x: fields.get("x").and_then(number)?,
            y: fields.get("y").and_then(number)?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, value: Value) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            fields: value.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_current_schema() {
        let record = BubbleRecord::from_document(doc(
            "b1",
            json!({
                "title": "Study group",
                "eventType": "meetup",
                "createdAt": "2025-10-01T10:00:00Z",
                "eventTitle": "Library level 3",
                "eventWhen": "2025-10-03T14:00:00Z",
                "position": {"x": 0.4, "y": 0.7},
                "size": 120,
                "color": "#ffcc00"
            }),
        ));

        assert_eq!(record.id, "b1");
        assert_eq!(record.title.as_deref(), Some("Study group"));
        assert_eq!(record.event_type.as_deref(), Some("meetup"));
        assert_eq!(record.created_at.as_deref(), Some("2025-10-01T10:00:00Z"));
        assert_eq!(record.event_title.as_deref(), Some("Library level 3"));
        assert_eq!(record.position, Some(Position { x: 0.4, y: 0.7 }));
        assert_eq!(record.size, Some(120.0));
        assert_eq!(record.color.as_deref(), Some("#ffcc00"));
    }

    #[test]
    fn test_legacy_field_names() {
        let record = BubbleRecord::from_document(doc(
            "old",
            json!({
                "name": "Bake sale",
                "type": "fundraiser",
                "timestamp": 1_700_000_000_000i64,
                "date": "Friday",
                "x": "10",
                "y": 20,
                "radius": 44.5,
                "colour": "teal"
            }),
        ));

        assert_eq!(record.title.as_deref(), Some("Bake sale"));
        assert_eq!(record.event_title.as_deref(), Some("Bake sale"));
        assert_eq!(record.event_type.as_deref(), Some("fundraiser"));
        assert_eq!(record.created_at.as_deref(), Some("2023-11-14T22:13:20Z"));
        assert_eq!(record.event_when.as_deref(), Some("Friday"));
        assert_eq!(record.position, Some(Position { x: 10.0, y: 20.0 }));
        assert_eq!(record.size, Some(44.5));
        assert_eq!(record.color.as_deref(), Some("teal"));
    }

    #[test]
    fn test_priority_and_null_skipping() {
        let record = BubbleRecord::from_document(doc(
            "p",
            json!({"title": null, "name": "from name", "subject": "from subject"}),
        ));
        assert_eq!(record.title.as_deref(), Some("from name"));
    }

    #[test]
    fn test_serialized_timestamp_map() {
        let record = BubbleRecord::from_document(doc(
            "t",
            json!({"created_at": {"_seconds": 1_700_000_000, "_nanoseconds": 500_000_000}}),
        ));
        assert_eq!(record.created_at.as_deref(), Some("2023-11-14T22:13:20.500Z"));
    }

    #[test]
    fn test_raw_payload_and_empty_document() {
        let original = json!({"unmapped": [1, 2, 3]});
        let record = BubbleRecord::from_document(doc("e", original.clone()));
        assert_eq!(Value::Object(record.raw_payload.clone()), original);
        assert!(record.title.is_none());
        assert!(record.position.is_none());

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["id"], json!("e"));
        assert_eq!(out["rawPayload"], original);
        assert!(out.get("eventType").is_some());
    }

    #[test]
    fn test_submission_fields() {
        let request: SubmissionRequest =
            serde_json::from_value(json!({"name": "A", "email": "a@x.com", "message": "hi"}))
                .unwrap();
        let fields = request.into_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields["email"], json!("a@x.com"));
    }

    #[test]
    fn test_submission_requires_all_fields() {
        let result: Result<SubmissionRequest, _> =
            serde_json::from_value(json!({"name": "A", "email": "a@x.com"}));
        assert!(result.is_err());
    }
}
