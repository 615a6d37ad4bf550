//! In-memory document store
//!
//! Backs the handler and server tests. Ordering follows Firestore:
//! descending on the order field, and documents that lack the field are
//! left out.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{auto_id, DocumentStore, Fields, StoreError, StoredDocument};

/// Collections kept in process memory
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
    fail_with: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails (for exercising error paths)
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            fail_with: Some(reason.into()),
        }
    }

    /// Insert a document with a caller-chosen id and fields as given
    pub async fn seed(&self, collection: &str, id: &str, fields: Fields) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.to_string(),
                fields,
            });
    }

    /// Every document in a collection, in insertion order
    pub async fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), StoreError> {
        match &self.fail_with {
            Some(reason) => Err(StoreError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Firestore-like ordering across value types: null < bool < number < string
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(
        &self,
        collection: &str,
        mut fields: Fields,
        server_timestamp_field: Option<&str>,
    ) -> Result<String, StoreError> {
        self.check()?;

        if let Some(field) = server_timestamp_field {
            let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
            fields.insert(field.to_string(), Value::String(now));
        }

        let id = auto_id();
        self.seed(collection, &id, fields).await;
        Ok(id)
    }

    async fn query_recent(
        &self,
        collection: &str,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.check()?;

        let mut docs: Vec<StoredDocument> = self
            .documents(collection)
            .await
            .into_iter()
            .filter(|doc| doc.fields.contains_key(order_by))
            .collect();

        docs.sort_by(|a, b| compare_values(&b.fields[order_by], &a.fields[order_by]));
        docs.truncate(limit);
        Ok(docs)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
