//! Document store abstraction
//!
//! Handlers talk to a [`DocumentStore`]; production uses the Firestore REST
//! API and tests use the in-memory store.

pub mod firestore;
pub mod memory;
pub mod token;
pub mod value;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use firestore::{FirestoreConfig, FirestoreStore};
pub use memory::MemoryStore;

/// Field map of a stored document
pub type Fields = Map<String, Value>;

/// A document read back from a collection
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Store-assigned document id
    pub id: String,
    pub fields: Fields,
}

/// Errors from store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Store rejected the operation: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

/// Append-and-query access to a schema-flexible document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a new document and return its id.
    ///
    /// When `server_timestamp_field` is set the store fills that field with
    /// its own commit time.
    async fn add(
        &self,
        collection: &str,
        fields: Fields,
        server_timestamp_field: Option<&str>,
    ) -> Result<String, StoreError>;

    /// Up to `limit` documents ordered by `order_by`, newest first.
    ///
    /// Documents without the `order_by` field are not returned.
    async fn query_recent(
        &self,
        collection: &str,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Short backend name for health output
    fn backend(&self) -> &'static str;
}

const AUTO_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const AUTO_ID_LEN: usize = 20;

/// Random 20-character document id, the same shape Firestore clients generate
pub fn auto_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..AUTO_ID_LEN)
        .map(|_| AUTO_ID_ALPHABET[rng.gen_range(0..AUTO_ID_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_auto_id_shape() {
        let id = auto_id();
        assert_eq!(id.len(), AUTO_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_auto_ids_distinct() {
        let ids: HashSet<String> = (0..1000).map(|_| auto_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
