//! Firestore REST client
//!
//! Talks to the v1 REST API directly:
//! - appends go through `documents:commit` so the timestamp can be a server
//!   transform (`REQUEST_TIME`), the same thing the admin SDK's
//!   `serverTimestamp()` sentinel does
//! - reads go through `documents:runQuery` with a descending `orderBy`
//!
//! Pointing `FIRESTORE_EMULATOR_HOST` at a local emulator skips OAuth.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::token::TokenProvider;
use super::value::{decode_fields, encode_fields};
use super::{auto_id, DocumentStore, Fields, StoreError, StoredDocument};
use crate::credentials::CredentialBundle;

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_DATABASE: &str = "(default)";

/// Connection settings that do not come from the credential bundle
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Database id within the project
    pub database: String,
    /// `host:port` of a local emulator
    pub emulator_host: Option<String>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            emulator_host: None,
        }
    }
}

/// One entry of a `runQuery` response stream
#[derive(Deserialize)]
struct RunQueryResponse {
    #[serde(default)]
    document: Option<RawDocument>,
}

#[derive(Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Firestore-backed [`DocumentStore`]
pub struct FirestoreStore {
    base_url: String,
    documents_root: String,
    http: reqwest::Client,
    tokens: TokenProvider,
}

impl FirestoreStore {
    /// Build the client. Fails only if the private key cannot be parsed.
    pub fn connect(bundle: &CredentialBundle, config: &FirestoreConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("bubble-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let (base_url, tokens) = match config.emulator_host.as_deref() {
            Some(host) => {
                info!("Using Firestore emulator at {}", host);
                (format!("http://{}/v1", host), TokenProvider::emulator(http.clone()))
            }
            None => (
                DEFAULT_BASE_URL.to_string(),
                TokenProvider::service_account(bundle, http.clone())?,
            ),
        };

        let documents_root = format!(
            "projects/{}/databases/{}/documents",
            bundle.project_id, config.database
        );

        Ok(Self {
            base_url,
            documents_root,
            http,
            tokens,
        })
    }

    /// Resource name prefix, `projects/{p}/databases/{d}/documents`
    pub fn documents_root(&self) -> &str {
        &self.documents_root
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.base_url, self.documents_root, suffix)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<reqwest::Response, StoreError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Commit request that creates `name` and optionally stamps a server time
pub fn commit_body(name: &str, fields: &Fields, server_timestamp_field: Option<&str>) -> Value {
    let mut write = json!({
        "update": {
            "name": name,
            "fields": encode_fields(fields),
        },
        "currentDocument": { "exists": false },
    });
    if let Some(field) = server_timestamp_field {
        write["updateTransforms"] = json!([{
            "fieldPath": field_path(field),
            "setToServerValue": "REQUEST_TIME",
        }]);
    }
    json!({ "writes": [write] })
}

/// Structured query for the newest `limit` documents of a collection
pub fn recent_query_body(collection: &str, order_by: &str, limit: usize) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "orderBy": [{
                "field": { "fieldPath": field_path(order_by) },
                "direction": "DESCENDING",
            }],
            "limit": limit,
        }
    })
}

/// Quote a field name with backticks unless it is a simple identifier
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn add(
        &self,
        collection: &str,
        fields: Fields,
        server_timestamp_field: Option<&str>,
    ) -> Result<String, StoreError> {
        let id = auto_id();
        let name = format!("{}/{}/{}", self.documents_root, collection, id);
        let body = commit_body(&name, &fields, server_timestamp_field);

        debug!(collection = %collection, id = %id, "Committing document");
        self.post_json(&self.url(":commit"), &body).await?;
        Ok(id)
    }

    async fn query_recent(
        &self,
        collection: &str,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let body = recent_query_body(collection, order_by, limit);

        debug!(collection = %collection, order_by = %order_by, limit, "Running query");
        let response = self.post_json(&self.url(":runQuery"), &body).await?;
        let entries: Vec<RunQueryResponse> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| entry.document)
            .map(|doc| StoredDocument {
                id: doc.name.rsplit('/').next().unwrap_or_default().to_string(),
                fields: decode_fields(&doc.fields),
            })
            .collect())
    }

    fn backend(&self) -> &'static str {
        "firestore"
    }
}
