//! `POST /api/send-data`: append a form submission
//!
//! No deduplication: a retried request stores a second document.

use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::{Request, StatusCode};
use tracing::{error, info, warn};

use super::{empty_response, error_response, FullBody};
use crate::config::GatewayConfig;
use crate::models::SubmissionRequest;
use crate::store::DocumentStore;
use crate::types::{GatewayError, Result};

const OPERATION: &str = "add";

/// Handle a submission request
pub async fn handle_send_data<B>(
    req: Request<B>,
    store: Option<&dyn DocumentStore>,
    config: &GatewayConfig,
) -> hyper::Response<FullBody>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let Some(store) = store else {
        warn!(
            operation = OPERATION,
            collection = %config.submissions_collection,
            "Rejecting submission, document store unavailable"
        );
        let err = GatewayError::StoreUnavailable("Firebase credentials were not loaded".to_string());
        return error_response(err.status_code(), "Document store unavailable", Some(err.to_string()));
    };

    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let err = GatewayError::ClientInput(format!("Failed to read request body: {}", e));
            warn!("{}", err);
            return error_response(err.status_code(), "Bad Request", Some(err.to_string()));
        }
    };

    match submit(store, config, &body).await {
        Ok(id) => {
            info!(collection = %config.submissions_collection, id = %id, "Stored form submission");
            empty_response(StatusCode::OK)
        }
        Err(err @ GatewayError::ClientInput(_)) => {
            warn!("{}", err);
            error_response(err.status_code(), "Bad Request", Some(err.to_string()))
        }
        Err(err) => {
            error!(
                operation = OPERATION,
                collection = %config.submissions_collection,
                error = %err,
                "Error saving data"
            );
            error_response(err.status_code(), "Error saving data", Some(err.to_string()))
        }
    }
}

/// Parse the body and append it to the submissions collection
pub async fn submit(
    store: &dyn DocumentStore,
    config: &GatewayConfig,
    body: &[u8],
) -> Result<String> {
    let request: SubmissionRequest = serde_json::from_slice(body)
        .map_err(|e| GatewayError::ClientInput(format!("Invalid JSON: {}", e)))?;

    store
        .add(
            &config.submissions_collection,
            request.into_fields(),
            Some(config.submission_timestamp_field.as_str()),
        )
        .await
        .map_err(|source| GatewayError::StoreOperation {
            operation: OPERATION,
            collection: config.submissions_collection.clone(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use bytes::Bytes;
    use http_body_util::Full;

    fn request(body: &'static str) -> Request<Full<Bytes>> {
        Request::post("/api/send-data")
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[tokio::test]
    async fn test_stores_submission() {
        let store = MemoryStore::new();
        let config = GatewayConfig::default();

        let response = handle_send_data(
            request(r#"{"name":"A","email":"a@x.com","message":"hi"}"#),
            Some(&store),
            &config,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());

        let docs = store.documents("formSubmissions").await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields["message"], "hi");
        assert!(docs[0].fields.contains_key("timestamp"));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let response = handle_send_data(
            request(r#"{"name":"A","email":"a@x.com","message":"hi"}"#),
            None,
            &GatewayConfig::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let store = MemoryStore::new();
        let response =
            handle_send_data(request("{not json"), Some(&store), &GatewayConfig::default()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.documents("formSubmissions").await.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let store = MemoryStore::failing("quota exceeded");
        let response = handle_send_data(
            request(r#"{"name":"A","email":"a@x.com","message":"hi"}"#),
            Some(&store),
            &GatewayConfig::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Error saving data");
    }

    #[tokio::test]
    async fn test_submit_direct_duplicates_allowed() {
        let store = MemoryStore::new();
        let config = GatewayConfig::default();
        let body = br#"{"name":"A","email":"a@x.com","message":"hi"}"#;

        let first = submit(&store, &config, body).await.unwrap();
        let second = submit(&store, &config, body).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.documents("formSubmissions").await.len(), 2);
    }
}
