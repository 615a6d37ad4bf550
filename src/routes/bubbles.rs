//! `GET /api/first-five`: newest bubbles, normalized

use hyper::{Response, StatusCode};
use tracing::{debug, error, warn};

use super::{error_response, json_response, FullBody};
use crate::config::GatewayConfig;
use crate::models::BubbleRecord;
use crate::store::DocumentStore;
use crate::types::{GatewayError, Result};

const OPERATION: &str = "query";

/// Handle the read request
pub async fn handle_first_five(
    store: Option<&dyn DocumentStore>,
    config: &GatewayConfig,
) -> Response<FullBody> {
    match fetch_recent(store, config).await {
        Ok(records) => {
            debug!(collection = %config.read_collection, count = records.len(), "Served recent bubbles");
            json_response(StatusCode::OK, &records)
        }
        Err(err @ GatewayError::StoreUnavailable(_)) => {
            warn!(
                operation = OPERATION,
                collection = %config.read_collection,
                "Document store unavailable"
            );
            error_response(
                err.status_code(),
                "Document store unavailable",
                Some("Firebase credentials were not loaded; the gateway is running in degraded mode".to_string()),
            )
        }
        Err(err) => {
            error!(
                operation = OPERATION,
                collection = %config.read_collection,
                error = %err,
                "Error fetching recent documents"
            );
            error_response(err.status_code(), "Failed to fetch documents", Some(err.to_string()))
        }
    }
}

/// Newest `read_limit` documents of the read collection as bubble records
pub async fn fetch_recent(
    store: Option<&dyn DocumentStore>,
    config: &GatewayConfig,
) -> Result<Vec<BubbleRecord>> {
    let store = store.ok_or_else(|| {
        GatewayError::StoreUnavailable("Firebase credentials were not loaded".to_string())
    })?;

    let docs = store
        .query_recent(&config.read_collection, &config.order_field, config.read_limit)
        .await
        .map_err(|source| GatewayError::StoreOperation {
            operation: OPERATION,
            collection: config.read_collection.clone(),
            source,
        })?;

    Ok(docs
        .into_iter()
        .take(config.read_limit)
        .map(BubbleRecord::from_document)
        .collect())
}
