//! Gateway probes
//!
//! `/health` answers 200 whenever the process is up and reports whether a
//! document store was configured, which backend it is and where its
//! credentials were found. `/ready` returns the same body but answers 503
//! while the gateway runs without a store, so a degraded instance is kept
//! out of rotation until its credentials are fixed.

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{json_response, FullBody};
use crate::config::CredentialPolicy;
use crate::credentials::CredentialSource;
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always true when the process answers
    pub healthy: bool,
    /// 'online' with a store, 'degraded' without
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub timestamp: String,
    pub credential_policy: &'static str,
    pub store: StoreHealth,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreHealth {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_source: Option<CredentialSource>,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let available = state.store.is_some();

    HealthResponse {
        healthy: true,
        status: if available { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        credential_policy: match state.config.credential_policy {
            CredentialPolicy::Strict => "strict",
            CredentialPolicy::Degraded => "degraded",
        },
        store: StoreHealth {
            available,
            backend: state.store.as_ref().map(|s| s.backend()),
            credential_source: state.credential_source,
        },
    }
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: &AppState) -> Response<FullBody> {
    json_response(StatusCode::OK, &build_health_response(state))
}

/// Handle readiness probe (/ready, /readyz)
pub fn readiness_check(state: &AppState) -> Response<FullBody> {
    let response = build_health_response(state);
    let status = if response.store.available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, &response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_degraded_health() {
        let state = AppState::new(GatewayConfig::default(), None);
        assert_eq!(health_check(&state).status(), StatusCode::OK);
        assert_eq!(readiness_check(&state).status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = build_health_response(&state);
        assert_eq!(body.status, "degraded");
        assert!(body.store.backend.is_none());
    }

    #[test]
    fn test_ready_with_store() {
        let state = AppState::new(GatewayConfig::default(), Some(Arc::new(MemoryStore::new())))
            .with_credential_source(CredentialSource::DiscreteFields);
        assert_eq!(readiness_check(&state).status(), StatusCode::OK);

        let body = serde_json::to_value(build_health_response(&state)).unwrap();
        assert_eq!(body["status"], "online");
        assert_eq!(body["store"]["backend"], "memory");
        assert_eq!(body["store"]["credentialSource"], "discrete_fields");
    }
}
