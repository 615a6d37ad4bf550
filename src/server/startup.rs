//! Store initialization under the credential policy
//!
//! Runs once, before the listener binds. In strict mode any credential
//! problem is returned to `main`, which exits. In degraded mode it is logged
//! and the gateway starts without a store.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::CredentialPolicy;
use crate::credentials::{self, CredentialError, CredentialSource, EnvSource, LoaderOptions};
use crate::store::{DocumentStore, FirestoreConfig, FirestoreStore, StoreError};
use crate::types::GatewayError;

/// Outcome of startup: the store handle (if any) and where its credentials came from
pub struct StoreInit {
    pub store: Option<Arc<dyn DocumentStore>>,
    pub credential_source: Option<CredentialSource>,
}

impl StoreInit {
    fn unavailable() -> Self {
        Self {
            store: None,
            credential_source: None,
        }
    }
}

/// Resolve credentials and connect the Firestore store.
pub fn init_store<E: EnvSource + ?Sized>(
    env: &E,
    loader: &LoaderOptions,
    firestore: &FirestoreConfig,
    policy: CredentialPolicy,
) -> Result<StoreInit, GatewayError> {
    match connect(env, loader, firestore) {
        Ok((store, source)) => {
            info!("Firestore store initialized (credentials from {})", source);
            Ok(StoreInit {
                store: Some(Arc::new(store)),
                credential_source: Some(source),
            })
        }
        Err(e) => match policy {
            CredentialPolicy::Strict => Err(e),
            CredentialPolicy::Degraded => {
                warn!("{} (degraded mode, continuing without document store)", e);
                Ok(StoreInit::unavailable())
            }
        },
    }
}

fn connect<E: EnvSource + ?Sized>(
    env: &E,
    loader: &LoaderOptions,
    firestore: &FirestoreConfig,
) -> Result<(FirestoreStore, CredentialSource), GatewayError> {
    let resolved = credentials::resolve(env, loader)?;
    let store = FirestoreStore::connect(&resolved.bundle, firestore).map_err(|e| match e {
        StoreError::Auth(reason) => GatewayError::Configuration(CredentialError::UnusableKey(reason)),
        other => GatewayError::StoreUnavailable(other.to_string()),
    })?;
    Ok((store, resolved.source))
}
