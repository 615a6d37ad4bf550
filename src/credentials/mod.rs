//! Credential loading for the Firestore service account
//!
//! Sources are tried in a fixed order and the first one that yields a value
//! wins:
//!
//! 1. `FIREBASE_SERVICE_ACCOUNT`: the whole service account JSON in one variable
//! 2. `--service-account-file`: a downloaded `serviceAccountKey.json`
//! 3. `FIREBASE_PROJECT_ID` / `FIREBASE_CLIENT_EMAIL` / `FIREBASE_PRIVATE_KEY`
//! 4. a manual scan of the env file for any of (3) that `dotenvy` could not load
//!
//! Whatever the source, the private key ends up with real newlines and the
//! three required fields are checked before a bundle is handed out. What to
//! do on failure is the caller's decision (see [`crate::config::CredentialPolicy`]).

pub mod env;
pub mod env_file;
pub mod normalize;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub use env::{EnvSource, ProcessEnv};
use normalize::{normalize_private_key, normalize_scalar};

pub const SERVICE_ACCOUNT_VAR: &str = "FIREBASE_SERVICE_ACCOUNT";
pub const PROJECT_ID_VAR: &str = "FIREBASE_PROJECT_ID";
pub const CLIENT_EMAIL_VAR: &str = "FIREBASE_CLIENT_EMAIL";
pub const PRIVATE_KEY_VAR: &str = "FIREBASE_PRIVATE_KEY";
pub const PRIVATE_KEY_ID_VAR: &str = "FIREBASE_PRIVATE_KEY_ID";
pub const CLIENT_ID_VAR: &str = "FIREBASE_CLIENT_ID";

/// Anything shorter cannot be a PEM-encoded RSA key
pub const MIN_PRIVATE_KEY_LEN: usize = 64;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Normalized service account credentials
///
/// Immutable once built. The key material is wiped when the bundle drops.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CredentialBundle {
    pub project_id: String,
    pub client_email: String,
    /// PEM with real newline characters
    pub private_key: String,
    pub private_key_id: Option<String>,
    pub client_id: Option<String>,
    pub token_uri: Option<String>,
}

impl CredentialBundle {
    /// OAuth token endpoint (falls back to Google's default)
    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"[redacted]")
            .field("private_key_id", &self.private_key_id)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Where a bundle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    ServiceAccountJson,
    ServiceAccountFile,
    DiscreteFields,
    EnvFileScan,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CredentialSource::ServiceAccountJson => SERVICE_ACCOUNT_VAR,
            CredentialSource::ServiceAccountFile => "service account file",
            CredentialSource::DiscreteFields => "discrete FIREBASE_* variables",
            CredentialSource::EnvFileScan => "env file scan",
        };
        f.write_str(name)
    }
}

/// A validated bundle and the source that produced it
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub bundle: CredentialBundle,
    pub source: CredentialSource,
}

/// Errors from credential resolution
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to parse service account JSON from {origin}: {reason}")]
    MalformedServiceAccount { origin: String, reason: String },

    #[error("Failed to read service account file {path}: {reason}")]
    ServiceAccountFile { path: String, reason: String },

    #[error(
        "Firebase credentials missing: {}. Set FIREBASE_SERVICE_ACCOUNT or \
         FIREBASE_PROJECT_ID/FIREBASE_CLIENT_EMAIL/FIREBASE_PRIVATE_KEY",
        .0.join(", ")
    )]
    MissingFields(Vec<String>),

    #[error("Private key is too short ({0} bytes), expected a PEM-encoded key")]
    KeyTooShort(usize),

    /// The key passed validation but the signer rejected it
    #[error("{0}")]
    UnusableKey(String),
}

/// Paths the loader may read besides the environment
#[derive(Debug, Default, Clone)]
pub struct LoaderOptions {
    /// Env file to scan when a variable did not survive `dotenvy`
    pub env_file: Option<PathBuf>,
    /// Downloaded service account key
    pub service_account_file: Option<PathBuf>,
}

/// Raw service account document as Google issues it
#[derive(Deserialize)]
struct ServiceAccountKey {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    client_email: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// Resolve credentials from the first source that provides them.
pub fn resolve<E: EnvSource + ?Sized>(
    env: &E,
    options: &LoaderOptions,
) -> Result<ResolvedCredentials, CredentialError> {
    if let Some(raw) = env.var(SERVICE_ACCOUNT_VAR).filter(|v| !v.trim().is_empty()) {
        debug!("Loading credentials from {}", SERVICE_ACCOUNT_VAR);
        let bundle = from_service_account_json(&raw, SERVICE_ACCOUNT_VAR)?;
        return Ok(finish(bundle, CredentialSource::ServiceAccountJson));
    }

    if let Some(ref path) = options.service_account_file {
        debug!("Loading credentials from {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|e| CredentialError::ServiceAccountFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let bundle = from_service_account_json(&raw, &path.display().to_string())?;
        return Ok(finish(bundle, CredentialSource::ServiceAccountFile));
    }

    from_discrete_fields(env, options)
}

fn finish(bundle: CredentialBundle, source: CredentialSource) -> ResolvedCredentials {
    if bundle.private_key_id.is_none() {
        warn!("Service account private_key_id is not set; tokens will be signed without a key id");
    }
    if bundle.client_id.is_none() {
        warn!("Service account client_id is not set");
    }
    ResolvedCredentials { bundle, source }
}

fn from_service_account_json(raw: &str, origin: &str) -> Result<CredentialBundle, CredentialError> {
    let key: ServiceAccountKey = serde_json::from_str(normalize::strip_quotes(raw)).map_err(|e| {
        CredentialError::MalformedServiceAccount {
            origin: origin.to_string(),
            reason: e.to_string(),
        }
    })?;

    let project_id = key.project_id.as_deref().and_then(normalize_scalar);
    let client_email = key.client_email.as_deref().and_then(normalize_scalar);
    let private_key = key.private_key.as_deref().and_then(normalize_private_key);

    let mut missing = Vec::new();
    if project_id.is_none() {
        missing.push("project_id".to_string());
    }
    if client_email.is_none() {
        missing.push("client_email".to_string());
    }
    if private_key.is_none() {
        missing.push("private_key".to_string());
    }

    validate(
        project_id,
        client_email,
        private_key,
        missing,
        key.private_key_id.as_deref().and_then(normalize_scalar),
        key.client_id.as_deref().and_then(normalize_scalar),
        key.token_uri.as_deref().and_then(normalize_scalar),
    )
}

fn from_discrete_fields<E: EnvSource + ?Sized>(
    env: &E,
    options: &LoaderOptions,
) -> Result<ResolvedCredentials, CredentialError> {
    let env_text = options
        .env_file
        .as_ref()
        .and_then(|path| std::fs::read_to_string(path).ok());
    let env_text = env_text.as_deref();

    let project_id = lookup(env, env_text, PROJECT_ID_VAR, normalize_scalar);
    let client_email = lookup(env, env_text, CLIENT_EMAIL_VAR, normalize_scalar);
    let private_key = lookup(env, env_text, PRIVATE_KEY_VAR, normalize_private_key);

    let scanned = [&project_id, &client_email, &private_key]
        .iter()
        .any(|field| matches!(field, Some((_, true))));

    let mut missing = Vec::new();
    if project_id.is_none() {
        missing.push(PROJECT_ID_VAR.to_string());
    }
    if client_email.is_none() {
        missing.push(CLIENT_EMAIL_VAR.to_string());
    }
    if private_key.is_none() {
        missing.push(PRIVATE_KEY_VAR.to_string());
    }

    let bundle = validate(
        project_id.map(|(v, _)| v),
        client_email.map(|(v, _)| v),
        private_key.map(|(v, _)| v),
        missing,
        lookup(env, env_text, PRIVATE_KEY_ID_VAR, normalize_scalar).map(|(v, _)| v),
        lookup(env, env_text, CLIENT_ID_VAR, normalize_scalar).map(|(v, _)| v),
        None,
    )?;

    let source = if scanned {
        CredentialSource::EnvFileScan
    } else {
        CredentialSource::DiscreteFields
    };
    Ok(finish(bundle, source))
}

/// Read one variable, falling back to the env file scan.
///
/// The flag in the result is true when the value came from the scan.
fn lookup<E: EnvSource + ?Sized>(
    env: &E,
    env_text: Option<&str>,
    name: &str,
    normalize: fn(&str) -> Option<String>,
) -> Option<(String, bool)> {
    let from_env = env
        .var(name)
        .and_then(|v| normalize(&v))
        .filter(|v| !is_truncated_pem(v));
    if let Some(value) = from_env {
        return Some((value, false));
    }

    let value = env_file::scan_value(env_text?, name).and_then(|v| normalize(&v))?;
    debug!("Recovered {} from env file scan", name);
    Some((value, true))
}

/// `dotenvy` keeps only the first line of an unquoted multiline key
fn is_truncated_pem(value: &str) -> bool {
    value.contains("-----BEGIN") && !value.contains("-----END")
}

fn validate(
    project_id: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    missing: Vec<String>,
    private_key_id: Option<String>,
    client_id: Option<String>,
    token_uri: Option<String>,
) -> Result<CredentialBundle, CredentialError> {
    let (Some(project_id), Some(client_email), Some(private_key)) =
        (project_id, client_email, private_key)
    else {
        return Err(CredentialError::MissingFields(missing));
    };

    if private_key.len() <= MIN_PRIVATE_KEY_LEN {
        return Err(CredentialError::KeyTooShort(private_key.len()));
    }

    Ok(CredentialBundle {
        project_id,
        client_email,
        private_key,
        private_key_id,
        client_id,
        token_uri,
    })
}
