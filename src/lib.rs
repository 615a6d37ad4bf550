//! Bubble gateway - form submission relay and bubble feed over Firestore
//!
//! The gateway loads a Firebase service account at startup and exposes two
//! JSON endpoints to the browser:
//!
//! ## Routes
//!
//! - **POST /api/send-data**: store `{name, email, message}` with a server timestamp
//! - **GET /api/first-five**: the five most recent bubbles, normalized
//! - **/health**, **/ready**: liveness and readiness probes
//!
//! Credentials come from a JSON blob, a key file, discrete variables, or a
//! scan of the env file. When none of them work the process either exits
//! (strict) or keeps serving with the store-backed routes answering 503
//! (degraded).

pub mod config;
pub mod credentials;
pub mod models;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, serve, AppState};
pub use types::{GatewayError, Result};
