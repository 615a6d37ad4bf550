//! HTTP server and shared state

pub mod http;
pub mod startup;

pub use http::{handle_request, run, serve, AppState};
pub use startup::{init_store, StoreInit};
