//! namescreen server
//!
//! HTTP front end for the detection pipeline. The binary in `main.rs`
//! handles CLI parsing, logging and the listener; this library holds the
//! configuration, state and routes so they can be exercised in tests.

pub mod config;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::create_router;
pub use state::AppState;
