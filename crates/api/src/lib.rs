//! # Quill Server
//!
//! HTTP surface of the Quill blog server.
//!
//! This crate contains:
//! - Application context (dependency wiring and background loops)
//! - The axum router: telemetry fragments, articles and robots.txt
//! - Request guard and request tracking middleware
//! - Startup and graceful shutdown
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture
//! - Handlers only read; aggregation happens in the background loops

pub mod context;
pub mod middleware;
pub mod routes;
pub mod server;

pub use context::{AppContext, BackgroundTasks, HttpInstruments};
pub use routes::router;
pub use server::run;
