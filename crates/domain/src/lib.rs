//! # Quill Domain
//!
//! Domain types and models for the Quill blog server.
//!
//! This crate contains:
//! - Telemetry data types (metric batches, spans, cost rows, snapshots)
//! - Domain error types and Result definitions
//! - Configuration structures and validation
//! - Metric names and other domain constants
//!
//! ## Architecture
//! - No dependencies on other Quill crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
