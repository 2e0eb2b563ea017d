//! Modular common utilities shared across Quill crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: synchronous collections (shard maps)
//! - `runtime`: tokio-backed time utilities (intervals, duration formatting)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod collections;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod time;

// Re-export commonly used types for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use collections::ShardMap;
#[cfg(feature = "runtime")]
pub use time::{format_duration, Interval, IntervalConfig};
