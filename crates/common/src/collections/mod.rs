//! Specialized data structures
//!
//! - **[`shard_map`]**: Grow-only map of named atomic counters
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "foundation")]
//! # {
//! use quill_common::collections::ShardMap;
//!
//! let shards = ShardMap::new();
//! shards.get_or_create("hello-world").store(3);
//! assert_eq!(shards.get("hello-world"), Some(3));
//! # }
//! ```

pub mod shard_map;

// Re-export commonly used types
pub use shard_map::{Shard, ShardMap};
