//! Time utilities
//!
//! - **[`format`]**: Human-readable duration formatting
//! - **[`interval`]**: Recurring intervals for background loops
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "runtime")]
//! # {
//! use std::time::Duration;
//!
//! use quill_common::time::format_duration;
//!
//! assert_eq!(format_duration(Duration::from_secs(3665)), "1h 1m 5s");
//! # }
//! ```

pub mod format;
pub mod interval;

// Re-export commonly used items
pub use format::format_duration;
pub use interval::{interval, Interval, IntervalConfig};
