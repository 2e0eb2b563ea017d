//! Macro for implementing Display and FromStr for status enums
//!
//! Status enums (such as the cost refresher state) are logged and exposed in
//! snapshots as lowercase strings. This macro generates both directions of
//! that conversion from a single mapping.
//!
//! # Example
//!
//! ```rust
//! use quill_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum LoopState {
//!     Idle,
//!     Running,
//! }
//!
//! impl_domain_status_conversions!(LoopState {
//!     Idle => "idle",
//!     Running => "running",
//! });
//!
//! assert_eq!(LoopState::Running.to_string(), "running");
//! assert_eq!("IDLE".parse::<LoopState>(), Ok(LoopState::Idle));
//! ```

/// Implements Display and FromStr traits for status enums
///
/// - Display writes the mapped string
/// - FromStr parses case-insensitively and reports the enum name on failure
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
