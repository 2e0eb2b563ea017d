//! Article content access.

pub mod ports;
