//! Cost report API adapter.

pub mod client;

pub use client::HttpCostSource;
