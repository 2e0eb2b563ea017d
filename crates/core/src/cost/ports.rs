//! Port interfaces for cost data

use async_trait::async_trait;
use quill_domain::{CostWindow, ServiceCost};
use thiserror::Error;

/// Why a cost fetch produced no data.
///
/// An empty result is not an error; it renders as "No cost data available".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CostError {
    #[error("cost request failed: {0}")]
    Transport(String),

    #[error("cost API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cost response could not be decoded: {0}")]
    Decode(String),

    #[error("cost request timed out")]
    Timeout,
}

/// Source of per-service billing amounts.
#[async_trait]
pub trait CostSource: Send + Sync {
    /// Amounts billed within `window`, one entry per service and billing
    /// period. A service may appear more than once.
    async fn costs_for_window(&self, window: CostWindow) -> Result<Vec<ServiceCost>, CostError>;
}
