//! Cost report types.

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Look-back window for a cost query, in whole days ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CostWindow {
    pub days: u32,
}

impl CostWindow {
    pub const fn days(days: u32) -> Self {
        Self { days }
    }

    /// Column label, e.g. `7d`.
    pub fn label(&self) -> String {
        format!("{}d", self.days)
    }
}

/// Amount billed to one service within a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCost {
    pub service: String,
    pub amount: f64,
}

impl ServiceCost {
    pub fn new(service: impl Into<String>, amount: f64) -> Self {
        Self { service: service.into(), amount }
    }
}

/// Lifecycle of the cost refresher.
///
/// `Disabled` is terminal. Every other state eventually re-arms the refresh
/// timer; there is no error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostRefreshState {
    Disabled,
    FetchingInitial,
    Fetching,
    Cached,
    CachedStale,
}

impl_domain_status_conversions!(CostRefreshState {
    Disabled => "disabled",
    FetchingInitial => "fetching_initial",
    Fetching => "fetching",
    Cached => "cached",
    CachedStale => "cached_stale",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_label() {
        assert_eq!(CostWindow::days(30).label(), "30d");
    }

    #[test]
    fn state_round_trips_through_strings() {
        assert_eq!(CostRefreshState::CachedStale.to_string(), "cached_stale");
        assert_eq!(
            "FETCHING_INITIAL".parse::<CostRefreshState>(),
            Ok(CostRefreshState::FetchingInitial)
        );
    }
}
