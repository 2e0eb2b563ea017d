//! Cost refresh state machine.
//!
//! ```text
//! Disabled (terminal)
//! FetchingInitial -> Cached | CachedStale
//! Cached | CachedStale -> Fetching -> Cached | CachedStale
//! ```
//!
//! A failed refresh keeps whatever fragment is cached. Only when nothing has
//! ever been cached does a failure render the "failed to fetch" fragment.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quill_domain::constants::{METRIC_COST_UPDATE_FAILURE, METRIC_COST_UPDATE_SUCCESS};
use quill_domain::{CostConfig, CostRefreshState, CostWindow, ServiceCost};
use tracing::{debug, error, info};

use super::ports::{CostError, CostSource};
use super::report::{self, CostReport, COST_WINDOWS};
use crate::instrument::{Counter, Meter};
use crate::logging::ComponentLog;
use crate::telemetry::TelemetryStorage;

/// Drives cost fetches and publishes the rendered fragment.
pub struct CostTracker {
    storage: Arc<TelemetryStorage>,
    source: Arc<dyn CostSource>,
    enabled: bool,
    allowed_services: BTreeSet<String>,
    request_timeout: Duration,
    success: Counter,
    failure: Counter,
    log: ComponentLog,
}

impl std::fmt::Debug for CostTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostTracker")
            .field("enabled", &self.enabled)
            .field("allowed_services", &self.allowed_services)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CostTracker {
    pub fn new(
        storage: Arc<TelemetryStorage>,
        source: Arc<dyn CostSource>,
        config: &CostConfig,
        meter: &Meter,
        log: ComponentLog,
    ) -> Self {
        Self {
            storage,
            source,
            enabled: config.enabled,
            allowed_services: config.allowed_services.iter().cloned().collect(),
            request_timeout: config.request_timeout(),
            success: meter.counter(METRIC_COST_UPDATE_SUCCESS),
            failure: meter.counter(METRIC_COST_UPDATE_FAILURE),
            log,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> CostRefreshState {
        self.storage.cost().state()
    }

    /// Publish the static "disabled" fragment. No network access.
    pub fn render_disabled(&self) {
        let cache = self.storage.cost();
        cache.replace(report::disabled_fragment());
        cache.set_state(CostRefreshState::Disabled);
    }

    /// Run one refresh cycle and return the resulting state.
    pub async fn refresh(&self) -> CostRefreshState {
        self.refresh_at(Utc::now()).await
    }

    /// [`Self::refresh`] with an explicit render timestamp.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> CostRefreshState {
        self.log.instrument(self.run_cycle(now)).await
    }

    async fn run_cycle(&self, now: DateTime<Utc>) -> CostRefreshState {
        let cache = self.storage.cost();

        if !self.enabled {
            if cache.state() != CostRefreshState::Disabled {
                self.render_disabled();
                info!("cost tracking is disabled");
            }
            return CostRefreshState::Disabled;
        }

        let initial = !cache.has_fragment();
        cache.set_state(if initial {
            CostRefreshState::FetchingInitial
        } else {
            CostRefreshState::Fetching
        });

        let next = match self.fetch_report().await {
            Ok(report) => {
                cache.replace(report.render_table(now));
                self.success.add(1);
                debug!(services = report.services().count(), "cost data updated");
                CostRefreshState::Cached
            }
            Err(e) => {
                self.failure.add(1);
                if initial {
                    error!(error = %e, "failed to fetch initial cost data");
                    cache.replace(report::failure_fragment(now));
                } else {
                    error!(error = %e, "failed to fetch cost data, keeping previous report");
                }
                CostRefreshState::CachedStale
            }
        };

        cache.set_state(next);
        next
    }

    /// Put back `previous` if a refresh was dropped while still fetching.
    pub fn abandon_refresh(&self, previous: CostRefreshState) {
        let cache = self.storage.cost();
        if matches!(cache.state(), CostRefreshState::Fetching | CostRefreshState::FetchingInitial) {
            cache.set_state(previous);
            debug!(state = %previous, "cost refresh abandoned");
        }
    }

    /// Query every window and aggregate allow-listed services.
    ///
    /// # Errors
    /// Fails on the first window whose query fails or exceeds the request
    /// timeout.
    pub async fn fetch_report(&self) -> Result<CostReport, CostError> {
        let mut report = CostReport::new();
        for window in COST_WINDOWS {
            for cost in self.fetch_window(window).await? {
                if self.allowed_services.contains(&cost.service) {
                    report.add(window, &cost.service, cost.amount);
                }
            }
        }
        Ok(report)
    }

    async fn fetch_window(&self, window: CostWindow) -> Result<Vec<ServiceCost>, CostError> {
        tokio::time::timeout(self.request_timeout, self.source.costs_for_window(window))
            .await
            .map_err(|_| CostError::Timeout)?
    }
}
