//! External cost report: fetch, aggregate and render.
//!
//! [`CostTracker`] owns the refresh state machine and writes the rendered
//! fragment into the telemetry store's cost cache. The timer that drives it
//! lives in `quill-infra`.

pub mod ports;
pub mod report;
pub mod tracker;

pub use ports::{CostError, CostSource};
pub use report::CostReport;
pub use tracker::CostTracker;
