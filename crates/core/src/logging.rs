//! Component-scoped logging handles.
//!
//! Each long-lived component receives a [`ComponentLog`] at construction
//! instead of reaching for a global logger. The handle carries a `tracing`
//! span named after the component, so every event emitted inside it is
//! tagged with `component = "<name>"` by the subscriber.

use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{Instrument, Span};

/// Named logging scope for one component.
#[derive(Debug, Clone)]
pub struct ComponentLog {
    component: &'static str,
    span: Span,
}

impl ComponentLog {
    /// Create a handle for `component`.
    ///
    /// Build these after the subscriber is installed; a span created before
    /// that stays disabled.
    pub fn new(component: &'static str) -> Self {
        Self { component, span: tracing::info_span!("component", component) }
    }

    /// Component name.
    pub fn name(&self) -> &'static str {
        self.component
    }

    /// Underlying span.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run `f` with the component span entered.
    pub fn in_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.span.in_scope(f)
    }

    /// Attach the component span to a future.
    pub fn instrument<F>(&self, future: F) -> Instrumented<F>
    where
        F: Future,
    {
        future.instrument(self.span.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_component_name() {
        let log = ComponentLog::new("telemetry");
        assert_eq!(log.name(), "telemetry");
        assert_eq!(log.in_scope(|| 2 + 2), 4);
    }
}
