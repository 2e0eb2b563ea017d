//! Middleware applied to the public content routes.
//!
//! Layer order, outermost first: [`track_request`] then [`guard_request`].
//! Blocked requests are therefore still timed and traced.

mod guard;
mod tracking;

pub use guard::{guard_request, inspect_request, Rejection};
pub use tracking::{request_span, track_request};
