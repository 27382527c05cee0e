//! Shared observability plumbing for the `resilient-http` crate family.
//!
//! Each of `resilient-http-retry`, `resilient-http-circuitbreaker`,
//! `resilient-http-ratelimiter` and `resilient-http-timelimiter` emits its
//! own event enum through this module's panic-isolated listener dispatch, so
//! a misbehaving callback in one layer can never take down another.

pub mod events;

pub use events::{ClientEvent, EventListener, EventListeners, FnListener};
