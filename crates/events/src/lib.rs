//! EstatePro event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`]: the event envelope pushed to connected clients.
//!
//! Events are fire-and-forget: nothing is persisted, and a subscriber that
//! falls behind simply misses events. Clients re-fetch state on reconnect.

pub mod bus;

pub use bus::{DomainEvent, EventBus, DATA_UPDATED};
