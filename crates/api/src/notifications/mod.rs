//! Event-to-client relay.
//!
//! The [`RelayRouter`] subscribes to the event bus and fans every
//! [`DomainEvent`](estate_events::DomainEvent) out to connected clients.

pub mod router;

pub use router::RelayRouter;
