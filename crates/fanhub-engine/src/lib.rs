//! # fanhub-engine
//!
//! Distributed presence-and-fanout engine for FanHub. Provides:
//!
//! - Client registration with time-scored presence pings
//! - Channel subscriptions with Bayeux-style wildcard patterns
//! - Cross-process message fanout over the store's pub/sub side
//! - Local delivery sinks for in-process connection handlers
//! - Periodic reconciliation sweeps that evict silent clients

pub mod channel;
pub mod delivery;
pub mod engine;
pub mod listener;
pub mod metrics;
pub mod subscriptions;
pub mod sweeper;

pub use delivery::table::DeliveryTable;
pub use engine::Engine;
pub use metrics::EngineMetrics;
pub use subscriptions::SubscriptionIndex;
pub use sweeper::SweepOutcome;
