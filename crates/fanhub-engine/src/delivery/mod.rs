//! Local delivery of envelopes to in-process connection handlers.

pub mod sink;
pub mod table;

pub use sink::ClientSink;
pub use table::DeliveryTable;
