//! # fanhub-store
//!
//! Presence store implementations for FanHub. Supports two backends:
//!
//! - **memory**: Single-process store for development and tests
//! - **redis**: Shared store using the [redis](https://crates.io/crates/redis) crate
//!
//! The backend is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::StoreManager;
