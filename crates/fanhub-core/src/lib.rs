//! # fanhub-core
//!
//! Core crate for FanHub. Contains traits, configuration schemas, client
//! identifier generation, the message envelope, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other FanHub crates.

pub mod config;
pub mod error;
pub mod ident;
pub mod logging;
pub mod message;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
