//! Cadence Core - Foundational types for the Cadence scheduler
//!
//! This crate provides the types every other Cadence crate depends on:
//! - `ExecutionRank` - Per-type execution order value
//! - `InstanceId` - Unique participant instance identifiers
//! - Error types and Result alias

mod error;
mod id;
mod rank;

pub use error::{CadenceError, ConfigurationError, Result};
pub use id::InstanceId;
pub use rank::ExecutionRank;
