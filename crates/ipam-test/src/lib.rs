//! Test infrastructure for address-space reconcilers
//!
//! Provides:
//! - In-memory inventory service with fault injection
//! - Seed fixtures for common inventory layouts
//! - Call log verification helpers

mod fake;
pub mod fixtures;
mod verification;

pub use fake::FakeInventory;
pub use verification::*;
