//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Test configuration
//! - Server fixtures sharing one in-process broker
//! - Socket client helpers

pub mod fixtures;
pub mod socket;

// Re-export commonly used utilities
pub use fixtures::*;
pub use socket::*;
