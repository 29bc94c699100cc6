//! Shared utilities for Advisor Chat packages.

pub mod logger;
pub mod time;
