//! Shared helpers for package staging.

pub mod fs;
