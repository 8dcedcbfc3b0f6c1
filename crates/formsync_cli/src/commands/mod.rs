//! CLI command implementations.

pub mod reduce;
pub mod report;
pub mod simulate;
