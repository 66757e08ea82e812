//! CLI command implementations.

pub mod check;
pub mod keys;
pub mod migrate;
pub mod serve;
