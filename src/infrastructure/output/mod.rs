//! Output directory implementations

pub mod filesystem_output;

pub use filesystem_output::*;
