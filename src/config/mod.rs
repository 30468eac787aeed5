//! Plugin configuration: user options and the sanitized generation config

pub mod options;
pub mod sanitizer;

pub use options::*;
pub use sanitizer::*;
