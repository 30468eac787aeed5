//! Infrastructure layer - concrete implementations of domain ports

pub mod output;
pub mod shell;
pub mod watch;

pub use output::FileSystemOutputService;
pub use shell::*;
