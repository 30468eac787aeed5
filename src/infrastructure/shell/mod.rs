//! Process execution for the binding generator

pub mod command_executor;

pub use command_executor::*;
