//! Generation domain module - turns tx3 sources into target-language bindings
//!
//! Inputs are resolved from glob patterns, a [`GenerationRequest`] is derived
//! from the sanitized configuration, and the [`GenerationCoordinator`] decides
//! when the external generator actually runs.

pub mod coordinator;
pub mod errors;
pub mod guard;
pub mod inputs;
pub mod request;
pub mod traits;
pub mod types;

pub use coordinator::*;
pub use errors::*;
pub use guard::*;
pub use inputs::InputMatcher;
pub use request::*;
pub use traits::*;
pub use types::*;
