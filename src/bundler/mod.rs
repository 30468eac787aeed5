//! Bundler adapter: build hooks, alias wiring and dev-server watching

pub mod alias;
pub mod dev_session;
pub mod plugin;
pub mod traits;

pub use alias::*;
pub use dev_session::*;
pub use plugin::*;
pub use traits::*;
