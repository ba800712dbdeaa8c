//! Process-wide configuration: built once at startup from the environment, then read-only.

pub mod types;
pub mod loader;
pub mod validator;

pub use types::*;
pub use loader::*;
pub use validator::*;
