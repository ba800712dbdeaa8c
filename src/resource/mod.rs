//! Per-entity descriptors and the entity catalogue.

pub mod descriptor;
pub mod entities;

pub use descriptor::*;
pub use entities::*;
