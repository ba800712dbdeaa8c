//! Filter translation and the store-facing query shape.

pub mod filter;
pub mod select;

pub use filter::*;
pub use select::*;
