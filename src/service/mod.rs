//! ResourceService: generic CRUD over a store, plus request validation.

mod crud;
mod validation;
pub use crud::ResourceService;
pub use validation::RequestValidator;
