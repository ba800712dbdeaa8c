//! HTTP handlers: generic resource CRUD and the analytics proxy.

pub mod analytics;
pub mod resource;
