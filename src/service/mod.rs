//! CrudService: generic CRUD and relation operations over a `Store`.

mod crud;
mod relation;
mod validation;
pub use crud::{CrudService, Fetched};
pub use relation::RelationEngine;
pub use validation::RequestValidator;
