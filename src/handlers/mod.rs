//! HTTP handlers for entity CRUD and relations.

pub mod entity;
pub use entity::*;
