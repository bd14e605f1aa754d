//! Bookstore: generic CRUD-over-relation REST engine.
//!
//! A schema descriptor names entity tables and the link tables joining them; every entity gets
//! create/read/list/update/delete plus relation count/list routes, with idempotent link upserts.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use bootstrap::{bootstrap, Seed, SeedReport};
pub use config::{resolve, FullConfig, ResolvedEntity, ResolvedModel};
pub use error::{AppError, ConfigError};
pub use routes::{app, common_routes_with_ready, entity_routes};
pub use service::{CrudService, Fetched, RelationEngine};
pub use settings::Settings;
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Record, Store, UpdateOutcome};
