//! The schema context queries are verified against.
//!
//! A [`SchemaCatalog`] is the read-only table/column snapshot used for one
//! verification. A [`SchemaCatalogProvider`] hands out snapshots and owns the
//! refresh policy; the engine itself never caches one.

pub mod provider;
pub mod schema;

pub use provider::{SchemaCatalogProvider, StaticCatalog};
pub use schema::SchemaCatalog;
