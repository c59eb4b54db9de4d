//! Schema introspection adapters.

pub mod adapter;
pub mod postgres;

pub use adapter::Adapter;
pub use postgres::{PostgresAdapter, introspect_postgres};

pub use dbdump_core::SchemaSnapshot;
