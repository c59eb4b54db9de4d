use async_trait::async_trait;

use dbdump_core::{Result, SchemaSnapshot};

/// Trait implemented by database adapters that can introspect schemas.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Capture the tables, columns and triggers of one namespace.
    async fn introspect(&self, schema: &str) -> Result<SchemaSnapshot>;
}
