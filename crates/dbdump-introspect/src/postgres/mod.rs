use sqlx::PgPool;
use tracing::debug;

use dbdump_core::{Result, SchemaSnapshot};

use crate::adapter::Adapter;

mod mapper;
mod queries;

pub use queries::fetch_database_name;

/// Adapter for PostgreSQL databases.
#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
}

impl PostgresAdapter {
    /// Create a new adapter using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Adapter for PostgresAdapter {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn introspect(&self, schema: &str) -> Result<SchemaSnapshot> {
        introspect_postgres(&self.pool, schema).await
    }
}

/// Introspect the ordinary and partitioned tables of a Postgres schema.
pub async fn introspect_postgres(pool: &PgPool, schema: &str) -> Result<SchemaSnapshot> {
    let mut tables = Vec::new();

    for name in queries::list_tables(pool, schema).await? {
        let columns = mapper::map_columns(queries::list_columns(pool, schema, &name).await?);
        let primary_key = queries::get_primary_key(pool, schema, &name).await?;
        let triggers = mapper::map_triggers(queries::list_triggers(pool, schema, &name).await?);

        debug!(
            event = "table_introspected",
            table = %name,
            columns = columns.len(),
            triggers = triggers.len()
        );

        tables.push(mapper::table(name, columns, primary_key, triggers));
    }

    tables.sort_by(|left, right| left.name.cmp(&right.name));

    Ok(SchemaSnapshot {
        schema: schema.to_string(),
        tables,
    })
}
