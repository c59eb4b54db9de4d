use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use dbdump_core::{Error, Result};
use dbdump_plan::{copy_out_statement, count_statement};

use crate::exporter::{BulkExporter, ExportRequest};

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

/// Exports tables with `COPY ... TO STDOUT` inside one read-only
/// repeatable-read transaction. Row counts come from the same snapshot.
pub struct PgBulkExporter {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgBulkExporter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }
}

#[async_trait]
impl BulkExporter for PgBulkExporter {
    async fn begin_snapshot(&mut self) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let conn: &mut sqlx::PgConnection = &mut tx;
        // A plain `&str` without arguments is sent via the simple query
        // protocol, same as `raw_sql`, but avoids a higher-ranked `Send`
        // inference failure inside `#[async_trait]`.
        sqlx::Executor::execute(conn, "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .await
            .map_err(db_error)?;
        self.tx = Some(tx);
        Ok(())
    }

    async fn export_table(&mut self, request: ExportRequest<'_>) -> Result<u64> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| Error::Db("export snapshot has not been started".to_string()))?;

        let count = count_statement(request.schema, request.descriptor);
        let rows: i64 = sqlx::query_scalar(&count)
            .fetch_one(&mut **tx)
            .await
            .map_err(db_error)?;
        let rows = u64::try_from(rows)
            .map_err(|_| Error::Db(format!("row count {rows} is negative")))?;

        let statement = copy_out_statement(request.schema, request.descriptor);
        debug!(event = "copy_out", table = %request.descriptor.name, statement = %statement);

        let mut file = tokio::fs::File::create(request.destination).await?;
        let mut stream = tx.copy_out_raw(&statement).await.map_err(db_error)?;
        let mut bytes = 0u64;
        while let Some(chunk) = stream.try_next().await.map_err(db_error)? {
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        debug!(event = "copy_out_finished", table = %request.descriptor.name, rows, bytes);
        Ok(rows)
    }

    async fn finish_snapshot(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(db_error)?;
        }
        Ok(())
    }
}
