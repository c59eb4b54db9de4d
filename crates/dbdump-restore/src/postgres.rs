use std::path::Path;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::io::AsyncReadExt;

use dbdump_core::{Error, Result};

use crate::target::RestoreTransaction;

const COPY_CHUNK: usize = 64 * 1024;

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

/// A Postgres transaction held for the whole restore.
pub struct PgRestoreTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgRestoreTransaction {
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        let tx = pool.begin().await.map_err(db_error)?;
        Ok(Self { tx })
    }
}

#[async_trait]
impl RestoreTransaction for PgRestoreTransaction {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        let conn: &mut sqlx::PgConnection = &mut self.tx;
        // A plain `&str` without arguments is sent via the simple query
        // protocol, same as `raw_sql`, but avoids a higher-ranked `Send`
        // inference failure inside `#[async_trait]`.
        sqlx::Executor::execute(conn, sql)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn copy_in(&mut self, statement: &str, file: &Path) -> Result<u64> {
        let mut source = tokio::fs::File::open(file).await?;
        let mut copy = self.tx.copy_in_raw(statement).await.map_err(db_error)?;
        let mut buffer = vec![0u8; COPY_CHUNK];

        loop {
            let read = match source.read(&mut buffer).await {
                Ok(read) => read,
                Err(err) => {
                    copy.abort(format!("reading {}: {err}", file.display()))
                        .await
                        .ok();
                    return Err(err.into());
                }
            };
            if read == 0 {
                break;
            }
            copy.send(&buffer[..read]).await.map_err(db_error)?;
        }

        copy.finish().await.map_err(db_error)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(db_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(db_error)
    }
}
