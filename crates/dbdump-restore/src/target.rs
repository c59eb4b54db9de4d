use std::path::Path;

use async_trait::async_trait;

use dbdump_core::Result;

/// An open transaction on the restore target.
///
/// Nothing executed through it is visible to other sessions before
/// [`commit`](RestoreTransaction::commit). Dropping it without committing
/// must roll back.
#[async_trait]
pub trait RestoreTransaction: Send {
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Stream `file` into a `COPY ... FROM STDIN` statement; returns rows loaded.
    async fn copy_in(&mut self, statement: &str, file: &Path) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
