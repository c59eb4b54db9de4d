use std::path::Path;

use async_trait::async_trait;

use dbdump_core::{Result, TableDescriptor};

/// One table extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub schema: &'a str,
    pub descriptor: &'a TableDescriptor,
    /// File to create; it must hold a header row followed by the rows.
    pub destination: &'a Path,
}

/// Produces flat CSV files from a database.
///
/// All tables exported between `begin_snapshot` and `finish_snapshot` must
/// observe the same point in time.
#[async_trait]
pub trait BulkExporter: Send {
    async fn begin_snapshot(&mut self) -> Result<()>;

    /// Write the included columns of one table; returns the number of rows
    /// the database exported.
    async fn export_table(&mut self, request: ExportRequest<'_>) -> Result<u64>;

    async fn finish_snapshot(&mut self) -> Result<()>;
}
