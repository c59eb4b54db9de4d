//! Export coordination: drive a bulk-export collaborator over every table
//! and assemble the resulting flat files into a restorable artifact.

pub mod coordinator;
pub mod exporter;
pub mod postgres;

pub use coordinator::{ExportOptions, ExportSummary, export_dump};
pub use exporter::{BulkExporter, ExportRequest};
pub use postgres::PgBulkExporter;
