//! Core contracts and helpers for dbdump.
//!
//! This crate defines the dump configuration, the schema snapshot captured
//! from the source database, the table descriptors derived from both, and the
//! error taxonomy shared by the export and restore crates.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod ident;
pub mod redaction;
pub mod registry;
pub mod snapshot;

pub use config::{DumpConfig, TableConfig, Visibility};
pub use descriptor::{
    ColumnDefaultOverride, ExcludedColumn, SequenceBinding, TableDescriptor, TriggerSuspension,
};
pub use error::{Error, Result};
pub use graph::dependency_order;
pub use ident::{Identifier, QualifiedName, quote_literal};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use registry::{RegistryReport, build_descriptors};
pub use snapshot::{ColumnSchema, SchemaSnapshot, TableSchema, TriggerMode, TriggerSchema};

/// Current contract version for `manifest.json` artifacts.
pub const MANIFEST_VERSION: &str = "1";
