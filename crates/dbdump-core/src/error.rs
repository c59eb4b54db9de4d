use std::path::PathBuf;

use thiserror::Error;

/// Core error type shared across dbdump crates.
///
/// Configuration and planning errors are raised before any database is
/// touched; artifact errors are raised before a restore transaction starts.
#[derive(Debug, Error)]
pub enum Error {
    /// The dump configuration is inconsistent or incomplete.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// An excluded `NOT NULL` column has no default to load with.
    #[error(
        "configuration error: column {table}.{column} is excluded from the dump and NOT NULL, \
         but has no entry in column_defaults"
    )]
    MissingDefault { table: String, column: String },
    /// A configured table, column or trigger does not exist in the live schema.
    #[error("schema introspection error: {0}")]
    SchemaIntrospection(String),
    /// A file the artifact declares is absent.
    #[error("missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),
    /// The artifact does not match the descriptor or target schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// Artifact content differs from what the manifest recorded.
    #[error("artifact integrity error: {0}")]
    ArtifactIntegrity(String),
    /// Database error or adapter failure.
    #[error("database error: {0}")]
    Db(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Returns true for errors detected before any I/O against a database.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::MissingDefault { .. })
    }
}

/// Convenience alias for results returned by dbdump crates.
pub type Result<T> = std::result::Result<T, Error>;
