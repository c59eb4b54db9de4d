use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use dbdump_core::{Error, MANIFEST_VERSION, RedactedConnection, Result, TableDescriptor};

/// Index of an artifact: what was dumped and how to load it back.
///
/// Descriptors are embedded so a restore is planned from the schema as it was
/// at export time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    pub manifest_version: String,
    /// Namespace every table belongs to.
    pub schema: String,
    /// RFC 3339 UTC timestamp of the export snapshot.
    pub created_at: String,
    /// Tables in restore order.
    pub tables: Vec<ManifestTable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ManifestTable {
    pub descriptor: TableDescriptor,
    pub file: DataFile,
}

/// Recorded facts about one flat file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DataFile {
    /// Path relative to the artifact root.
    pub path: String,
    pub row_count: u64,
    /// Hex-encoded SHA-256 of the file contents.
    pub sha256: String,
}

/// Provenance written next to the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub run_id: String,
    pub created_at: String,
    pub tool_version: String,
    pub database: Option<String>,
    pub source: RedactedConnection,
    pub warnings: Vec<String>,
}

impl Manifest {
    pub fn new(schema: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            manifest_version: MANIFEST_VERSION.to_string(),
            schema: schema.into(),
            created_at: created_at.into(),
            tables: Vec::new(),
        }
    }

    /// Read `manifest.json`, rejecting unknown contract versions.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::MissingArtifact(path.to_path_buf()),
            _ => Error::Io(err),
        })?;
        let manifest: Manifest = serde_json::from_slice(&contents)?;
        if manifest.manifest_version != MANIFEST_VERSION {
            return Err(Error::SchemaMismatch(format!(
                "manifest version `{}` is not supported (expected `{MANIFEST_VERSION}`)",
                manifest.manifest_version
            )));
        }
        Ok(manifest)
    }

    pub fn descriptors(&self) -> Vec<TableDescriptor> {
        self.tables
            .iter()
            .map(|table| table.descriptor.clone())
            .collect()
    }

    pub fn table(&self, name: &str) -> Option<&ManifestTable> {
        self.tables
            .iter()
            .find(|table| table.descriptor.name == name)
    }
}

/// JSON Schema of `manifest.json`.
pub fn manifest_json_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(Manifest);
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
}
