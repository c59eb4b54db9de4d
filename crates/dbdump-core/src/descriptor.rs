use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::snapshot::TriggerMode;

/// Everything needed to export one table and load it back.
///
/// `columns` is the exact column order of the table's flat file. Descriptors
/// are built once per export and embedded in the artifact manifest, so a
/// restore never depends on the schema at restore time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    /// Literal default expression per excluded column.
    #[serde(default)]
    pub column_defaults: BTreeMap<String, String>,
    #[serde(default)]
    pub excluded_columns: Vec<ExcludedColumn>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Triggers kept enabled while rows are loaded.
    #[serde(default)]
    pub load_triggers: Vec<String>,
    /// Triggers that were disabled in the source database.
    #[serde(default)]
    pub disabled_triggers: Vec<String>,
    /// Enabled triggers firing in a mode other than origin.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub trigger_modes: BTreeMap<String, TriggerMode>,
    #[serde(default)]
    pub sequences: Vec<SequenceBinding>,
}

/// A column whose value is never written to the flat file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExcludedColumn {
    pub name: String,
    pub nullable: bool,
    #[serde(default)]
    pub generated: bool,
    /// Default declared by the schema itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_default: Option<String>,
}

/// Sequence owned by an included column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SequenceBinding {
    pub column: String,
    pub sequence: String,
}

/// Temporary default installed for an excluded `NOT NULL` column during load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefaultOverride {
    pub table: String,
    pub column: String,
    pub expression: String,
    /// Default to reinstall afterwards; `None` drops the default.
    pub previous: Option<String>,
}

/// Per-table trigger handling for the duration of truncate and load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSuspension {
    pub table: String,
    /// Re-enabled after truncation, before load.
    pub keep_enabled: Vec<String>,
    /// Disabled again after all triggers are re-enabled.
    pub restore_disabled: Vec<String>,
    /// Switched back to their recorded firing mode after re-enabling.
    pub restore_modes: BTreeMap<String, TriggerMode>,
}

impl TableDescriptor {
    /// Relative path of this table's flat file inside an artifact.
    pub fn data_file(&self) -> String {
        format!("data/{}.csv", self.name)
    }

    pub fn excluded(&self, column: &str) -> Option<&ExcludedColumn> {
        self.excluded_columns.iter().find(|col| col.name == column)
    }
}
