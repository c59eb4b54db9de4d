use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Point-in-time view of the tables in one namespace.
///
/// Produced by an introspection adapter; every list is sorted so that two
/// snapshots of the same schema compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub schema: String,
    pub tables: Vec<TableSchema>,
}

/// Ordinary table metadata relevant to dumping and restoring it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub primary_key: Vec<String>,
    /// User-defined triggers; internal constraint triggers are not listed.
    pub triggers: Vec<TriggerSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub ordinal_position: i16,
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub is_generated: bool,
    /// Sequence owned by this column (`serial` or identity), if any.
    pub sequence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSchema {
    pub name: String,
    pub enabled: bool,
    /// Firing mode while enabled.
    #[serde(default)]
    pub mode: TriggerMode,
}

/// When an enabled trigger fires relative to `session_replication_role`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Plain `ENABLE TRIGGER`; fires in origin and local sessions.
    #[default]
    Origin,
    /// `ENABLE ALWAYS TRIGGER`
    Always,
    /// `ENABLE REPLICA TRIGGER`
    Replica,
}

impl TriggerMode {
    pub fn keyword(self) -> &'static str {
        match self {
            TriggerMode::Origin => "",
            TriggerMode::Always => "ALWAYS ",
            TriggerMode::Replica => "REPLICA ",
        }
    }
}

impl SchemaSnapshot {
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|table| table.name == name)
    }
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn trigger(&self, name: &str) -> Option<&TriggerSchema> {
        self.triggers.iter().find(|trigger| trigger.name == name)
    }
}
