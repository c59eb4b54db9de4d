use dbdump_core::ident::column_list;
use dbdump_core::{Identifier, QualifiedName, TriggerMode, quote_literal};

/// One step of a restore plan.
///
/// Identifiers are held as [`Identifier`]s and only quoted when rendered.
/// Default expressions come from the dump configuration and are rendered
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    DisableAllTriggers {
        table: QualifiedName,
    },
    DisableTrigger {
        table: QualifiedName,
        trigger: Identifier,
    },
    EnableTrigger {
        table: QualifiedName,
        trigger: Identifier,
    },
    EnableAllTriggers {
        table: QualifiedName,
    },
    /// Re-enable a trigger with an explicit firing mode.
    SetTriggerMode {
        table: QualifiedName,
        trigger: Identifier,
        mode: TriggerMode,
    },
    SetDefault {
        table: QualifiedName,
        column: Identifier,
        expression: String,
    },
    DropDefault {
        table: QualifiedName,
        column: Identifier,
    },
    Truncate {
        tables: Vec<QualifiedName>,
    },
    Load(LoadStatement),
    ResetSequence {
        table: QualifiedName,
        column: Identifier,
        sequence: String,
    },
}

/// Bulk load of one flat file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStatement {
    pub table: QualifiedName,
    /// Unqualified table name, as used in the manifest.
    pub table_name: String,
    pub columns: Vec<String>,
    /// Flat file path relative to the artifact root.
    pub file: String,
}

impl Statement {
    /// Render for execution over a database connection. Loads read from STDIN.
    pub fn to_sql(&self) -> String {
        match self {
            Statement::DisableAllTriggers { table } => {
                format!("ALTER TABLE {table} DISABLE TRIGGER ALL;")
            }
            Statement::DisableTrigger { table, trigger } => {
                format!("ALTER TABLE {table} DISABLE TRIGGER {trigger};")
            }
            Statement::EnableTrigger { table, trigger } => {
                format!("ALTER TABLE {table} ENABLE TRIGGER {trigger};")
            }
            Statement::EnableAllTriggers { table } => {
                format!("ALTER TABLE {table} ENABLE TRIGGER ALL;")
            }
            Statement::SetTriggerMode {
                table,
                trigger,
                mode,
            } => format!("ALTER TABLE {table} ENABLE {}TRIGGER {trigger};", mode.keyword()),
            Statement::SetDefault {
                table,
                column,
                expression,
            } => format!("ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT {expression};"),
            Statement::DropDefault { table, column } => {
                format!("ALTER TABLE {table} ALTER COLUMN {column} DROP DEFAULT;")
            }
            Statement::Truncate { tables } => {
                let tables: Vec<String> = tables.iter().map(ToString::to_string).collect();
                format!("TRUNCATE {} RESTART IDENTITY CASCADE;", tables.join(", "))
            }
            Statement::Load(load) => format!(
                "COPY {} ({}) FROM STDIN WITH (FORMAT csv, HEADER true)",
                load.table,
                column_list(load.columns.iter().map(String::as_str))
            ),
            Statement::ResetSequence {
                table,
                column,
                sequence,
            } => format!(
                "SELECT setval({}::regclass, COALESCE(MAX({column}), 0) + 1, false) FROM {table};",
                quote_literal(sequence)
            ),
        }
    }

    /// Render for a psql script run from the artifact root.
    pub fn to_psql(&self) -> String {
        match self {
            Statement::Load(load) => format!(
                "\\copy {} ({}) FROM {} WITH CSV HEADER",
                load.table,
                column_list(load.columns.iter().map(String::as_str)),
                quote_literal(&load.file)
            ),
            other => other.to_sql(),
        }
    }

    pub fn as_load(&self) -> Option<&LoadStatement> {
        match self {
            Statement::Load(load) => Some(load),
            _ => None,
        }
    }
}
