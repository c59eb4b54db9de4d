use std::collections::BTreeSet;

use tracing::warn;

use crate::config::{DumpConfig, TableConfig, Visibility};
use crate::descriptor::{ExcludedColumn, SequenceBinding, TableDescriptor};
use crate::error::{Error, Result};
use crate::graph::dependency_order;
use crate::snapshot::{SchemaSnapshot, TableSchema, TriggerMode};

/// Descriptors in export order plus non-fatal findings.
#[derive(Debug, Clone)]
pub struct RegistryReport {
    pub schema: String,
    pub descriptors: Vec<TableDescriptor>,
    pub warnings: Vec<String>,
}

/// Derive the table descriptors for a dump from its configuration and a
/// snapshot of the live schema.
///
/// Tables come out in dependency order and columns in schema ordinal order,
/// so the result is identical for identical inputs. With `strict`, live tables
/// missing from the configuration are errors instead of warnings.
pub fn build_descriptors(
    config: &DumpConfig,
    snapshot: &SchemaSnapshot,
    strict: bool,
) -> Result<RegistryReport> {
    if config.schema != snapshot.schema {
        return Err(Error::SchemaIntrospection(format!(
            "snapshot covers schema `{}` but the configuration targets `{}`",
            snapshot.schema, config.schema
        )));
    }

    let mut warnings = Vec::new();
    for table in &snapshot.tables {
        if !config.tables.contains_key(&table.name) {
            let message = format!(
                "table `{}` exists in schema `{}` but is not configured and will not be dumped",
                table.name, snapshot.schema
            );
            if strict {
                return Err(Error::Configuration(message));
            }
            warn!(event = "table_not_configured", table = %table.name);
            warnings.push(message);
        }
    }

    let mut descriptors = Vec::with_capacity(config.tables.len());
    for name in dependency_order(config)? {
        let table_config = config
            .tables
            .get(&name)
            .ok_or_else(|| Error::Configuration(format!("unknown table `{name}`")))?;
        let table = snapshot.table(&name).ok_or_else(|| {
            Error::SchemaIntrospection(format!(
                "table `{name}` does not exist in schema `{}`",
                snapshot.schema
            ))
        })?;
        descriptors.push(describe_table(table, table_config)?);
    }

    Ok(RegistryReport {
        schema: snapshot.schema.clone(),
        descriptors,
        warnings,
    })
}

fn describe_table(table: &TableSchema, config: &TableConfig) -> Result<TableDescriptor> {
    check_file_name(&table.name)?;

    for column in config.columns.keys() {
        if table.column(column).is_none() {
            return Err(Error::SchemaIntrospection(format!(
                "column {}.{column} is configured but does not exist",
                table.name
            )));
        }
    }

    let mut live_columns: Vec<_> = table.columns.iter().collect();
    live_columns.sort_by_key(|column| column.ordinal_position);

    let mut columns = Vec::new();
    let mut excluded_columns = Vec::new();
    let mut sequences = Vec::new();

    for column in live_columns {
        let visibility = config.columns.get(&column.name).ok_or_else(|| {
            Error::Configuration(format!(
                "column {}.{} is not classified as public or private",
                table.name, column.name
            ))
        })?;

        match visibility {
            Visibility::Public => {
                if column.is_generated {
                    return Err(Error::Configuration(format!(
                        "column {}.{} is generated and cannot be public",
                        table.name, column.name
                    )));
                }
                columns.push(column.name.clone());
                if let Some(sequence) = &column.sequence {
                    sequences.push(SequenceBinding {
                        column: column.name.clone(),
                        sequence: sequence.clone(),
                    });
                }
            }
            Visibility::Private => excluded_columns.push(ExcludedColumn {
                name: column.name.clone(),
                nullable: column.is_nullable,
                generated: column.is_generated,
                schema_default: if column.is_generated {
                    None
                } else {
                    column.default.clone()
                },
            }),
        }
    }

    if columns.is_empty() {
        return Err(Error::Configuration(format!(
            "table `{}` has no public columns",
            table.name
        )));
    }

    let excluded: BTreeSet<&str> = excluded_columns.iter().map(|col| col.name.as_str()).collect();
    for column in config.column_defaults.keys() {
        if !excluded.contains(column.as_str()) {
            return Err(Error::Configuration(format!(
                "column_defaults for {}.{column} only applies to private columns",
                table.name
            )));
        }
    }

    for trigger_name in &config.load_triggers {
        let trigger = table.trigger(trigger_name).ok_or_else(|| {
            Error::SchemaIntrospection(format!(
                "load trigger `{trigger_name}` does not exist on table `{}`",
                table.name
            ))
        })?;
        if !trigger.enabled {
            return Err(Error::Configuration(format!(
                "load trigger `{trigger_name}` is disabled on table `{}`",
                table.name
            )));
        }
    }

    let mut disabled_triggers: Vec<String> = table
        .triggers
        .iter()
        .filter(|trigger| !trigger.enabled)
        .map(|trigger| trigger.name.clone())
        .collect();
    disabled_triggers.sort();
    let trigger_modes = table
        .triggers
        .iter()
        .filter(|trigger| trigger.enabled && trigger.mode != TriggerMode::Origin)
        .map(|trigger| (trigger.name.clone(), trigger.mode))
        .collect();

    Ok(TableDescriptor {
        name: table.name.clone(),
        columns,
        column_defaults: config.column_defaults.clone(),
        excluded_columns,
        primary_key: table.primary_key.clone(),
        filter: config.filter.clone(),
        load_triggers: config.load_triggers.clone(),
        disabled_triggers,
        trigger_modes,
        sequences,
    })
}

fn check_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(Error::Configuration(format!(
            "table name `{name}` cannot be used as a data file name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{ColumnSchema, TriggerSchema};

    fn column(position: i16, name: &str, nullable: bool) -> ColumnSchema {
        ColumnSchema {
            ordinal_position: position,
            name: name.to_string(),
            data_type: "text".to_string(),
            is_nullable: nullable,
            default: None,
            is_generated: false,
            sequence: None,
        }
    }

    fn snapshot() -> SchemaSnapshot {
        let mut users_id = column(1, "id", false);
        users_id.sequence = Some("public.users_id_seq".to_string());
        SchemaSnapshot {
            schema: "public".to_string(),
            tables: vec![
                TableSchema {
                    name: "crates".to_string(),
                    columns: vec![
                        column(3, "search_vector", false),
                        column(1, "id", false),
                        column(2, "name", false),
                    ],
                    primary_key: vec!["id".to_string()],
                    triggers: vec![
                        TriggerSchema {
                            name: "trigger_crates_tsvector_update".to_string(),
                            enabled: true,
                            mode: TriggerMode::Origin,
                        },
                        TriggerSchema {
                            name: "trigger_crates_audit".to_string(),
                            enabled: false,
                            mode: TriggerMode::Origin,
                        },
                        TriggerSchema {
                            name: "trigger_crates_replicate".to_string(),
                            enabled: true,
                            mode: TriggerMode::Replica,
                        },
                    ],
                },
                TableSchema {
                    name: "users".to_string(),
                    columns: vec![users_id, column(2, "login", false)],
                    primary_key: vec!["id".to_string()],
                    triggers: Vec::new(),
                },
            ],
        }
    }

    const CONFIG: &str = r#"
        [tables.users.columns]
        id = "public"
        login = "public"

        [tables.crates]
        dependencies = ["users"]
        load_triggers = ["trigger_crates_tsvector_update"]
        [tables.crates.columns]
        id = "public"
        name = "public"
        search_vector = "private"
        [tables.crates.column_defaults]
        search_vector = "''"
    "#;

    #[test]
    fn builds_descriptors_in_dependency_and_ordinal_order() {
        let config = DumpConfig::from_toml_str(CONFIG).expect("parse config");
        let report = build_descriptors(&config, &snapshot(), true).expect("build descriptors");

        let names: Vec<&str> = report.descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["users", "crates"]);

        let users = &report.descriptors[0];
        assert_eq!(users.columns, vec!["id", "login"]);
        assert_eq!(users.sequences[0].sequence, "public.users_id_seq");

        let crates = &report.descriptors[1];
        assert_eq!(crates.columns, vec!["id", "name"]);
        assert_eq!(crates.excluded_columns.len(), 1);
        assert_eq!(crates.excluded_columns[0].name, "search_vector");
        assert!(!crates.excluded_columns[0].nullable);
        assert_eq!(crates.disabled_triggers, vec!["trigger_crates_audit"]);
        assert_eq!(
            crates.trigger_modes.get("trigger_crates_replicate"),
            Some(&TriggerMode::Replica)
        );
        assert_eq!(crates.trigger_modes.len(), 1
        );
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unclassified_column_is_a_configuration_error() {
        let config = DumpConfig::from_toml_str(
            r#"
            [tables.users.columns]
            id = "public"
            "#,
        )
        .expect("parse config");
        let err = build_descriptors(&config, &snapshot(), false).unwrap_err();
        assert!(err.is_configuration(), "unexpected error: {err}");
        assert!(err.to_string().contains("users.login"));
    }

    #[test]
    fn vanished_table_is_an_introspection_error() {
        let config = DumpConfig::from_toml_str(
            r#"
            [tables.owners.columns]
            id = "public"
            "#,
        )
        .expect("parse config");
        let err = build_descriptors(&config, &snapshot(), false).unwrap_err();
        assert!(matches!(err, Error::SchemaIntrospection(_)));
    }

    #[test]
    fn vanished_column_is_an_introspection_error() {
        let config = DumpConfig::from_toml_str(
            r#"
            [tables.users.columns]
            id = "public"
            login = "public"
            email = "private"
            "#,
        )
        .expect("parse config");
        let err = build_descriptors(&config, &snapshot(), false).unwrap_err();
        assert!(matches!(err, Error::SchemaIntrospection(_)));
    }

    #[test]
    fn unconfigured_tables_warn_unless_strict() {
        let config = DumpConfig::from_toml_str(
            r#"
            [tables.users.columns]
            id = "public"
            login = "public"
            "#,
        )
        .expect("parse config");

        let report = build_descriptors(&config, &snapshot(), false).expect("lenient build");
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("crates"));

        let err = build_descriptors(&config, &snapshot(), true).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn disabled_load_trigger_is_rejected() {
        let config = DumpConfig::from_toml_str(&CONFIG.replace(
            "load_triggers = [\"trigger_crates_tsvector_update\"]",
            "load_triggers = [\"trigger_crates_audit\"]",
        ))
        .expect("parse config");
        let err = build_descriptors(&config, &snapshot(), false).unwrap_err();
        assert!(err.is_configuration(), "unexpected error: {err}");
    }

    #[test]
    fn defaults_for_public_columns_are_rejected() {
        let config = DumpConfig::from_toml_str(&CONFIG.replace(
            "search_vector = \"''\"",
            "name = \"'unnamed'\"",
        ))
        .expect("parse config");
        let err = build_descriptors(&config, &snapshot(), false).unwrap_err();
        assert!(err.to_string().contains("crates.name"));
    }
}
