use dbdump_core::{ColumnSchema, TableSchema, TriggerMode, TriggerSchema};

use super::queries::{RawColumn, RawTrigger};

pub fn map_columns(raw: Vec<RawColumn>) -> Vec<ColumnSchema> {
    let mut columns: Vec<ColumnSchema> = raw
        .into_iter()
        .map(|row| ColumnSchema {
            ordinal_position: row.ordinal_position,
            name: row.name,
            data_type: row.data_type,
            is_nullable: row.is_nullable,
            default: row.default_expr,
            is_generated: row.is_generated,
            sequence: row.sequence,
        })
        .collect();
    columns.sort_by_key(|column| column.ordinal_position);
    columns
}

pub fn map_triggers(raw: Vec<RawTrigger>) -> Vec<TriggerSchema> {
    let mut triggers: Vec<TriggerSchema> = raw
        .into_iter()
        .map(|row| {
            let mode = match row.state.as_str() {
                "A" => TriggerMode::Always,
                "R" => TriggerMode::Replica,
                _ => TriggerMode::Origin,
            };
            TriggerSchema {
                enabled: row.state != "D",
                name: row.name,
                mode,
            }
        })
        .collect();
    triggers.sort_by(|left, right| left.name.cmp(&right.name));
    triggers
}

pub fn table(
    name: String,
    columns: Vec<ColumnSchema>,
    primary_key: Vec<String>,
    triggers: Vec<TriggerSchema>,
) -> TableSchema {
    TableSchema {
        name,
        columns,
        primary_key,
        triggers,
    }
}
