use std::collections::BTreeSet;

use dbdump_artifact::Manifest;
use dbdump_core::{Error, Result, SchemaSnapshot, TableDescriptor, TriggerMode};

/// Check that the target schema can receive the artifact unchanged.
///
/// Every dumped table must exist with all the columns it had at export time
/// (loaded plus excluded). Columns added since then are accepted as long as
/// the load can fill them. Load triggers must exist and be enabled.
pub fn check_target_compatibility(manifest: &Manifest, target: &SchemaSnapshot) -> Result<()> {
    if manifest.schema != target.schema {
        return Err(Error::SchemaMismatch(format!(
            "artifact holds schema `{}` but the target is `{}`",
            manifest.schema, target.schema
        )));
    }

    for entry in &manifest.tables {
        check_table(&entry.descriptor, target)?;
    }
    Ok(())
}

fn check_table(descriptor: &TableDescriptor, target: &SchemaSnapshot) -> Result<()> {
    let table = target.table(&descriptor.name).ok_or_else(|| {
        Error::SchemaMismatch(format!(
            "table `{}` does not exist in the target",
            descriptor.name
        ))
    })?;

    let expected: BTreeSet<&str> = descriptor
        .columns
        .iter()
        .map(String::as_str)
        .chain(descriptor.excluded_columns.iter().map(|c| c.name.as_str()))
        .collect();
    if let Some(missing) = expected.iter().find(|name| table.column(name).is_none()) {
        return Err(Error::SchemaMismatch(format!(
            "column {}.{missing} does not exist in the target",
            descriptor.name
        )));
    }
    for column in &table.columns {
        let unfilled = !column.is_nullable && column.default.is_none() && !column.is_generated;
        if unfilled && !expected.contains(column.name.as_str()) {
            return Err(Error::SchemaMismatch(format!(
                "column {}.{} is NOT NULL without a default in the target but not in the artifact",
                descriptor.name, column.name
            )));
        }
    }

    for column in &descriptor.columns {
        if table.column(column).is_some_and(|c| c.is_generated) {
            return Err(Error::SchemaMismatch(format!(
                "column {}.{column} is generated in the target and cannot be loaded",
                descriptor.name
            )));
        }
    }

    for trigger in &descriptor.load_triggers {
        match table.trigger(trigger) {
            None => {
                return Err(Error::SchemaMismatch(format!(
                    "load trigger `{trigger}` does not exist on target table `{}`",
                    descriptor.name
                )));
            }
            Some(found) if !found.enabled => {
                return Err(Error::SchemaMismatch(format!(
                    "load trigger `{trigger}` is disabled on target table `{}`",
                    descriptor.name
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Replace the trigger and default state recorded at export time with the
/// target's, so the restore leaves the target schema as it found it.
pub(crate) fn adopt_target_state(descriptors: &mut [TableDescriptor], target: &SchemaSnapshot) {
    for descriptor in descriptors {
        let Some(table) = target.table(&descriptor.name) else {
            continue;
        };
        descriptor.disabled_triggers = table
            .triggers
            .iter()
            .filter(|trigger| !trigger.enabled)
            .map(|trigger| trigger.name.clone())
            .collect();
        descriptor.disabled_triggers.sort();
        descriptor.trigger_modes = table
            .triggers
            .iter()
            .filter(|trigger| trigger.enabled && trigger.mode != TriggerMode::Origin)
            .map(|trigger| (trigger.name.clone(), trigger.mode))
            .collect();

        for excluded in &mut descriptor.excluded_columns {
            if let Some(column) = table.column(&excluded.name) {
                excluded.generated = column.is_generated;
                excluded.schema_default = if column.is_generated {
                    None
                } else {
                    column.default.clone()
                };
            }
        }
    }
}
