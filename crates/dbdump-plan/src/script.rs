use dbdump_artifact::{ArtifactLayout, Manifest, validate_artifact};
use dbdump_core::{Error, Result};

use crate::phase::Phase;
use crate::planner::RestorePlan;

/// A rendered restore script whose artifact has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreScript {
    pub text: String,
}

/// Check that `plan` and the artifact agree, then render the script.
///
/// Every flat file must exist and carry exactly the declared header; nothing
/// is rendered otherwise.
pub fn generate_restore_script(
    plan: &RestorePlan,
    layout: &ArtifactLayout,
    manifest: &Manifest,
) -> Result<RestoreScript> {
    check_plan_matches_manifest(plan, manifest)?;
    validate_artifact(layout, manifest)?;
    Ok(RestoreScript {
        text: render_restore_script(plan),
    })
}

pub(crate) fn check_plan_matches_manifest(plan: &RestorePlan, manifest: &Manifest) -> Result<()> {
    if plan.schema() != manifest.schema {
        return Err(Error::SchemaMismatch(format!(
            "plan targets schema `{}` but the artifact holds `{}`",
            plan.schema(),
            manifest.schema
        )));
    }

    for load in plan.loads() {
        let table = manifest.table(&load.table_name).ok_or_else(|| {
            Error::MissingArtifact(load.file.clone().into())
        })?;
        if table.descriptor.columns != load.columns {
            return Err(Error::SchemaMismatch(format!(
                "table `{}` loads {} columns but the artifact declares {}",
                load.table_name,
                load.columns.len(),
                table.descriptor.columns.len()
            )));
        }
        if table.file.path != load.file {
            return Err(Error::SchemaMismatch(format!(
                "table `{}` loads `{}` but the artifact stores `{}`",
                load.table_name, load.file, table.file.path
            )));
        }
    }

    if plan.tables().len() != manifest.tables.len() {
        return Err(Error::SchemaMismatch(format!(
            "plan restores {} tables but the artifact holds {}",
            plan.tables().len(),
            manifest.tables.len()
        )));
    }
    Ok(())
}

/// Render a plan as a psql script to be run from the artifact root.
pub fn render_restore_script(plan: &RestorePlan) -> String {
    let mut script = String::new();
    script.push_str(&format!(
        "-- Restores {} tables of schema \"{}\" in a single transaction.\n",
        plan.tables().len(),
        plan.schema()
    ));
    script.push_str("-- Run from the artifact directory: psql <database-url> -f import.sql\n");
    script.push_str("\\set ON_ERROR_STOP on\n\n");
    script.push_str("BEGIN;\n");

    for step in plan.phases() {
        if step.statements.is_empty() {
            continue;
        }
        script.push_str(&format!(
            "\n-- {}: {}\n",
            step.phase,
            step.phase.description()
        ));
        for statement in &step.statements {
            script.push_str(&statement.to_psql());
            script.push('\n');
        }
    }

    script.push_str(&format!("\n-- {}\nCOMMIT;\n", Phase::Commit));
    script
}

/// `README.md` shipped inside the artifact.
pub fn render_readme(manifest: &Manifest) -> String {
    let mut readme = String::new();
    readme.push_str("# Database dump\n\n");
    readme.push_str(&format!(
        "Snapshot of schema `{}` taken at {}.\n\n",
        manifest.schema, manifest.created_at
    ));
    readme.push_str("| table | rows | file |\n|---|---|---|\n");
    for table in &manifest.tables {
        readme.push_str(&format!(
            "| {} | {} | `{}` |\n",
            table.descriptor.name, table.file.row_count, table.file.path
        ));
    }
    readme.push_str(
        "\n## Restoring\n\n\
         The target database must already have the same schema as the source.\n\
         Restoring replaces the contents of every listed table.\n\n\
         ```sh\n\
         dbdump restore . --conn postgres://localhost/target\n\
         # or, with psql only:\n\
         psql postgres://localhost/target -f import.sql\n\
         ```\n\n\
         Columns excluded from the dump are not present in the CSV files; the restore\n\
         script installs temporary defaults for them and lets maintenance triggers\n\
         recompute derived values while loading.\n",
    );
    readme
}
