use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use dbdump_artifact::{ArtifactLayout, Manifest};
use dbdump_core::{Error, SchemaSnapshot};
use dbdump_plan::{Phase, RestorePlan, RestoreScript, Statement, generate_restore_script, plan_restore};

use crate::compat::{adopt_target_state, check_target_compatibility};
use crate::error::RestoreError;
use crate::target::RestoreTransaction;

/// An artifact whose files, manifest and plan have all been checked.
#[derive(Debug, Clone)]
pub struct PreparedRestore {
    pub layout: ArtifactLayout,
    pub manifest: Manifest,
    pub plan: RestorePlan,
    pub script: RestoreScript,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub table: String,
    pub rows: u64,
}

/// Outcome of a committed restore.
#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub tables: Vec<TableLoad>,
    pub statements: usize,
    pub duration: Duration,
}

impl RestoreReport {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|table| table.rows).sum()
    }
}

/// Load and validate the artifact at `dir`, and plan its restore.
///
/// With a `target` snapshot the target is checked for compatibility first.
/// Its trigger states and column defaults then replace the ones recorded at
/// export time, so the restore puts back what the target had.
pub fn prepare_restore(
    dir: &Path,
    target: Option<&SchemaSnapshot>,
) -> Result<PreparedRestore, RestoreError> {
    let layout = ArtifactLayout::new(dir);
    let manifest = Manifest::load(&layout.manifest_path())?;

    let mut descriptors = manifest.descriptors();
    if let Some(target) = target {
        check_target_compatibility(&manifest, target)?;
        adopt_target_state(&mut descriptors, target);
    }

    let plan = plan_restore(&manifest.schema, &descriptors)?;
    let script = generate_restore_script(&plan, &layout, &manifest)?;

    Ok(PreparedRestore {
        layout,
        manifest,
        plan,
        script,
    })
}

/// Run every phase of `prepared` inside `tx`, then commit.
///
/// The first failing statement rolls the whole transaction back, so the
/// target is either fully restored or untouched.
pub async fn execute_restore(
    prepared: &PreparedRestore,
    mut tx: Box<dyn RestoreTransaction + '_>,
) -> Result<RestoreReport, RestoreError> {
    let started = Instant::now();
    let mut tables = Vec::new();
    let mut statements = 0usize;

    for step in prepared.plan.phases() {
        info!(
            event = "phase_started",
            phase = step.phase.as_str(),
            statements = step.statements.len()
        );

        for statement in &step.statements {
            let sql = statement.to_sql();
            match run_statement(prepared, tx.as_mut(), statement, &sql).await {
                Ok(Some(load)) => {
                    info!(event = "table_loaded", table = %load.table, rows = load.rows);
                    tables.push(load);
                }
                Ok(None) => {}
                Err(err) => return Err(abort(tx, step.phase, sql, err).await),
            }
            statements += 1;
        }

        info!(event = "phase_finished", phase = step.phase.as_str());
    }

    info!(event = "phase_started", phase = Phase::Commit.as_str(), statements = 1);
    if let Err(err) = tx.commit().await {
        error!(event = "restore_rolled_back", phase = Phase::Commit.as_str(), error = %err);
        return Err(RestoreError::Execution {
            phase: Phase::Commit,
            statement: "COMMIT".to_string(),
            message: err.to_string(),
        });
    }
    info!(event = "phase_finished", phase = Phase::Commit.as_str());

    let report = RestoreReport {
        tables,
        statements,
        duration: started.elapsed(),
    };
    info!(
        event = "restore_committed",
        schema = %prepared.plan.schema(),
        tables = report.tables.len(),
        rows = report.total_rows(),
        duration_ms = report.duration.as_millis() as u64
    );
    Ok(report)
}

async fn run_statement(
    prepared: &PreparedRestore,
    tx: &mut (dyn RestoreTransaction + '_),
    statement: &Statement,
    sql: &str,
) -> Result<Option<TableLoad>, Error> {
    let Some(load) = statement.as_load() else {
        tx.execute(sql).await?;
        return Ok(None);
    };

    let path = prepared.layout.root().join(&load.file);
    let rows = tx.copy_in(sql, &path).await?;

    let expected = prepared
        .manifest
        .table(&load.table_name)
        .map(|table| table.file.row_count)
        .ok_or_else(|| Error::MissingArtifact(path.clone()))?;
    if rows != expected {
        return Err(Error::ArtifactIntegrity(format!(
            "loaded {rows} rows into `{}` but the artifact records {expected}",
            load.table_name
        )));
    }

    Ok(Some(TableLoad {
        table: load.table_name.clone(),
        rows,
    }))
}

async fn abort(
    tx: Box<dyn RestoreTransaction + '_>,
    phase: Phase,
    statement: String,
    err: Error,
) -> RestoreError {
    if let Err(rollback_err) = tx.rollback().await {
        warn!(event = "rollback_failed", error = %rollback_err);
    }
    error!(
        event = "restore_rolled_back",
        phase = phase.as_str(),
        statement = %statement,
        error = %err
    );
    RestoreError::Execution {
        phase,
        statement,
        message: err.to_string(),
    }
}
