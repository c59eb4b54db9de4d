use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use dbdump_artifact::{
    ArtifactLayout, DataFile, Manifest, ManifestTable, Metadata, validate_data_file,
    write_bytes_atomic, write_json_atomic,
};
use dbdump_core::{Error, RedactedConnection, RegistryReport, Result};
use dbdump_plan::{generate_restore_script, plan_restore, render_export_script, render_readme};

use crate::exporter::{BulkExporter, ExportRequest};

/// Where and how to write an artifact.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub out_dir: PathBuf,
    pub source: RedactedConnection,
    pub database: Option<String>,
}

/// Outcome of a successful export.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub run_id: String,
    pub layout: ArtifactLayout,
    pub manifest: Manifest,
    pub duration: Duration,
}

/// Export every described table and write a complete artifact.
///
/// The restore plan is validated before the exporter is touched, so a
/// configuration error never leaves a partial artifact behind. The manifest
/// and restore script are only written once every flat file has been checked
/// against its descriptor.
pub async fn export_dump<E: BulkExporter + ?Sized>(
    exporter: &mut E,
    registry: &RegistryReport,
    options: &ExportOptions,
) -> Result<ExportSummary> {
    let started = Instant::now();
    let run_id = uuid::Uuid::new_v4().to_string();
    let schema = registry.schema.as_str();

    let plan = plan_restore(schema, &registry.descriptors)?;

    let layout = ArtifactLayout::new(&options.out_dir);
    prepare_output_dir(&layout)?;

    let created_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    info!(
        event = "export_started",
        run_id = %run_id,
        tables = registry.descriptors.len(),
        out_dir = %layout.root().display()
    );

    exporter.begin_snapshot().await?;
    let mut exported_rows = Vec::with_capacity(registry.descriptors.len());
    for descriptor in &registry.descriptors {
        let destination = layout.data_file(descriptor);
        let rows = match exporter
            .export_table(ExportRequest {
                schema,
                descriptor,
                destination: &destination,
            })
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                warn!(event = "table_export_failed", table = %descriptor.name, error = %err);
                return Err(err);
            }
        };
        info!(event = "table_exported", table = %descriptor.name, rows);
        exported_rows.push(rows);
    }
    exporter.finish_snapshot().await?;

    let mut manifest = Manifest::new(schema, created_at.clone());
    for (descriptor, rows) in registry.descriptors.iter().zip(exported_rows) {
        let stats = validate_data_file(&layout.data_file(descriptor), descriptor)?;
        if stats.row_count != rows {
            return Err(Error::ArtifactIntegrity(format!(
                "{} holds {} rows but the database exported {rows}",
                descriptor.data_file(),
                stats.row_count
            )));
        }
        manifest.tables.push(ManifestTable {
            descriptor: descriptor.clone(),
            file: DataFile {
                path: descriptor.data_file(),
                row_count: rows,
                sha256: stats.sha256,
            },
        });
    }

    let script = generate_restore_script(&plan, &layout, &manifest)?;
    write_bytes_atomic(&layout.import_script_path(), script.text.as_bytes())?;
    write_bytes_atomic(
        &layout.export_script_path(),
        render_export_script(schema, &registry.descriptors).as_bytes(),
    )?;
    write_bytes_atomic(&layout.readme_path(), render_readme(&manifest).as_bytes())?;

    let metadata = Metadata {
        run_id: run_id.clone(),
        created_at,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        database: options.database.clone(),
        source: options.source.clone(),
        warnings: registry.warnings.clone(),
    };
    write_json_atomic(&layout.metadata_path(), &metadata)?;
    write_json_atomic(&layout.manifest_path(), &manifest)?;

    let duration = started.elapsed();
    info!(
        event = "export_finished",
        run_id = %run_id,
        rows = manifest.tables.iter().map(|t| t.file.row_count).sum::<u64>(),
        duration_ms = duration.as_millis() as u64
    );

    Ok(ExportSummary {
        run_id,
        layout,
        manifest,
        duration,
    })
}

fn prepare_output_dir(layout: &ArtifactLayout) -> Result<()> {
    if layout.root().exists() {
        let mut entries = std::fs::read_dir(layout.root())?;
        if entries.next().is_some() {
            return Err(Error::Configuration(format!(
                "output directory {} is not empty",
                layout.root().display()
            )));
        }
    }
    std::fs::create_dir_all(layout.data_dir())?;
    Ok(())
}
