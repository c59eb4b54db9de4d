mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use dbdump_artifact::{ArtifactLayout, Manifest, manifest_json_schema, write_bytes_atomic};
use dbdump_core::{
    DumpConfig, Error as CoreError, RegistryReport, build_descriptors, redact_connection_string,
};
use dbdump_export::{ExportOptions, PgBulkExporter, export_dump};
use dbdump_introspect::{Adapter, PostgresAdapter, postgres::fetch_database_name};
use dbdump_plan::plan_restore;
use dbdump_restore::{PgRestoreTransaction, RestoreError, execute_restore, prepare_restore};

use logging::init_logging;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Restore(#[from] RestoreError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
}

#[derive(Parser, Debug)]
#[command(name = "dbdump", version, about = "Privacy-filtered database dumps and atomic restores")]
struct Cli {
    /// Write JSON log lines to this file instead of stderr.
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the dump configuration against the live schema.
    Check(CheckArgs),
    /// Export the configured tables into an artifact directory.
    Export(ExportArgs),
    /// Print the restore script of an artifact.
    Render(RenderArgs),
    /// Restore an artifact into the target database in one transaction.
    Restore(RestoreArgs),
    /// Print the JSON Schema of manifest.json.
    ManifestSchema,
}

#[derive(Args, Debug)]
struct ConnArgs {
    /// Database connection string.
    #[arg(long, env = "DATABASE_URL", value_name = "CONNECTION_STRING", hide_env_values = true)]
    conn: String,
    #[arg(long, default_value_t = 10)]
    acquire_timeout_secs: u64,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[arg(long, default_value = "dump-db.toml")]
    config: PathBuf,
    /// Treat live tables missing from the configuration as errors.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    conn: ConnArgs,
    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    conn: ConnArgs,
    #[command(flatten)]
    config: ConfigArgs,
    /// Artifact directory; must be absent or empty.
    #[arg(long, value_name = "DIR")]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Artifact directory.
    #[arg(value_name = "DIR")]
    dir: PathBuf,
    /// Rewrite import.sql inside the artifact as well.
    #[arg(long, default_value_t = false)]
    write: bool,
}

#[derive(Args, Debug)]
struct RestoreArgs {
    #[command(flatten)]
    conn: ConnArgs,
    /// Artifact directory.
    #[arg(value_name = "DIR")]
    dir: PathBuf,
    /// Validate the artifact and the target without changing anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Do not compare the target schema with the artifact before restoring.
    #[arg(long, default_value_t = false)]
    skip_schema_check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.log_file.as_deref()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Check(args) => run_check(args).await,
        Command::Export(args) => run_export(args).await,
        Command::Render(args) => run_render(args),
        Command::Restore(args) => run_restore(args).await,
        Command::ManifestSchema => run_manifest_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(event = "run_failed", error = %err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn connect(args: &ConnArgs, max_connections: u32) -> Result<PgPool, CliError> {
    detect_engine(&args.conn)?;
    let connection = redact_connection_string(&args.conn);
    tracing::info!(event = "connecting", conn = %connection.redacted, max_connections);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(args.acquire_timeout_secs))
        .connect(&args.conn)
        .await?;
    Ok(pool)
}

async fn load_registry(pool: &PgPool, args: &ConfigArgs) -> Result<RegistryReport, CliError> {
    let config = DumpConfig::load(&args.config)?;
    let adapter = PostgresAdapter::new(pool.clone());
    let snapshot = adapter.introspect(&config.schema).await?;
    tracing::info!(
        event = "introspection_finished",
        engine = adapter.engine(),
        schema = %snapshot.schema,
        tables = snapshot.tables.len()
    );

    let registry = build_descriptors(&config, &snapshot, args.strict)?;
    for warning in &registry.warnings {
        tracing::warn!(event = "config_warning", message = %warning);
    }
    Ok(registry)
}

async fn run_check(args: CheckArgs) -> Result<(), CliError> {
    let pool = connect(&args.conn, 1).await?;
    let registry = load_registry(&pool, &args.config).await?;
    let plan = plan_restore(&registry.schema, &registry.descriptors)?;

    for descriptor in &registry.descriptors {
        println!(
            "{}: {} columns exported, {} excluded",
            descriptor.name,
            descriptor.columns.len(),
            descriptor.excluded_columns.len()
        );
    }
    for warning in &registry.warnings {
        println!("warning: {warning}");
    }
    println!(
        "ok: {} tables, {} restore statements",
        plan.tables().len(),
        plan.statement_count()
    );
    Ok(())
}

async fn run_export(args: ExportArgs) -> Result<(), CliError> {
    let pool = connect(&args.conn, 1).await?;
    let registry = load_registry(&pool, &args.config).await?;

    let options = ExportOptions {
        out_dir: args.out,
        source: redact_connection_string(&args.conn.conn),
        database: Some(fetch_database_name(&pool).await?),
    };
    let mut exporter = PgBulkExporter::new(pool);
    let summary = export_dump(&mut exporter, &registry, &options).await?;

    let rows: u64 = summary.manifest.tables.iter().map(|t| t.file.row_count).sum();
    println!(
        "exported {} tables ({rows} rows) to {}",
        summary.manifest.tables.len(),
        summary.layout.root().display()
    );
    Ok(())
}

fn run_render(args: RenderArgs) -> Result<(), CliError> {
    let prepared = prepare_restore(&args.dir, None)?;
    if args.write {
        write_bytes_atomic(
            &prepared.layout.import_script_path(),
            prepared.script.text.as_bytes(),
        )?;
    }
    print!("{}", prepared.script.text);
    Ok(())
}

async fn run_restore(args: RestoreArgs) -> Result<(), CliError> {
    let manifest = Manifest::load(&ArtifactLayout::new(&args.dir).manifest_path())?;
    tracing::info!(
        event = "restore_requested",
        dir = %args.dir.display(),
        schema = %manifest.schema,
        tables = manifest.tables.len(),
        dry_run = args.dry_run
    );

    if args.dry_run && args.skip_schema_check {
        let prepared = prepare_restore(&args.dir, None)?;
        print_plan_summary(&args.dir, &prepared.plan);
        return Ok(());
    }

    // A restore owns exactly one connection for its whole transaction.
    let pool = connect(&args.conn, 1).await?;

    let target = if args.skip_schema_check {
        None
    } else {
        let adapter = PostgresAdapter::new(pool.clone());
        Some(adapter.introspect(&manifest.schema).await?)
    };
    let prepared = prepare_restore(&args.dir, target.as_ref())?;

    if args.dry_run {
        print_plan_summary(&args.dir, &prepared.plan);
        return Ok(());
    }

    let tx = PgRestoreTransaction::begin(&pool).await?;
    let report = execute_restore(&prepared, Box::new(tx)).await?;
    for table in &report.tables {
        println!("{}: {} rows", table.table, table.rows);
    }
    println!(
        "restored {} tables ({} rows) in {} ms",
        report.tables.len(),
        report.total_rows(),
        report.duration.as_millis()
    );
    Ok(())
}

fn print_plan_summary(dir: &Path, plan: &dbdump_plan::RestorePlan) {
    println!("dry run: {} is ready to restore", dir.display());
    for step in plan.phases() {
        println!("  {}: {} statements", step.phase, step.statements.len());
    }
}

fn run_manifest_schema() -> Result<(), CliError> {
    let schema = serde_json::to_string_pretty(&manifest_json_schema())?;
    println!("{schema}");
    Ok(())
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(
            redact_connection_string(conn).redacted,
        ))
    }
}
