use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use dbdump_artifact::{ArtifactLayout, DataFile, Manifest, ManifestTable, inspect_data_file, write_json_atomic};
use dbdump_core::{
    ColumnSchema, Error, ExcludedColumn, Result, SchemaSnapshot, SequenceBinding, TableDescriptor,
    TableSchema, TriggerMode, TriggerSchema,
};
use dbdump_plan::{Phase, Statement};
use dbdump_restore::{RestoreError, RestoreTransaction, execute_restore, prepare_restore};

#[derive(Default)]
struct RecordingTransaction {
    journal: Arc<Mutex<Vec<String>>>,
    fail_at: Option<usize>,
    fail_commit: bool,
    extra_rows: u64,
    executed: usize,
}

impl RecordingTransaction {
    fn record(&mut self, sql: &str) -> Result<()> {
        let index = self.executed;
        self.executed += 1;
        let mut journal = self.journal.lock().expect("journal");
        if self.fail_at == Some(index) {
            journal.push(format!("FAILED {sql}"));
            return Err(Error::Db("injected failure".to_string()));
        }
        journal.push(sql.to_string());
        Ok(())
    }
}

#[async_trait]
impl RestoreTransaction for RecordingTransaction {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.record(sql)
    }

    async fn copy_in(&mut self, statement: &str, file: &Path) -> Result<u64> {
        self.record(statement)?;
        let rows = inspect_data_file(file)?.row_count;
        Ok(rows + self.extra_rows)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if self.fail_commit {
            return Err(Error::Db("serialization failure".to_string()));
        }
        self.journal.lock().expect("journal").push("COMMIT".to_string());
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.journal.lock().expect("journal").push("ROLLBACK".to_string());
        Ok(())
    }
}

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dbdump-restore-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(dir.join("data")).expect("create temp dir");
    dir
}

fn users() -> TableDescriptor {
    TableDescriptor {
        name: "users".to_string(),
        columns: vec!["id".to_string(), "gh_login".to_string()],
        column_defaults: [("gh_access_token".to_string(), "''".to_string())]
            .into_iter()
            .collect(),
        excluded_columns: vec![ExcludedColumn {
            name: "gh_access_token".to_string(),
            nullable: false,
            generated: false,
            schema_default: None,
        }],
        primary_key: vec!["id".to_string()],
        filter: None,
        load_triggers: Vec::new(),
        disabled_triggers: Vec::new(),
        trigger_modes: BTreeMap::new(),
        sequences: vec![SequenceBinding {
            column: "id".to_string(),
            sequence: "public.users_id_seq".to_string(),
        }],
    }
}

fn crates() -> TableDescriptor {
    TableDescriptor {
        name: "crates".to_string(),
        columns: vec!["id".to_string(), "name".to_string(), "user_id".to_string()],
        column_defaults: [("search_vector".to_string(), "''".to_string())]
            .into_iter()
            .collect(),
        excluded_columns: vec![ExcludedColumn {
            name: "search_vector".to_string(),
            nullable: false,
            generated: false,
            schema_default: None,
        }],
        primary_key: vec!["id".to_string()],
        filter: None,
        load_triggers: vec!["trigger_crates_tsvector_update".to_string()],
        disabled_triggers: Vec::new(),
        trigger_modes: BTreeMap::new(),
        sequences: Vec::new(),
    }
}

fn notes() -> TableDescriptor {
    TableDescriptor {
        name: "notes".to_string(),
        columns: vec!["note".to_string()],
        column_defaults: BTreeMap::new(),
        excluded_columns: Vec::new(),
        primary_key: Vec::new(),
        filter: None,
        load_triggers: Vec::new(),
        disabled_triggers: Vec::new(),
        trigger_modes: BTreeMap::new(),
        sequences: Vec::new(),
    }
}

fn write_artifact() -> PathBuf {
    write_artifact_with(vec![
        (users(), "id,gh_login\n1,alice\n2,bob\n"),
        (crates(), "id,name,user_id\n1,serde,1\n"),
    ])
}

fn write_artifact_with(files: Vec<(TableDescriptor, &str)>) -> PathBuf {
    let dir = temp_dir();
    let layout = ArtifactLayout::new(&dir);

    let mut manifest = Manifest::new("public", "2026-01-01T00:00:00Z");
    for (descriptor, contents) in files {
        let path = layout.data_file(&descriptor);
        fs::write(&path, contents).expect("write data file");
        let stats = inspect_data_file(&path).expect("inspect");
        manifest.tables.push(ManifestTable {
            file: DataFile {
                path: descriptor.data_file(),
                row_count: stats.row_count,
                sha256: stats.sha256,
            },
            descriptor,
        });
    }
    write_json_atomic(&layout.manifest_path(), &manifest).expect("write manifest");
    dir
}

fn column(position: i16, name: &str) -> ColumnSchema {
    ColumnSchema {
        ordinal_position: position,
        name: name.to_string(),
        data_type: "text".to_string(),
        is_nullable: false,
        default: None,
        is_generated: false,
        sequence: None,
    }
}

fn target() -> SchemaSnapshot {
    SchemaSnapshot {
        schema: "public".to_string(),
        tables: vec![
            TableSchema {
                name: "crates".to_string(),
                columns: vec![
                    column(1, "id"),
                    column(2, "name"),
                    column(3, "user_id"),
                    column(4, "search_vector"),
                ],
                primary_key: vec!["id".to_string()],
                triggers: vec![
                    TriggerSchema {
                        name: "crates_audit".to_string(),
                        enabled: false,
                        mode: TriggerMode::Origin,
                    },
                    TriggerSchema {
                        name: "trigger_crates_tsvector_update".to_string(),
                        enabled: true,
                        mode: TriggerMode::Origin,
                    },
                ],
            },
            TableSchema {
                name: "users".to_string(),
                columns: vec![column(1, "id"), column(2, "gh_login"), column(3, "gh_access_token")],
                primary_key: vec!["id".to_string()],
                triggers: Vec::new(),
            },
        ],
    }
}

#[tokio::test]
async fn committed_restore_runs_phases_in_order() {
    let dir = write_artifact();
    let prepared = prepare_restore(&dir, None).expect("prepare");
    let tx = RecordingTransaction::default();
    let journal = tx.journal.clone();

    let report = execute_restore(&prepared, Box::new(tx)).await.expect("restore");

    let journal = journal.lock().expect("journal").clone();
    assert_eq!(
        journal,
        vec![
            r#"ALTER TABLE "public"."users" DISABLE TRIGGER ALL;"#,
            r#"ALTER TABLE "public"."crates" DISABLE TRIGGER ALL;"#,
            r#"ALTER TABLE "public"."users" ALTER COLUMN "gh_access_token" SET DEFAULT '';"#,
            r#"ALTER TABLE "public"."crates" ALTER COLUMN "search_vector" SET DEFAULT '';"#,
            r#"TRUNCATE "public"."users", "public"."crates" RESTART IDENTITY CASCADE;"#,
            r#"ALTER TABLE "public"."crates" ENABLE TRIGGER "trigger_crates_tsvector_update";"#,
            r#"COPY "public"."users" ("id", "gh_login") FROM STDIN WITH (FORMAT csv, HEADER true)"#,
            r#"COPY "public"."crates" ("id", "name", "user_id") FROM STDIN WITH (FORMAT csv, HEADER true)"#,
            r#"SELECT setval('public.users_id_seq'::regclass, COALESCE(MAX("id"), 0) + 1, false) FROM "public"."users";"#,
            r#"ALTER TABLE "public"."users" ALTER COLUMN "gh_access_token" DROP DEFAULT;"#,
            r#"ALTER TABLE "public"."crates" ALTER COLUMN "search_vector" DROP DEFAULT;"#,
            r#"ALTER TABLE "public"."users" ENABLE TRIGGER ALL;"#,
            r#"ALTER TABLE "public"."crates" ENABLE TRIGGER ALL;"#,
            "COMMIT",
        ]
    );
    assert_eq!(report.statements, 13);
    assert_eq!(report.total_rows(), 3);
    assert_eq!(report.tables[0].table, "users");
    assert_eq!(report.tables[0].rows, 2);
}

#[tokio::test]
async fn failure_at_any_statement_rolls_back_everything() {
    let dir = write_artifact();
    let prepared = prepare_restore(&dir, None).expect("prepare");
    let phases: Vec<Phase> = prepared.plan.statements().map(|(phase, _)| phase).collect();

    for (index, expected_phase) in phases.iter().enumerate() {
        let tx = RecordingTransaction {
            fail_at: Some(index),
            ..RecordingTransaction::default()
        };
        let journal = tx.journal.clone();

        let err = execute_restore(&prepared, Box::new(tx))
            .await
            .expect_err("injected failure");

        assert_eq!(err.phase(), Some(*expected_phase), "statement {index}");
        let journal = journal.lock().expect("journal").clone();
        assert_eq!(journal.len(), index + 2);
        assert!(journal[index].starts_with("FAILED "));
        assert_eq!(journal.last().map(String::as_str), Some("ROLLBACK"));
        assert!(!journal.iter().any(|entry| entry == "COMMIT"));
    }
}

#[tokio::test]
async fn row_count_disagreeing_with_manifest_rolls_back() {
    let dir = write_artifact();
    let prepared = prepare_restore(&dir, None).expect("prepare");
    let tx = RecordingTransaction {
        extra_rows: 1,
        ..RecordingTransaction::default()
    };
    let journal = tx.journal.clone();

    let err = execute_restore(&prepared, Box::new(tx)).await.expect_err("row mismatch");

    match err {
        RestoreError::Execution { phase, message, .. } => {
            assert_eq!(phase, Phase::Load);
            assert!(message.contains("artifact records 2"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
    let journal = journal.lock().expect("journal").clone();
    assert_eq!(journal.last().map(String::as_str), Some("ROLLBACK"));
}

#[tokio::test]
async fn failed_commit_is_reported_as_commit_phase() {
    let dir = write_artifact();
    let prepared = prepare_restore(&dir, None).expect("prepare");
    let tx = RecordingTransaction {
        fail_commit: true,
        ..RecordingTransaction::default()
    };

    let err = execute_restore(&prepared, Box::new(tx)).await.expect_err("commit fails");

    assert_eq!(err.phase(), Some(Phase::Commit));
}

#[test]
fn missing_data_file_fails_before_any_transaction() {
    let dir = write_artifact();
    fs::remove_file(dir.join("data/crates.csv")).expect("remove");

    let err = prepare_restore(&dir, None).expect_err("missing file");

    assert!(matches!(err, RestoreError::Core(Error::MissingArtifact(_))));
}

#[test]
fn missing_manifest_is_a_missing_artifact() {
    let dir = temp_dir();

    let err = prepare_restore(&dir, None).expect_err("no manifest");

    assert!(matches!(err, RestoreError::Core(Error::MissingArtifact(_))));
}

#[test]
fn incompatible_target_is_rejected() {
    let dir = write_artifact();
    let mut target = target();
    target.tables[1].columns.pop();

    let err = prepare_restore(&dir, Some(&target)).expect_err("mismatch");

    assert!(matches!(err, RestoreError::Core(Error::SchemaMismatch(_))));
}

#[test]
fn target_disabled_triggers_are_disabled_again() {
    let dir = write_artifact();

    let prepared = prepare_restore(&dir, Some(&target())).expect("prepare");

    let enable: Vec<String> = prepared
        .plan
        .phases()
        .iter()
        .filter(|step| step.phase == Phase::EnableTriggers)
        .flat_map(|step| step.statements.iter().map(Statement::to_sql))
        .collect();
    assert_eq!(
        enable,
        vec![
            r#"ALTER TABLE "public"."users" ENABLE TRIGGER ALL;"#,
            r#"ALTER TABLE "public"."crates" ENABLE TRIGGER ALL;"#,
            r#"ALTER TABLE "public"."crates" DISABLE TRIGGER "crates_audit";"#,
        ]
    );
}

#[tokio::test]
async fn multi_line_values_and_null_rows_load_as_recorded() {
    let dir = write_artifact_with(vec![(notes(), "note\n\"multi\nline\"\n\n")]);
    let prepared = prepare_restore(&dir, None).expect("prepare");
    assert_eq!(prepared.manifest.tables[0].file.row_count, 2);

    let report = execute_restore(&prepared, Box::new(RecordingTransaction::default()))
        .await
        .expect("restore");

    assert_eq!(report.tables[0].table, "notes");
    assert_eq!(report.tables[0].rows, 2);
}

#[test]
fn target_column_default_is_reinstalled_after_load() {
    let dir = write_artifact();
    let mut target = target();
    target.tables[1].columns[2].default = Some("'none'::text".to_string());

    let prepared = prepare_restore(&dir, Some(&target)).expect("prepare");

    let restored: Vec<String> = prepared
        .plan
        .phases()
        .iter()
        .filter(|step| step.phase == Phase::RestoreDefaults)
        .flat_map(|step| step.statements.iter().map(Statement::to_sql))
        .collect();
    assert_eq!(
        restored,
        vec![
            r#"ALTER TABLE "public"."users" ALTER COLUMN "gh_access_token" SET DEFAULT 'none'::text;"#,
            r#"ALTER TABLE "public"."crates" ALTER COLUMN "search_vector" DROP DEFAULT;"#,
        ]
    );
}

#[test]
fn target_trigger_modes_are_reapplied() {
    let dir = write_artifact();
    let mut target = target();
    target.tables[0].triggers[1].mode = TriggerMode::Always;

    let prepared = prepare_restore(&dir, Some(&target)).expect("prepare");

    let enable: Vec<String> = prepared
        .plan
        .phases()
        .iter()
        .filter(|step| step.phase == Phase::EnableTriggers)
        .flat_map(|step| step.statements.iter().map(Statement::to_sql))
        .collect();
    assert_eq!(
        enable,
        vec![
            r#"ALTER TABLE "public"."users" ENABLE TRIGGER ALL;"#,
            r#"ALTER TABLE "public"."crates" ENABLE TRIGGER ALL;"#,
            r#"ALTER TABLE "public"."crates" ENABLE ALWAYS TRIGGER "trigger_crates_tsvector_update";"#,
            r#"ALTER TABLE "public"."crates" DISABLE TRIGGER "crates_audit";"#,
        ]
    );
}
