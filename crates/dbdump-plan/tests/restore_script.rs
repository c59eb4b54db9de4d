use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use dbdump_artifact::{ArtifactLayout, DataFile, Manifest, ManifestTable, inspect_data_file};
use dbdump_core::{Error, ExcludedColumn, TableDescriptor};
use dbdump_plan::{generate_restore_script, plan_restore, render_readme};

fn temp_artifact_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("dbdump_plan_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(dir.join("data")).expect("create temp artifact dir");
    dir
}

fn users() -> TableDescriptor {
    TableDescriptor {
        name: "users".to_string(),
        columns: vec!["id".to_string(), "login".to_string()],
        column_defaults: BTreeMap::new(),
        excluded_columns: Vec::new(),
        primary_key: vec!["id".to_string()],
        filter: None,
        load_triggers: Vec::new(),
        disabled_triggers: Vec::new(),
        trigger_modes: BTreeMap::new(),
        sequences: Vec::new(),
    }
}

fn crates() -> TableDescriptor {
    TableDescriptor {
        name: "crates".to_string(),
        columns: vec!["id".to_string(), "name".to_string()],
        column_defaults: BTreeMap::from([("search_vector".to_string(), "''".to_string())]),
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

fn artifact(label: &str) -> (ArtifactLayout, Manifest) {
    let layout = ArtifactLayout::new(temp_artifact_dir(label));
    let mut manifest = Manifest::new("public", "2026-10-14T00:00:00Z");
    for (descriptor, contents) in [
        (users(), "id,login\n1,alice\n"),
        (crates(), "id,name\n1,serde\n"),
    ] {
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
    (layout, manifest)
}

#[test]
fn scenario_script_follows_phase_order() {
    let (layout, manifest) = artifact("scenario");
    let plan = plan_restore(&manifest.schema, &manifest.descriptors()).expect("plan");
    let script = generate_restore_script(&plan, &layout, &manifest).expect("script");

    let expected = [
        "BEGIN;",
        "ALTER TABLE \"public\".\"users\" DISABLE TRIGGER ALL;",
        "ALTER TABLE \"public\".\"crates\" DISABLE TRIGGER ALL;",
        "ALTER TABLE \"public\".\"crates\" ALTER COLUMN \"search_vector\" SET DEFAULT '';",
        "TRUNCATE \"public\".\"users\", \"public\".\"crates\" RESTART IDENTITY CASCADE;",
        "ALTER TABLE \"public\".\"crates\" ENABLE TRIGGER \"trigger_crates_tsvector_update\";",
        "\\copy \"public\".\"users\" (\"id\", \"login\") FROM 'data/users.csv' WITH CSV HEADER",
        "\\copy \"public\".\"crates\" (\"id\", \"name\") FROM 'data/crates.csv' WITH CSV HEADER",
        "ALTER TABLE \"public\".\"crates\" ALTER COLUMN \"search_vector\" DROP DEFAULT;",
        "ALTER TABLE \"public\".\"users\" ENABLE TRIGGER ALL;",
        "ALTER TABLE \"public\".\"crates\" ENABLE TRIGGER ALL;",
        "COMMIT;",
    ];

    let lines: Vec<&str> = script
        .text
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with("--") && !line.starts_with("\\set"))
        .collect();
    assert_eq!(lines, expected);
}

#[test]
fn missing_flat_file_aborts_generation() {
    let (layout, manifest) = artifact("missing");
    fs::remove_file(layout.root().join("data/crates.csv")).expect("remove crates.csv");
    let plan = plan_restore(&manifest.schema, &manifest.descriptors()).expect("plan");

    let err = generate_restore_script(&plan, &layout, &manifest).unwrap_err();
    assert!(matches!(err, Error::MissingArtifact(_)), "unexpected error: {err}");
}

#[test]
fn header_mismatch_aborts_generation() {
    let (layout, manifest) = artifact("header");
    fs::write(layout.root().join("data/users.csv"), "id\n1\n").expect("rewrite users.csv");
    let plan = plan_restore(&manifest.schema, &manifest.descriptors()).expect("plan");

    let err = generate_restore_script(&plan, &layout, &manifest).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)), "unexpected error: {err}");
}

#[test]
fn plan_for_other_tables_is_rejected() {
    let (layout, manifest) = artifact("other");
    let plan = plan_restore(&manifest.schema, &[users()]).expect("plan");

    let err = generate_restore_script(&plan, &layout, &manifest).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)), "unexpected error: {err}");
}

#[test]
fn readme_lists_tables() {
    let (_layout, manifest) = artifact("readme");
    let readme = render_readme(&manifest);
    assert!(readme.contains("| users | 1 | `data/users.csv` |"));
    assert!(readme.contains("| crates | 1 | `data/crates.csv` |"));
}
