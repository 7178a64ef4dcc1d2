//! Integration tests over the `unify` binary (spec §6.2), grounded in the
//! teacher's `crates/cli/tests/*.rs` pattern: drive the compiled binary with
//! `assert_cmd`, assert on stdout/exit code with `predicates`.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const TWO_KEY_CONFIG: &str = r#"
keys:
  - name: email
    invalid_texts: ["", null]
  - name: phone
tables:
  - table: events
    key_columns:
      - { column: email_col, key: email }
      - { column: phone_col, key: phone }
canonical_ids:
  - name: unified_id
    merge_by_keys: [email, phone]
"#;

#[test]
fn compile_writes_ordered_stage_files_and_manifest() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, TWO_KEY_CONFIG).unwrap();
    let outdir = dir.path().join("stages");

    Command::cargo_bin("unify")
        .unwrap()
        .arg("compile")
        .arg(&config_path)
        .arg("--target-catalog")
        .arg("warehouse")
        .arg("--target-schema")
        .arg("unify")
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .success();

    assert!(outdir.join("01_create_graph.sql").is_file());
    assert!(outdir.join("02_extract_merge.sql").is_file());
    assert!(outdir.join("05_canonicalize.sql").is_file());
    assert!(outdir.join("10_enrich_events.sql").is_file());
    assert!(outdir.join("30_unification_metadata.sql").is_file());
    assert!(outdir.join("_plan.json").is_file());

    let manifest = fs::read_to_string(outdir.join("_plan.json")).unwrap();
    assert!(manifest.contains("\"dialect\": \"snowflake\""));
}

#[test]
fn compile_rejects_config_with_unknown_key_reference() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
keys:
  - name: email
tables:
  - table: events
    key_columns:
      - { column: phone_col, key: phone }
"#,
    )
    .unwrap();

    Command::cargo_bin("unify")
        .unwrap()
        .arg("compile")
        .arg(&config_path)
        .arg("--target-catalog")
        .arg("warehouse")
        .arg("--target-schema")
        .arg("unify")
        .arg("--outdir")
        .arg(dir.path().join("stages"))
        .assert()
        .failure()
        .code(1);
}

#[test]
fn run_dry_run_lists_stages_without_touching_a_backend() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, TWO_KEY_CONFIG).unwrap();
    let outdir = dir.path().join("stages");

    Command::cargo_bin("unify")
        .unwrap()
        .arg("compile")
        .arg(&config_path)
        .arg("--target-catalog")
        .arg("warehouse")
        .arg("--target-schema")
        .arg("unify")
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .success();

    Command::cargo_bin("unify")
        .unwrap()
        .arg("run")
        .arg(&outdir)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("01_create_graph.sql"))
        .stdout(predicate::str::contains("05_canonicalize.sql"));
}

#[test]
fn run_without_dsn_or_mock_reports_postgres_not_compiled_in() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, TWO_KEY_CONFIG).unwrap();
    let outdir = dir.path().join("stages");

    Command::cargo_bin("unify")
        .unwrap()
        .arg("compile")
        .arg(&config_path)
        .arg("--target-catalog")
        .arg("warehouse")
        .arg("--target-schema")
        .arg("unify")
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .success();

    Command::cargo_bin("unify")
        .unwrap()
        .arg("run")
        .arg(&outdir)
        .arg("--skip-loop")
        .env_remove("UNIFY_BACKEND_DSN")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("postgres backend support was not compiled in"));
}

#[test]
fn run_without_manifest_reports_missing_manifest_error() {
    let dir = tempdir().unwrap();

    Command::cargo_bin("unify")
        .unwrap()
        .arg("run")
        .arg(dir.path())
        .arg("--dry-run")
        .assert()
        .failure()
        .code(1);
}
