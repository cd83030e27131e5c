use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const PROJECT: &str = r#"
name: cli_demo
datasources:
  local:
    data_connectors:
      default_runtime:
        class_name: RuntimeDataConnector
        batch_identifiers: [run_id]
      files:
        class_name: InferredAssetFilesystemDataConnector
        base_directory: data
        default_regex:
          pattern: "(.+)_(\\d{4})\\.csv"
          group_names: [data_asset_name, year]
"#;

/// Throwaway project with two yearly taxi extracts.
struct AssayTestEnv {
    tmp: TempDir,
}

impl AssayTestEnv {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        fs::write(tmp.path().join("assay.yaml"), PROJECT)?;
        fs::create_dir(tmp.path().join("data"))?;
        fs::write(
            tmp.path().join("data/taxi_2023.csv"),
            "id,fare\n1,9.5\n2,12.0\n3,4.25\n",
        )?;
        fs::write(tmp.path().join("data/taxi_2024.csv"), "id,fare\n4,7.0\n")?;
        Ok(Self { tmp })
    }

    fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn assay(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("assay"));
        cmd.current_dir(self.root());
        cmd.env_remove("ASSAY_PROJECT_DIR");
        cmd.env_remove("ASSAY_DATABASE");
        cmd.env_remove("ASSAY_DATA_DIR");
        cmd
    }
}

#[test]
fn test_batches_lists_every_file_for_the_asset() -> Result<()> {
    let env = AssayTestEnv::new()?;

    env.assay()
        .args([
            "batches",
            "--datasource",
            "local",
            "--data-connector",
            "files",
            "--data-asset",
            "taxi",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 batch(es)"))
        .stdout(predicate::str::contains("2023"))
        .stdout(predicate::str::contains("2024"));
    Ok(())
}

#[test]
fn test_batches_filter_narrows_the_list() -> Result<()> {
    let env = AssayTestEnv::new()?;

    env.assay()
        .args([
            "batches",
            "--datasource",
            "local",
            "--data-connector",
            "files",
            "--data-asset",
            "taxi",
            "--filter",
            "year=2024",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 batch(es)"))
        .stdout(predicate::str::contains(r#""year":"2023""#).not());
    Ok(())
}

#[test]
fn test_head_previews_rows() -> Result<()> {
    let env = AssayTestEnv::new()?;

    env.assay()
        .args([
            "head",
            "--datasource",
            "local",
            "--data-connector",
            "files",
            "--data-asset",
            "taxi",
            "--filter",
            "year=2023",
            "-n",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 row(s) loaded"))
        .stdout(predicate::str::contains("fare"))
        .stdout(predicate::str::contains("9.5"))
        .stdout(predicate::str::contains("4.25").not());
    Ok(())
}

#[test]
fn test_head_fails_when_nothing_matches() -> Result<()> {
    let env = AssayTestEnv::new()?;

    env.assay()
        .args([
            "head",
            "--datasource",
            "local",
            "--data-connector",
            "files",
            "--data-asset",
            "weather",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No batch matches"));
    Ok(())
}

#[test]
fn test_request_resolves_runtime_shape() -> Result<()> {
    let env = AssayTestEnv::new()?;

    env.assay()
        .args([
            "request",
            "--datasource",
            "local",
            "--data-connector",
            "default_runtime",
            "--data-asset",
            "adhoc",
            "--query",
            "SELECT 1",
            "--identifier",
            "run_id=r1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("RuntimeBatchRequest"))
        .stdout(predicate::str::contains("SELECT 1"))
        .stdout(predicate::str::contains("id:"));
    Ok(())
}

#[test]
fn test_head_on_inline_records() -> Result<()> {
    let env = AssayTestEnv::new()?;
    fs::write(
        env.root().join("rows.json"),
        r#"[{"city": "paris", "trips": 12}, {"city": "lyon", "trips": 5}]"#,
    )?;

    env.assay()
        .args([
            "head",
            "--datasource",
            "local",
            "--data-connector",
            "default_runtime",
            "--data-asset",
            "inline",
            "--records",
            "rows.json",
            "--identifier",
            "run_id=r1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 row(s) loaded"))
        .stdout(predicate::str::contains("paris"))
        .stdout(predicate::str::contains("lyon"));
    Ok(())
}

#[test]
fn test_request_rejects_query_and_path_together() -> Result<()> {
    let env = AssayTestEnv::new()?;

    env.assay()
        .args([
            "request",
            "--datasource",
            "local",
            "--data-connector",
            "default_runtime",
            "--data-asset",
            "adhoc",
            "--query",
            "SELECT 1",
            "--path",
            "data/taxi_2023.csv",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Must provide only one"));
    Ok(())
}

#[test]
fn test_missing_project_reports_context() -> Result<()> {
    let tmp = tempfile::tempdir()?;

    Command::new(assert_cmd::cargo::cargo_bin!("assay"))
        .current_dir(tmp.path())
        .env_remove("ASSAY_PROJECT_DIR")
        .args(["batches", "--datasource", "local"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load project"));
    Ok(())
}
