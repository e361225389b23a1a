//! End-to-end tests for the `config` command.

use assert_cmd::Command;
use predicates::prelude::*;

mod common;
use common::{configs, SpecRepoFixture};

fn apigentools() -> Command {
    Command::cargo_bin("apigentools").unwrap()
}

#[test]
fn test_config_languages_lists_configured_languages() {
    let fixture = SpecRepoFixture::new(configs::TWO_VERSIONS);

    apigentools()
        .current_dir(fixture.path())
        .args(["config", "languages"])
        .assert()
        .success()
        .stdout(predicate::str::contains("java"));
}

#[test]
fn test_config_show_emits_resolved_document() {
    let fixture = SpecRepoFixture::new(configs::TWO_VERSIONS);

    let output = apigentools()
        .current_dir(fixture.path())
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let document: serde_json::Value = serde_json::from_slice(&output).unwrap();
    // resolution filled in the defaults
    assert_eq!(document["codegen_exec"], "openapi-generator");
    assert_eq!(
        document["languages"]["java"]["container_opts"]["system"],
        false
    );
    assert_eq!(
        document["languages"]["java"]["container_opts"]["workdir"],
        "."
    );
}

#[test]
fn test_config_show_yaml_by_default() {
    let fixture = SpecRepoFixture::new(configs::TWO_VERSIONS);

    apigentools()
        .current_dir(fixture.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user_agent_client_name: MyClient"));
}

#[test]
fn test_missing_config_file_fails() {
    let temp = assert_fs::TempDir::new().unwrap();

    apigentools()
        .current_dir(temp.path())
        .args(["config", "languages"])
        .assert()
        .failure();
}

#[test]
fn test_undeclared_language_version_fails_at_load() {
    let fixture = SpecRepoFixture::new(
        r#"
spec_versions: [v1]
languages:
  java:
    spec_versions: [v1, v9]
"#,
    );

    apigentools()
        .current_dir(fixture.path())
        .args(["config", "languages"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("v9"));
}
