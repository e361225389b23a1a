//! End-to-end tests for the `merge` command.
//!
//! These tests invoke the actual CLI binary and validate the behavior of
//! assembling full specs from fragments, from a user's perspective.

use assert_cmd::Command;
use predicates::prelude::*;

mod common;
use common::{configs, SpecRepoFixture};

fn apigentools() -> Command {
    Command::cargo_bin("apigentools").unwrap()
}

#[test]
fn test_merge_assembles_all_versions() {
    let fixture = SpecRepoFixture::new(configs::TWO_VERSIONS);
    for version in ["v1", "v2"] {
        fixture.header(version).fragment(
            version,
            "users.yaml",
            "paths:\n  /users:\n    get: {operationId: listUsers}\n",
        );
    }

    apigentools()
        .current_dir(fixture.path())
        .arg("merge")
        .assert()
        .success();

    for version in ["v1", "v2"] {
        let full_spec = fixture.path().join(format!("spec/{}/full_spec.yaml", version));
        assert!(full_spec.exists(), "missing full spec for {}", version);
        let content = std::fs::read_to_string(full_spec).unwrap();
        assert!(content.contains("/users"));
        assert!(content.contains("openapi: 3.0.0"));
    }
}

#[test]
fn test_merge_with_version_filter() {
    let fixture = SpecRepoFixture::new(configs::TWO_VERSIONS);
    for version in ["v1", "v2"] {
        fixture
            .header(version)
            .fragment(version, "users.yaml", "paths: {}\n");
    }

    apigentools()
        .current_dir(fixture.path())
        .args(["merge", "--api-versions", "v1"])
        .assert()
        .success();

    assert!(fixture.path().join("spec/v1/full_spec.yaml").exists());
    assert!(!fixture.path().join("spec/v2/full_spec.yaml").exists());
}

#[test]
fn test_merge_missing_section_fails_naming_it() {
    let fixture = SpecRepoFixture::new(configs::TWO_VERSIONS);
    fixture.header("v1");
    // users.yaml deliberately missing for v1, v2 complete
    fixture.header("v2").fragment("v2", "users.yaml", "paths: {}\n");

    apigentools()
        .current_dir(fixture.path())
        .arg("merge")
        .assert()
        .failure()
        .stderr(predicate::str::contains("users.yaml"));
}

#[test]
fn test_merge_duplicate_path_fails() {
    let fixture = SpecRepoFixture::new(
        r#"
spec_versions: [v1]
spec_sections:
  v1: [a.yaml, b.yaml]
languages: {}
"#,
    );
    fixture
        .fragment("v1", "a.yaml", "paths:\n  /same:\n    get: {operationId: a}\n")
        .fragment("v1", "b.yaml", "paths:\n  /same:\n    get: {operationId: b}\n");

    apigentools()
        .current_dir(fixture.path())
        .arg("merge")
        .assert()
        .failure()
        .stderr(predicate::str::contains("/same"));

    assert!(!fixture.path().join("spec/v1/full_spec.yaml").exists());
}

#[test]
fn test_merge_unknown_version_filter_fails() {
    let fixture = SpecRepoFixture::new(configs::TWO_VERSIONS);
    fixture.header("v1").fragment("v1", "users.yaml", "paths: {}\n");

    apigentools()
        .current_dir(fixture.path())
        .args(["merge", "--api-versions", "v9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("v9"));
}
