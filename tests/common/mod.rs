//! Shared test utilities for integration and E2E tests.
//!
//! Provides a spec-repo fixture builder so individual test files don't
//! repeat the conventional directory layout.

use assert_fs::prelude::*;
use assert_fs::TempDir;

/// Common configuration YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// Two versions, two fragment files each, one language without overrides.
    pub const TWO_VERSIONS: &str = r#"
spec_versions: [v1, v2]
spec_sections:
  v1: [header.yaml, users.yaml]
  v2: [header.yaml, users.yaml]
user_agent_client_name: MyClient
languages:
  java:
    github_repo_name: my-api-client-java
    github_org_name: myorg
    library_version: "1.0.0"
"#;

    /// One language restricted to a subset of the global versions.
    pub const SUBSET_LANGUAGE: &str = r#"
spec_versions: [v1, v2]
spec_sections:
  v1: [header.yaml]
  v2: [header.yaml]
languages:
  java:
    spec_versions: [v1]
"#;
}

/// A scratch spec repository with the conventional layout.
pub struct SpecRepoFixture {
    pub temp: TempDir,
}

#[allow(dead_code)]
impl SpecRepoFixture {
    pub fn new(config_yaml: &str) -> Self {
        let temp = TempDir::new().unwrap();
        temp.child("config/config.yaml").write_str(config_yaml).unwrap();
        SpecRepoFixture { temp }
    }

    /// Write a spec fragment under `spec/<version>/<name>`.
    pub fn fragment(&self, version: &str, name: &str, content: &str) -> &Self {
        self.temp
            .child(format!("spec/{}/{}", version, name))
            .write_str(content)
            .unwrap();
        self
    }

    /// Conventional header fragment for a version.
    pub fn header(&self, version: &str) -> &Self {
        self.fragment(
            version,
            "header.yaml",
            "openapi: 3.0.0\ninfo:\n  title: My API\n  version: 1.0.0\n",
        )
    }

    pub fn path(&self) -> &std::path::Path {
        self.temp.path()
    }
}
