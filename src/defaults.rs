//! Default values and layout constants for apigentools.
//!
//! This module centralizes the conventional spec-repo layout (directory
//! names, well-known file names) and the hard-coded fallback values used by
//! the configuration resolution pass, ensuring consistency across commands.

use std::path::{Path, PathBuf};

/// Directory with the tool configuration, relative to the spec repo root.
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Subdirectory of the config dir holding per-language generator configs
/// (`<language>_<version>.json`).
pub const LANGUAGE_CONFIG_DIR: &str = "languages";

/// Directory with per-version spec fragments, relative to the spec repo root.
pub const DEFAULT_SPEC_DIR: &str = "spec";

/// Directory that generated client code is written to.
pub const DEFAULT_GENERATED_CODE_DIR: &str = "generated";

/// Directory that processed upstream templates are written to.
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Directory with patch files applied to upstream templates.
pub const DEFAULT_TEMPLATE_PATCHES_DIR: &str = "template-patches";

/// Directory with templates rendered directly into generated repos.
pub const DEFAULT_DOWNSTREAM_TEMPLATES_DIR: &str = "downstream-templates";

/// Name of the assembled full-spec file inside `spec/<version>/`.
pub const DEFAULT_FULL_SPEC_FILE: &str = "full_spec.yaml";

/// Spec fragment carrying document-level metadata (`info`, `servers`, ...).
pub const HEADER_FILE_NAME: &str = "header.yaml";

/// Base name of the spec section holding content shared between sections.
pub const SHARED_SECTION_NAME: &str = "shared";

/// Executor used when the configuration does not name one.
pub const DEFAULT_CODEGEN_EXEC: &str = "openapi-generator";

/// Container image used when neither the configuration nor any parent level
/// provides one.
pub const DEFAULT_CONTAINER_IMAGE: &str = "apigentools/apigentools:latest";

/// Upstream repository of the external generator, used as the default
/// `openapi-git` templates source.
pub const OPENAPI_GENERATOR_GIT: &str = "https://github.com/OpenAPITools/openapi-generator";

/// Marker substituted for secret command-line values in logs and errors.
pub const REDACTED_OUT_SECRET: &str = "<apigentools:secret-value-redacted-out>";

/// Path the invocation working directory is mounted at inside containers.
pub const SPEC_REPO_MOUNTPOINT: &str = "/tmp/spec-repo";

/// Marker file recording generation provenance in each generated repo.
pub const INFO_FILE_NAME: &str = ".apigentools-info";

/// File at a generated repo root listing regexes of generated files.
pub const GENERATED_FILES_BLACKLIST: &str = ".generated_files";

/// Template producing the public URL of a language's target repository.
pub const GITHUB_REPO_URL_TEMPLATE: &str = "github.com/{{github_repo_org}}/{{github_repo_name}}";

/// Locate the configuration file inside a config directory.
///
/// Tries `config.yaml`, `config.yml` and `config.json` in that order and
/// returns the first one that exists, or `config.yaml` as the conventional
/// default when none does (letting the caller surface the I/O error with the
/// conventional name in it).
pub fn locate_config_file(config_dir: &Path) -> PathBuf {
    for candidate in ["config.yaml", "config.yml", "config.json"] {
        let path = config_dir.join(candidate);
        if path.exists() {
            return path;
        }
    }
    config_dir.join("config.yaml")
}
