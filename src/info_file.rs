//! The `.apigentools-info` marker file.
//!
//! After a successful generation, a marker file is written into each
//! language's generated repository recording tool version and per-version
//! regeneration provenance. The current schema (`info_version: "2"`) keys
//! regeneration records by spec version.
//!
//! Older files are upgraded in place rather than overwritten wholesale:
//! unknown top-level keys (the flat fields of the v1 schema, or anything a
//! future schema adds) are preserved verbatim, so prior records survive a
//! regeneration with a newer tool.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::defaults::INFO_FILE_NAME;
use crate::error::Result;

/// Current schema version of the marker file.
pub const INFO_SCHEMA_VERSION: &str = "2";

/// Provenance record for one regeneration of one spec version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegenerationRecord {
    pub apigentools_version: String,
    /// RFC 3339 UTC timestamp of the regeneration.
    pub regenerated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_repo_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codegen_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_stamps: Vec<String>,
}

impl RegenerationRecord {
    /// A record stamped with the current time.
    pub fn now(
        apigentools_version: &str,
        spec_repo_commit: Option<String>,
        codegen_version: Option<String>,
        image: Option<String>,
        additional_stamps: Vec<String>,
    ) -> Self {
        RegenerationRecord {
            apigentools_version: apigentools_version.to_string(),
            regenerated: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            spec_repo_commit,
            codegen_version,
            image,
            additional_stamps,
        }
    }
}

/// Insert or replace the regeneration record for `version` in the marker
/// file of a generated repository, creating or upgrading the file as needed.
pub fn update_info_file(
    generated_lang_dir: &Path,
    version: &str,
    record: &RegenerationRecord,
) -> Result<()> {
    let path = generated_lang_dir.join(INFO_FILE_NAME);

    let mut document: Map<String, Value> = if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&content)? {
            Value::Object(map) => map,
            // a non-object file is unusable; start over
            _ => Map::new(),
        }
    } else {
        Map::new()
    };

    document.insert(
        "info_version".to_string(),
        Value::String(INFO_SCHEMA_VERSION.to_string()),
    );
    let spec_versions = document
        .entry("spec_versions".to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !spec_versions.is_object() {
        *spec_versions = Value::Object(Map::new());
    }
    if let Value::Object(records) = spec_versions {
        records.insert(version.to_string(), serde_json::to_value(record)?);
    }

    std::fs::write(
        &path,
        format!("{}\n", serde_json::to_string_pretty(&Value::Object(document))?),
    )?;
    Ok(())
}
