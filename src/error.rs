//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for
//! `apigentools`. It uses the `thiserror` library to create a comprehensive
//! `Error` enum that covers all anticipated failure modes, providing clear
//! and descriptive error messages.
//!
//! The taxonomy falls into a few groups:
//!
//! - Configuration errors (parse failures, undeclared spec versions, unknown
//!   languages) — always fatal, detected during the config resolution pass.
//! - Spec assembly errors (missing sections, duplicate content across
//!   fragments) — fatal for the `(language, version)` pair being assembled.
//! - Process errors (failed subprocesses or container runs) — carry the exit
//!   code and captured output; output of secret-carrying commands is scrubbed
//!   before the error is constructed.
//! - Wrapped library errors (I/O, YAML, JSON, glob, regex, URL parsing).

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for apigentools operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing or resolving the configuration file.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A language or its spec sections reference a spec version that is not
    /// declared in the top-level `spec_versions` list.
    #[error("Spec version '{version}' referenced by '{referrer}' is not declared in the global spec_versions list")]
    VersionNotFound { version: String, referrer: String },

    /// A language name was requested that is not present in the configuration.
    #[error("Language '{language}' is not configured")]
    UnknownLanguage { language: String },

    /// A declared spec section file does not exist on disk.
    #[error("Spec section '{section}' not found for api version '{version}' ({})", path.display())]
    SpecSectionNotFound {
        version: String,
        section: String,
        path: PathBuf,
    },

    /// Two spec fragments define the same entry; fragments must be disjoint
    /// partitions of the full document.
    #[error("Duplicate entry '{key}' in '{collection}' while merging spec section '{section}'")]
    DuplicateEntry {
        collection: String,
        key: String,
        section: String,
    },

    /// A command references a function that is neither built in nor supplied
    /// by the calling command.
    #[error("Unknown function '{function}' in command '{command}'")]
    UnknownFunction { function: String, command: String },

    /// A subprocess or container run exited with a nonzero status.
    ///
    /// The captured output of secret-carrying commands is scrubbed before
    /// this error is constructed.
    #[error("Command '{description}' failed{}:\n{output}", code.map(|c| format!(" with exit code {}", c)).unwrap_or_default())]
    Process {
        description: String,
        code: Option<i32>,
        output: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    /// An error while iterating glob matches, wrapped from `glob::GlobError`.
    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse() {
        let error = Error::ConfigParse {
            message: "invalid YAML".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("invalid YAML"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "missing spec_versions".to_string(),
            hint: Some("declare spec_versions at the top level".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("declare spec_versions"));
    }

    #[test]
    fn test_error_display_version_not_found() {
        let error = Error::VersionNotFound {
            version: "v3".to_string(),
            referrer: "java".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("v3"));
        assert!(display.contains("java"));
        assert!(display.contains("spec_versions"));
    }

    #[test]
    fn test_error_display_spec_section_not_found() {
        let error = Error::SpecSectionNotFound {
            version: "v1".to_string(),
            section: "nope.yaml".to_string(),
            path: PathBuf::from("spec/v1/nope.yaml"),
        };
        assert_eq!(
            format!("{}", error),
            "Spec section 'nope.yaml' not found for api version 'v1' (spec/v1/nope.yaml)"
        );
    }

    #[test]
    fn test_error_display_process_with_code() {
        let error = Error::Process {
            description: "run tests".to_string(),
            code: Some(2),
            output: "boom".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("exit code 2"));
        assert!(display.contains("boom"));
    }

    #[test]
    fn test_error_display_process_without_code() {
        let error = Error::Process {
            description: "run tests".to_string(),
            code: None,
            output: "killed".to_string(),
        };
        let display = format!("{}", error);
        assert!(!display.contains("exit code"));
        assert!(display.contains("killed"));
    }

    #[test]
    fn test_error_display_unknown_function() {
        let error = Error::UnknownFunction {
            function: "frobnicate".to_string(),
            command: "Prepare sources".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("frobnicate"));
        assert!(display.contains("Prepare sources"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(format!("{}", error).contains("I/O error"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error =
            serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }
}
