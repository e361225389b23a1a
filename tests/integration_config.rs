//! Integration tests for configuration resolution through the public API.

use apigentools::config::Config;

#[test]
fn test_language_without_overrides_inherits_everything() {
    let config = Config::parse(
        r#"
spec_versions: [v1, v2]
spec_sections:
  v1: [x.yaml]
  v2: [y.yaml]
languages:
  java: {}
"#,
    )
    .unwrap();

    let java = config.get_language_config("java").unwrap();
    assert_eq!(java.spec_versions(), ["v1", "v2"]);
    assert_eq!(java.spec_sections_for("v1"), ["x.yaml"]);
    assert_eq!(java.spec_sections_for("v2"), ["y.yaml"]);
}

#[test]
fn test_version_fallback_completeness() {
    // whatever the generation map looks like, commands_for never comes back
    // "missing" for a version the language declares
    let config = Config::parse(
        r#"
spec_versions: [v1, v2, v3]
languages:
  java:
    generation:
      default:
        commands:
          - commandline: [echo, default]
      v2:
        commands:
          - commandline: [echo, own]
"#,
    )
    .unwrap();

    let java = config.get_language_config("java").unwrap();
    for version in java.spec_versions() {
        let commands = java.commands_for(version);
        assert!(
            !commands.is_empty(),
            "version {} resolved to no commands",
            version
        );
    }
    // v2 kept its own commands, v1/v3 fell back to the default generation's
    assert_eq!(java.commands_for("v2").len(), 1);
    assert_eq!(java.commands_for("v1"), java.commands_for("v3"));
}

#[test]
fn test_empty_generation_falls_back_to_empty_lists() {
    let config = Config::parse(
        r#"
spec_versions: [v1]
languages:
  go: {}
"#,
    )
    .unwrap();

    let go = config.get_language_config("go").unwrap();
    assert!(go.commands_for("v1").is_empty());
    assert!(go.test_commands_for("v1").is_empty());
    assert!(go.validation_commands_for("v1").is_empty());
    assert!(go.templates_config_for("v1").is_none());
}

#[test]
fn test_config_is_queryable_after_resolution_only_through_accessors() {
    let config = Config::parse(
        r#"
spec_versions: [v1]
validation_commands:
  - commandline: [echo, validate]
languages:
  go: {}
"#,
    )
    .unwrap();

    let go = config.get_language_config("go").unwrap();
    // root validation commands flow all the way down to the language pair
    assert_eq!(go.validation_commands_for("v1").len(), 1);
}
