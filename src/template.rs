//! Placeholder substitution for command tokens and path templates.
//!
//! Command lines, `version_path_template` values and downstream templates may
//! contain mustache-style `{{name}}` placeholders that are substituted from a
//! variable map at execution time.
//!
//! Substitution is deliberately permissive: a placeholder whose name is not
//! present in the variable map renders as an empty string instead of failing.
//! Several spec-repo configurations in the wild rely on this, so the behavior
//! is pinned by tests here rather than left implicit.

use std::collections::BTreeMap;

/// Substitute `{{name}}` placeholders in `input` from `vars`.
///
/// Placeholder names are trimmed, so `{{ spec_version }}` and
/// `{{spec_version}}` are equivalent. Unknown names render as `""`. Text
/// that looks like an opening delimiter without a closing `}}` is kept
/// verbatim.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use apigentools::template::render;
///
/// let mut vars = BTreeMap::new();
/// vars.insert("spec_version".to_string(), "v1".to_string());
/// assert_eq!(render("api/{{spec_version}}/spec", &vars), "api/v1/spec");
/// assert_eq!(render("{{unknown}}", &vars), "");
/// ```
pub fn render(input: &str, vars: &BTreeMap<String, String>) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let name = after_open[..end].trim();
                if let Some(value) = vars.get(name) {
                    output.push_str(value);
                }
                rest = &after_open[end + 2..];
            }
            None => {
                // Unterminated delimiter, keep the remainder as-is
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}
