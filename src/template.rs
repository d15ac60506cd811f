//! Placeholder interpolation for catalog URL templates
//!
//! Handles `{{ variable }}` placeholders such as `{{workspace}}`, `{{region}}`
//! and `{{cloudId}}` in base URL and module path templates.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Source of placeholder values
pub trait TemplateVars {
    /// Look up a variable by name
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl TemplateVars for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Render a template, failing with `MissingMetadata` naming every absent key.
/// Malformed placeholders are a `Config` error.
pub fn render(template: &str, vars: &impl TemplateVars) -> Result<String> {
    validate(template)?;
    let mut missing: Vec<String> = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let name = &cap[1];
        match vars.lookup(name) {
            Some(value) => value.to_string(),
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                cap[0].to_string()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::MissingMetadata { keys: missing })
    }
}

/// Check that every `{{` in a template opens a well-formed placeholder
pub fn validate(template: &str) -> Result<()> {
    let opens = template.matches("{{").count();
    let wellformed = TEMPLATE_REGEX.find_iter(template).count();
    if opens == wellformed {
        Ok(())
    } else {
        Err(Error::config(format!("malformed placeholder in '{template}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_simple_substitution() {
        let v = vars(&[("workspace", "acme")]);
        let result = render("https://{{workspace}}.atlassian.net", &v).unwrap();
        assert_eq!(result, "https://acme.atlassian.net");
    }

    #[test]
    fn test_multiple_substitutions() {
        let v = vars(&[("region", "us-east-1"), ("cloudId", "abc")]);
        let result = render("https://{{ region }}.example.com/ex/{{cloudId}}", &v).unwrap();
        assert_eq!(result, "https://us-east-1.example.com/ex/abc");
    }

    #[test]
    fn test_missing_variables_are_all_named() {
        let v = vars(&[("workspace", "")]);
        let err = render("https://{{workspace}}.{{region}}/{{region}}", &v).unwrap_err();
        assert!(err.is(ErrorKind::MissingMetadata));
        match err {
            Error::MissingMetadata { keys } => assert_eq!(keys, vec!["workspace", "region"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_templates() {
        let result = render("https://api.atlassian.com", &vars(&[])).unwrap();
        assert_eq!(result, "https://api.atlassian.com");
    }

    #[test]
    fn test_render_rejects_malformed_placeholder() {
        let err = render("https://{{workspace.example.com", &vars(&[("workspace", "acme")]))
            .unwrap_err();
        assert!(err.is(ErrorKind::Config));
    }

    #[test]
    fn test_validate() {
        assert!(validate("https://{{workspace}}.example.com").is_ok());
        assert!(validate("https://{{ bad-name }}.example.com").is_err());
        assert!(validate("https://{{workspace.example.com").is_err());
    }
}
