//! Analyzer settings (`exflow.settings.json`).
//!
//! The file is JSON with comments and trailing commas tolerated. Boolean
//! options accept `true`/`false` or the strings `"true"`/`"false"`.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SETTINGS_FILE_NAME: &str = "exflow.settings.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown classification '{value}' for exception '{exception}'")]
    UnknownClassification { exception: String, value: String },
    #[error("invalid exception pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("unknown ambiguousAccessorDocumentation value '{0}' (expected \"getter\" or \"both\")")]
    UnknownAccessorDefault(String),
}

fn deserialize_bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(Error::custom(format!(
                "invalid boolean value: '{s}'. Expected true, false, 'true', or 'false'"
            ))),
        },
    }
}

/// Settings as written in the file. Absent options keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub ignored_exceptions: Vec<String>,
    #[serde(default)]
    pub informational_exceptions: Vec<String>,
    /// Exact per-type classification overrides.
    #[serde(default)]
    pub exceptions: IndexMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub disable_xml_doc_interop: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub disable_linq_support: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub disable_linq_implicitly_declared_exceptions: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub disable_linq_enumerable_boundary_warnings: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub disable_control_flow_analysis: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub enable_legacy_redundancy_checks: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub disable_base_exception_declared_diagnostic: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub disable_base_exception_thrown_diagnostic: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub treat_throws_exception_as_catch_rest: Option<bool>,
    #[serde(default)]
    pub ambiguous_accessor_documentation: Option<String>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub check_overflow: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub nullable_context: Option<bool>,
}

pub fn parse_settings(source: &str) -> Result<Settings, ConfigError> {
    let stripped = strip_jsonc(source);
    let normalized = remove_trailing_commas(&stripped);
    Ok(serde_json::from_str(&normalized)?)
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&source)
}

/// Nearest `exflow.settings.json` in `start` or one of its ancestors.
pub fn discover_settings(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(SETTINGS_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

fn strip_jsonc(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(ch) = chars.next() {
        if in_line_comment {
            if ch == '\n' {
                in_line_comment = false;
                out.push(ch);
            }
            continue;
        }

        if in_block_comment {
            if ch == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block_comment = false;
            } else if ch == '\n' {
                out.push(ch);
            }
            continue;
        }

        if in_string {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match (ch, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(ch);
            }
            ('/', Some('/')) => {
                chars.next();
                in_line_comment = true;
            }
            ('/', Some('*')) => {
                chars.next();
                in_block_comment = true;
            }
            _ => out.push(ch),
        }
    }

    out
}

fn remove_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next = chars.clone().find(|c| !c.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_options() {
        let settings = parse_settings(
            r#"{
                "ignoredExceptions": ["System.ArgumentNullException"],
                "exceptions": { "System.NotImplementedException": "Informational" },
                "disableControlFlowAnalysis": true
            }"#,
        )
        .unwrap();
        assert_eq!(settings.ignored_exceptions, vec!["System.ArgumentNullException"]);
        assert_eq!(
            settings.exceptions.get("System.NotImplementedException").map(String::as_str),
            Some("Informational")
        );
        assert_eq!(settings.disable_control_flow_analysis, Some(true));
        assert_eq!(settings.disable_xml_doc_interop, None);
    }

    #[test]
    fn classification_map_keeps_file_order() {
        let settings = parse_settings(
            r#"{ "exceptions": { "Z.Last": "Strict", "A.First": "Ignored", "M.Middle": "info" } }"#,
        )
        .unwrap();
        let keys: Vec<&str> = settings.exceptions.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Z.Last", "A.First", "M.Middle"]);
    }

    #[test]
    fn tolerates_comments_and_trailing_commas() {
        let settings = parse_settings(
            r#"{
                // line comment
                "informationalExceptions": ["System.IO.*",], /* block */
                "checkOverflow": "true",
            }"#,
        )
        .unwrap();
        assert_eq!(settings.informational_exceptions, vec!["System.IO.*"]);
        assert_eq!(settings.check_overflow, Some(true));
    }

    #[test]
    fn keeps_comment_markers_inside_strings() {
        let settings = parse_settings(r#"{ "ignoredExceptions": ["a//b", "c/*d*/"] }"#).unwrap();
        assert_eq!(settings.ignored_exceptions, vec!["a//b", "c/*d*/"]);
    }

    #[test]
    fn rejects_invalid_boolean_strings() {
        let error = parse_settings(r#"{ "disableLinqSupport": "maybe" }"#).unwrap_err();
        assert!(matches!(error, ConfigError::Json(_)));
    }

    #[test]
    fn reports_missing_file_with_path() {
        let error = load_settings(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(error.to_string().contains("/definitely/not/here.json"));
    }
}
