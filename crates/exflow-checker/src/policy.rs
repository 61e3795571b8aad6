//! Classification policy and analysis toggles.
//!
//! A [`ClassificationPolicy`] is built once from [`Settings`] and shared
//! read-only by every scope analysis of a session.

use crate::config::{ConfigError, Settings};
use bitflags::bitflags;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use rustc_hash::FxHashMap;

bitflags! {
    /// Feature toggles of one analysis session.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AnalysisFlags: u32 {
        /// Read `<exception>` tags from doc comments and sidecar files.
        const DOC_INTEROP = 1 << 0;
        /// Model deferred sequence pipelines.
        const LINQ_SUPPORT = 1 << 1;
        /// Lambdas passed to pipeline operators implicitly declare what they throw.
        const LINQ_IMPLICIT_DECLARATION = 1 << 2;
        /// Report pipelines that leave a scope without being enumerated.
        const LINQ_BOUNDARY_WARNINGS = 1 << 3;
        const CONTROL_FLOW = 1 << 4;
        /// Catch and declaration redundancy without reachability.
        const LEGACY_REDUNDANCY = 1 << 5;
        const BASE_DECLARED_DIAGNOSTIC = 1 << 6;
        const BASE_THROWN_DIAGNOSTIC = 1 << 7;
        /// A declared `System.Exception` covers everything else the scope throws.
        const GENERAL_AS_CATCH_REST = 1 << 8;
        /// Treat every scope as a checked arithmetic context.
        const CHECK_OVERFLOW = 1 << 9;
        /// Use nullable annotations to drop `ArgumentNullException`.
        const NULLABLE_CONTEXT = 1 << 10;
    }
}

impl Default for AnalysisFlags {
    fn default() -> Self {
        AnalysisFlags::DOC_INTEROP
            | AnalysisFlags::LINQ_SUPPORT
            | AnalysisFlags::LINQ_IMPLICIT_DECLARATION
            | AnalysisFlags::LINQ_BOUNDARY_WARNINGS
            | AnalysisFlags::CONTROL_FLOW
            | AnalysisFlags::BASE_DECLARED_DIAGNOSTIC
            | AnalysisFlags::BASE_THROWN_DIAGNOSTIC
            | AnalysisFlags::NULLABLE_CONTEXT
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Never tracked.
    Ignored,
    /// Reported as a message, never required to be handled.
    Informational,
    /// Must be handled or declared.
    Strict,
}

impl Classification {
    fn parse(exception: &str, value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignored" | "ignore" => Ok(Classification::Ignored),
            "informational" | "info" => Ok(Classification::Informational),
            "strict" => Ok(Classification::Strict),
            _ => Err(ConfigError::UnknownClassification {
                exception: exception.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Accessors that unattributed property documentation applies to when the
/// property has both a getter and a setter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccessorDefault {
    #[default]
    Getter,
    Both,
}

#[derive(Clone, Debug)]
pub struct ClassificationPolicy {
    pub flags: AnalysisFlags,
    pub accessor_default: AccessorDefault,
    /// Exact names, fully qualified or simple.
    overrides: FxHashMap<String, Classification>,
    ignored: PatternList,
    informational: PatternList,
}

/// Wildcard entries of one settings list. A `!` entry vetoes the positive
/// entries of the same list only.
#[derive(Clone, Debug)]
struct PatternList {
    include: GlobSet,
    exclude: GlobSet,
}

impl PatternList {
    fn empty() -> Self {
        PatternList {
            include: GlobSet::empty(),
            exclude: GlobSet::empty(),
        }
    }

    fn matches(&self, full_name: &str, simple_name: &str) -> bool {
        let hit = |set: &GlobSet| set.is_match(full_name) || set.is_match(simple_name);
        hit(&self.include) && !hit(&self.exclude)
    }
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        ClassificationPolicy {
            flags: AnalysisFlags::default(),
            accessor_default: AccessorDefault::default(),
            overrides: FxHashMap::default(),
            ignored: PatternList::empty(),
            informational: PatternList::empty(),
        }
    }
}

/// Only `*` is a wildcard; every other glob metacharacter is literal.
fn glob(pattern: &str) -> Result<globset::Glob, ConfigError> {
    let escaped = pattern
        .split('*')
        .map(globset::escape)
        .collect::<Vec<_>>()
        .join("*");
    GlobBuilder::new(&escaped)
        .literal_separator(false)
        .build()
        .map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

fn build_set(builder: GlobSetBuilder, pattern: &str) -> Result<GlobSet, ConfigError> {
    builder.build().map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl ClassificationPolicy {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let mut overrides = FxHashMap::default();
        let ignored = pattern_list(
            &settings.ignored_exceptions,
            Classification::Ignored,
            "ignoredExceptions",
            &mut overrides,
        )?;
        let informational = pattern_list(
            &settings.informational_exceptions,
            Classification::Informational,
            "informationalExceptions",
            &mut overrides,
        )?;
        for (exception, value) in &settings.exceptions {
            overrides.insert(exception.trim().to_string(), Classification::parse(exception, value)?);
        }

        let accessor_default = match settings.ambiguous_accessor_documentation.as_deref() {
            None => AccessorDefault::Getter,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "getter" => AccessorDefault::Getter,
                "both" => AccessorDefault::Both,
                _ => return Err(ConfigError::UnknownAccessorDefault(value.to_string())),
            },
        };

        Ok(ClassificationPolicy {
            flags: flags_from_settings(settings),
            accessor_default,
            overrides,
            ignored,
            informational,
        })
    }

    #[inline]
    pub fn is_enabled(&self, flag: AnalysisFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Classify an exception by its fully qualified and simple names.
    pub fn classify(&self, full_name: &str, simple_name: &str) -> Classification {
        if let Some(&exact) = self
            .overrides
            .get(full_name)
            .or_else(|| self.overrides.get(simple_name))
        {
            return exact;
        }
        if self.ignored.matches(full_name, simple_name) {
            return Classification::Ignored;
        }
        if self.informational.matches(full_name, simple_name) {
            return Classification::Informational;
        }
        Classification::Strict
    }
}

/// Split one settings list into wildcard and negated patterns. Plain names
/// become exact overrides.
fn pattern_list(
    patterns: &[String],
    classification: Classification,
    list_name: &str,
    overrides: &mut FxHashMap<String, Classification>,
) -> Result<PatternList, ConfigError> {
    let mut include = GlobSetBuilder::new();
    let mut exclude = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.trim();
        if let Some(negated) = pattern.strip_prefix('!') {
            exclude.add(glob(negated.trim())?);
        } else if pattern.contains('*') {
            include.add(glob(pattern)?);
        } else if !pattern.is_empty() {
            overrides.insert(pattern.to_string(), classification);
        }
    }
    Ok(PatternList {
        include: build_set(include, list_name)?,
        exclude: build_set(exclude, list_name)?,
    })
}

fn flags_from_settings(settings: &Settings) -> AnalysisFlags {
    let mut flags = AnalysisFlags::default();
    let toggles = [
        (settings.disable_xml_doc_interop, AnalysisFlags::DOC_INTEROP, true),
        (settings.disable_linq_support, AnalysisFlags::LINQ_SUPPORT, true),
        (
            settings.disable_linq_implicitly_declared_exceptions,
            AnalysisFlags::LINQ_IMPLICIT_DECLARATION,
            true,
        ),
        (
            settings.disable_linq_enumerable_boundary_warnings,
            AnalysisFlags::LINQ_BOUNDARY_WARNINGS,
            true,
        ),
        (settings.disable_control_flow_analysis, AnalysisFlags::CONTROL_FLOW, true),
        (settings.enable_legacy_redundancy_checks, AnalysisFlags::LEGACY_REDUNDANCY, false),
        (
            settings.disable_base_exception_declared_diagnostic,
            AnalysisFlags::BASE_DECLARED_DIAGNOSTIC,
            true,
        ),
        (
            settings.disable_base_exception_thrown_diagnostic,
            AnalysisFlags::BASE_THROWN_DIAGNOSTIC,
            true,
        ),
        (
            settings.treat_throws_exception_as_catch_rest,
            AnalysisFlags::GENERAL_AS_CATCH_REST,
            false,
        ),
        (settings.check_overflow, AnalysisFlags::CHECK_OVERFLOW, false),
        (settings.nullable_context, AnalysisFlags::NULLABLE_CONTEXT, false),
    ];
    // `inverted` toggles are written as "disable..." in the settings file.
    for (value, flag, inverted) in toggles {
        if let Some(value) = value {
            flags.set(flag, value != inverted);
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_settings;

    fn policy(json: &str) -> ClassificationPolicy {
        ClassificationPolicy::from_settings(&parse_settings(json).unwrap()).unwrap()
    }

    #[test]
    fn defaults_to_strict() {
        let policy = ClassificationPolicy::default();
        assert_eq!(
            policy.classify("System.IO.IOException", "IOException"),
            Classification::Strict
        );
        assert!(policy.is_enabled(AnalysisFlags::CONTROL_FLOW));
        assert!(!policy.is_enabled(AnalysisFlags::LEGACY_REDUNDANCY));
    }

    #[test]
    fn exact_override_beats_wildcards() {
        let policy = policy(
            r#"{
                "ignoredExceptions": ["System.*"],
                "exceptions": { "System.IO.IOException": "Strict", "TimeoutException": "informational" }
            }"#,
        );
        assert_eq!(
            policy.classify("System.IO.IOException", "IOException"),
            Classification::Strict
        );
        assert_eq!(
            policy.classify("System.TimeoutException", "TimeoutException"),
            Classification::Informational
        );
        assert_eq!(
            policy.classify("System.FormatException", "FormatException"),
            Classification::Ignored
        );
    }

    #[test]
    fn negation_wins_over_positive_patterns_of_its_list() {
        let policy = policy(
            r#"{
                "ignoredExceptions": ["System.*", "!System.IO.*"],
                "informationalExceptions": ["System.Net.*", "!*Timeout*"]
            }"#,
        );
        assert_eq!(
            policy.classify("System.IO.FileNotFoundException", "FileNotFoundException"),
            Classification::Strict
        );
        assert_eq!(
            policy.classify("System.ArgumentException", "ArgumentException"),
            Classification::Ignored
        );
    }

    #[test]
    fn negation_does_not_cross_lists() {
        let policy = policy(
            r#"{
                "ignoredExceptions": ["System.*", "!System.IO.*"],
                "informationalExceptions": ["System.IO.*", "!*Timeout*"]
            }"#,
        );
        assert_eq!(
            policy.classify("System.IO.FileNotFoundException", "FileNotFoundException"),
            Classification::Informational
        );
        // Vetoed from the informational list, still ignored by its own.
        assert_eq!(
            policy.classify("System.TimeoutException", "TimeoutException"),
            Classification::Ignored
        );
    }

    #[test]
    fn only_star_is_a_wildcard() {
        let policy = policy(
            r#"{ "ignoredExceptions": ["My.Err?r*", "My.[AB]*", "My.{X,Y}*"] }"#,
        );
        assert_eq!(policy.classify("My.Err?rException", "Err?rException"), Classification::Ignored);
        assert_eq!(policy.classify("My.ErrorException", "ErrorException"), Classification::Strict);
        assert_eq!(policy.classify("My.[AB]Failure", "[AB]Failure"), Classification::Ignored);
        assert_eq!(policy.classify("My.AFailure", "AFailure"), Classification::Strict);
        assert_eq!(policy.classify("My.{X,Y}Failure", "{X,Y}Failure"), Classification::Ignored);
        assert_eq!(policy.classify("My.XFailure", "XFailure"), Classification::Strict);
    }

    #[test]
    fn ignored_patterns_apply_before_informational() {
        let policy = policy(
            r#"{ "ignoredExceptions": ["*Argument*"], "informationalExceptions": ["System.*"] }"#,
        );
        assert_eq!(
            policy.classify("System.ArgumentNullException", "ArgumentNullException"),
            Classification::Ignored
        );
        assert_eq!(
            policy.classify("System.FormatException", "FormatException"),
            Classification::Informational
        );
    }

    #[test]
    fn list_entries_without_wildcards_are_exact() {
        let policy = policy(r#"{ "informationalExceptions": ["System.NotImplementedException"] }"#);
        assert_eq!(
            policy.classify("System.NotImplementedException", "NotImplementedException"),
            Classification::Informational
        );
        assert_eq!(
            policy.classify("My.NotImplementedExceptionEx", "NotImplementedExceptionEx"),
            Classification::Strict
        );
    }

    #[test]
    fn toggles_map_onto_flags() {
        let policy = policy(
            r#"{
                "disableControlFlowAnalysis": true,
                "enableLegacyRedundancyChecks": "true",
                "checkOverflow": true,
                "nullableContext": false,
                "ambiguousAccessorDocumentation": "both"
            }"#,
        );
        assert!(!policy.is_enabled(AnalysisFlags::CONTROL_FLOW));
        assert!(policy.is_enabled(AnalysisFlags::LEGACY_REDUNDANCY));
        assert!(policy.is_enabled(AnalysisFlags::CHECK_OVERFLOW));
        assert!(!policy.is_enabled(AnalysisFlags::NULLABLE_CONTEXT));
        assert!(policy.is_enabled(AnalysisFlags::DOC_INTEROP));
        assert_eq!(policy.accessor_default, AccessorDefault::Both);
    }

    #[test]
    fn rejects_unknown_classification() {
        let settings = parse_settings(r#"{ "exceptions": { "X": "sometimes" } }"#).unwrap();
        let error = ClassificationPolicy::from_settings(&settings).unwrap_err();
        assert!(matches!(error, ConfigError::UnknownClassification { .. }));
    }

    #[test]
    fn rejects_unknown_accessor_default() {
        let settings = parse_settings(r#"{ "ambiguousAccessorDocumentation": "setter" }"#).unwrap();
        assert!(matches!(
            ClassificationPolicy::from_settings(&settings),
            Err(ConfigError::UnknownAccessorDefault(_))
        ));
    }
}
