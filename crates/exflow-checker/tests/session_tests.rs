//! Session behaviour: ordering, determinism, cancellation and settings.

use exflow_binder::{BinderState, ProgramBuilder};
use exflow_checker::{
    AnalysisSession, CancellationToken, Classification, ConfigError, SETTINGS_FILE_NAME,
    analysis_scopes, discover_settings, load_settings, parse_settings,
};
use std::fs;

const FIRST: &str = r#"
using System;
class First
{
    void B() { throw new FormatException(); }
    void A() { throw new InvalidOperationException(); }
}
"#;

const SECOND: &str = r#"
using System.IO;
class Second
{
    void C() { throw new IOException(); }
    int P => throw new EndOfStreamException();
}
"#;

fn bind(files: &[(&str, &str)]) -> BinderState {
    let mut builder = ProgramBuilder::new();
    for (name, text) in files {
        builder.add_source(name, *text);
    }
    let state = builder.bind();
    assert!(
        state.parse_diagnostics().is_empty(),
        "unexpected parse errors: {:?}",
        state.parse_diagnostics()
    );
    state
}

#[test]
fn diagnostics_are_sorted_by_file_then_position() {
    let state = bind(&[("b.cs", SECOND), ("a.cs", FIRST)]);
    let diagnostics = AnalysisSession::default().analyze(&state);
    let keys: Vec<(&str, u32)> = diagnostics
        .iter()
        .map(|d| (d.file.as_str(), d.start))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(diagnostics.len(), 4, "{diagnostics:?}");
    assert_eq!(diagnostics[0].file, "a.cs");
    assert_eq!(
        diagnostics[0].exception_type.as_deref(),
        Some("System.FormatException")
    );
}

#[test]
fn repeated_runs_are_identical() {
    let state = bind(&[("a.cs", FIRST), ("b.cs", SECOND)]);
    let session = AnalysisSession::default();
    let first = session.analyze(&state);
    let second = session.analyze(&state);
    let fresh = AnalysisSession::default().analyze(&state);
    assert_eq!(first, second);
    assert_eq!(first, fresh);
}

#[test]
fn cancelled_session_reports_nothing() {
    let state = bind(&[("a.cs", FIRST)]);
    let token = CancellationToken::new();
    token.cancel();
    let diagnostics = AnalysisSession::default().analyze_with_cancellation(&state, &token);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn scopes_cover_members_and_properties_of_user_files() {
    let state = bind(&[("b.cs", SECOND)]);
    // C, the expression-bodied property P.
    assert_eq!(analysis_scopes(&state).len(), 2);
}

#[test]
fn classification_map_overrides_defaults() {
    let settings = parse_settings(
        r#"{
            // trailing commas and comments are tolerated
            "exceptions": {
                "System.FormatException": "Ignored",
                "System.InvalidOperationException": "Informational",
            },
        }"#,
    )
    .unwrap();
    let session = AnalysisSession::from_settings(&settings).unwrap();
    let state = bind(&[("a.cs", FIRST)]);
    let diagnostics = session.analyze(&state);
    let codes: Vec<u32> = diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![2]);
    assert_eq!(
        session.policy().classify("System.FormatException", "FormatException"),
        Classification::Ignored
    );
}

#[test]
fn invalid_settings_are_errors() {
    let classification = parse_settings(r#"{ "exceptions": { "System.IO.IOException": "Sometimes" } }"#)
        .unwrap();
    assert!(matches!(
        AnalysisSession::from_settings(&classification),
        Err(ConfigError::UnknownClassification { .. })
    ));

    let accessor = parse_settings(r#"{ "ambiguousAccessorDocumentation": "setter" }"#).unwrap();
    assert!(matches!(
        AnalysisSession::from_settings(&accessor),
        Err(ConfigError::UnknownAccessorDefault(_))
    ));

    assert!(matches!(parse_settings("{ not json"), Err(ConfigError::Json(_))));
}

#[test]
fn settings_are_discovered_in_ancestors() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("src").join("app");
    fs::create_dir_all(&nested).unwrap();
    assert!(discover_settings(&nested).is_none());

    let path = dir.path().join(SETTINGS_FILE_NAME);
    fs::write(&path, r#"{ "disableControlFlowAnalysis": "true" }"#).unwrap();
    assert_eq!(discover_settings(&nested), Some(path.clone()));

    let settings = load_settings(&path).unwrap();
    assert_eq!(settings.disable_control_flow_analysis, Some(true));

    assert!(matches!(
        load_settings(&dir.path().join("missing.json")),
        Err(ConfigError::Io { .. })
    ));
}
