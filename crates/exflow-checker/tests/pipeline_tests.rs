//! Deferred sequence pipelines: harvesting at enumeration, implicitly
//! declared lambda exceptions and pipelines leaving their scope.

use exflow_binder::ProgramBuilder;
use exflow_checker::{AnalysisSession, parse_settings};
use exflow_common::Diagnostic;

/// Only the `FormatException` of `int.Parse` is left, so each parse yields
/// exactly one diagnostic.
const FORMAT_ONLY: &str =
    r#"{ "ignoredExceptions": ["System.ArgumentNullException", "System.OverflowException"] }"#;

fn check_with(source: &str, settings: &str) -> Vec<Diagnostic> {
    let mut builder = ProgramBuilder::new();
    builder.add_source("pipeline.cs", source);
    let state = builder.bind();
    assert!(
        state.parse_diagnostics().is_empty(),
        "unexpected parse errors: {:?}",
        state.parse_diagnostics()
    );
    let settings = parse_settings(settings).expect("settings parse");
    AnalysisSession::from_settings(&settings)
        .expect("valid settings")
        .analyze(&state)
}

fn with_settings(extra: &str) -> String {
    format!(
        r#"{{ "ignoredExceptions": ["System.ArgumentNullException", "System.OverflowException"], {extra} }}"#
    )
}

fn get_codes(diagnostics: &[Diagnostic]) -> Vec<u32> {
    let mut codes: Vec<u32> = diagnostics.iter().map(|d| d.code).collect();
    codes.sort_unstable();
    codes
}

fn find_code(diagnostics: &[Diagnostic], code: u32) -> &Diagnostic {
    diagnostics
        .iter()
        .find(|d| d.code == code)
        .unwrap_or_else(|| panic!("no {code} in {diagnostics:?}"))
}

#[test]
fn terminal_operator_failure_is_reported_at_the_pipeline() {
    let source = r#"
using System.Collections.Generic;
using System.Linq;
class C
{
    int M(IEnumerable<int> xs)
    {
        return xs.Where(x => x > 0).First();
    }
}
"#;
    let diagnostics = check_with(source, "{}");
    assert_eq!(get_codes(&diagnostics), vec![1]);
    let d = &diagnostics[0];
    assert_eq!(d.exception_type.as_deref(), Some("System.InvalidOperationException"));
    assert_eq!(d.start as usize, source.find("xs.Where").expect("pipeline"));
}

#[test]
fn lambda_exceptions_surface_at_materialization() {
    let source = r#"
using System.Collections.Generic;
using System.Linq;
class C
{
    List<int> M(IEnumerable<string> names)
    {
        return names.Select(n => int.Parse(n)).ToList();
    }
}
"#;
    let diagnostics = check_with(source, FORMAT_ONLY);
    assert_eq!(get_codes(&diagnostics), vec![1, 18]);

    let implicit = find_code(&diagnostics, 18);
    assert_eq!(implicit.exception_type.as_deref(), Some("System.FormatException"));
    assert_eq!(implicit.start as usize, source.find("int.Parse").expect("parse"));

    let harvested = find_code(&diagnostics, 1);
    assert_eq!(harvested.exception_type.as_deref(), Some("System.FormatException"));
    assert_eq!(harvested.start as usize, source.find("names.Select").expect("pipeline"));
}

#[test]
fn materialization_inside_try_is_handled() {
    let diagnostics = check_with(
        r#"
using System;
using System.Collections.Generic;
using System.Linq;
class C
{
    List<int> M(IEnumerable<string> names)
    {
        try { return names.Select(n => int.Parse(n)).ToList(); }
        catch (FormatException) { return new List<int>(); }
    }
}
"#,
        FORMAT_ONLY,
    );
    assert_eq!(get_codes(&diagnostics), vec![18]);
}

#[test]
fn returned_deferred_pipeline_crosses_the_boundary() {
    let source = r#"
using System.Collections.Generic;
using System.Linq;
class C
{
    IEnumerable<int> M(IEnumerable<string> xs)
    {
        return xs.Select(x => int.Parse(x));
    }
}
"#;
    let diagnostics = check_with(source, FORMAT_ONLY);
    assert_eq!(get_codes(&diagnostics), vec![18, 19]);
    let boundary = find_code(&diagnostics, 19);
    assert_eq!(boundary.exception_type.as_deref(), Some("System.FormatException"));
    assert_eq!(boundary.start as usize, source.find("xs.Select").expect("pipeline"));
}

#[test]
fn returned_alias_of_deferred_pipeline() {
    let diagnostics = check_with(
        r#"
using System.Collections.Generic;
using System.Linq;
class C
{
    IEnumerable<int> M(IEnumerable<string> xs)
    {
        var parsed = xs.Select(x => int.Parse(x));
        return parsed;
    }
}
"#,
        FORMAT_ONLY,
    );
    assert_eq!(get_codes(&diagnostics), vec![18, 19]);
}

#[test]
fn deferred_pipeline_passed_to_ordinary_method() {
    let diagnostics = check_with(
        r#"
using System.Collections.Generic;
using System.Linq;
class C
{
    void Consume(IEnumerable<int> values) { }

    void M(IEnumerable<string> xs)
    {
        Consume(xs.Select(x => int.Parse(x)));
    }
}
"#,
        FORMAT_ONLY,
    );
    assert_eq!(get_codes(&diagnostics), vec![18, 19]);
}

#[test]
fn boundary_warnings_can_be_disabled() {
    let diagnostics = check_with(
        r#"
using System.Collections.Generic;
using System.Linq;
class C
{
    IEnumerable<int> M(IEnumerable<string> xs)
    {
        return xs.Select(x => int.Parse(x));
    }
}
"#,
        &with_settings(r#""disableLinqEnumerableBoundaryWarnings": true"#),
    );
    assert_eq!(get_codes(&diagnostics), vec![18]);
}

#[test]
fn without_implicit_declaration_lambdas_report_their_own_escapes() {
    let source = r#"
using System.Collections.Generic;
using System.Linq;
class C
{
    List<int> M(IEnumerable<string> names)
    {
        return names.Select(n => int.Parse(n)).ToList();
    }
}
"#;
    let diagnostics = check_with(
        source,
        &with_settings(r#""disableLinqImplicitlyDeclaredExceptions": true"#),
    );
    assert_eq!(get_codes(&diagnostics), vec![1]);
    assert_eq!(
        diagnostics[0].start as usize,
        source.find("int.Parse").expect("parse")
    );
}

#[test]
fn without_sequence_support_lambdas_are_ordinary() {
    let source = r#"
using System.Collections.Generic;
using System.Linq;
class C
{
    int M(IEnumerable<string> names)
    {
        return names.Select(n => int.Parse(n)).First();
    }
}
"#;
    let diagnostics = check_with(source, &with_settings(r#""disableLinqSupport": true"#));
    assert_eq!(get_codes(&diagnostics), vec![1]);
    assert_eq!(
        diagnostics[0].start as usize,
        source.find("int.Parse").expect("parse")
    );
}

#[test]
fn foreach_enumerates_the_pipeline() {
    let source = r#"
using System;
using System.Collections.Generic;
using System.Linq;
class C
{
    void M(IEnumerable<string> names)
    {
        foreach (var n in names.Select(x => int.Parse(x)))
        {
            Console.WriteLine(n);
        }
    }
}
"#;
    let diagnostics = check_with(source, FORMAT_ONLY);
    assert_eq!(get_codes(&diagnostics), vec![1, 18]);
    let enumerated = find_code(&diagnostics, 1);
    assert_eq!(enumerated.exception_type.as_deref(), Some("System.FormatException"));
    assert_eq!(enumerated.start as usize, source.find("names.Select").expect("source"));
}

#[test]
fn every_stage_is_harvested() {
    let diagnostics = check_with(
        r#"
using System.Collections.Generic;
using System.Linq;
class C
{
    int M(IEnumerable<string> names)
    {
        var parsed = names.Select(n => int.Parse(n));
        return parsed.Where(p => p > 0).First();
    }
}
"#,
        FORMAT_ONLY,
    );
    let mut types: Vec<&str> = diagnostics
        .iter()
        .filter(|d| d.code == 1)
        .filter_map(|d| d.exception_type.as_deref())
        .collect();
    types.sort_unstable();
    assert_eq!(types, vec!["System.FormatException", "System.InvalidOperationException"]);
}
