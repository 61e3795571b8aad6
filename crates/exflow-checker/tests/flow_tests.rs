//! End-to-end scenarios: unhandled, handled and rethrown exceptions, catch
//! redundancy and dead code, analysed through an `AnalysisSession`.

use exflow_binder::ProgramBuilder;
use exflow_checker::{AnalysisSession, parse_settings};
use exflow_common::Diagnostic;

fn check_with(source: &str, settings: &str) -> Vec<Diagnostic> {
    let mut builder = ProgramBuilder::new();
    builder.add_source("test.cs", source);
    let state = builder.bind();
    assert!(
        state.parse_diagnostics().is_empty(),
        "unexpected parse errors: {:?}",
        state.parse_diagnostics()
    );
    let settings = parse_settings(settings).expect("settings parse");
    let session = AnalysisSession::from_settings(&settings).expect("valid settings");
    session.analyze(&state)
}

fn check(source: &str) -> Vec<Diagnostic> {
    check_with(source, "{}")
}

fn sorted_codes(diagnostics: &[Diagnostic]) -> Vec<u32> {
    let mut codes: Vec<u32> = diagnostics.iter().map(|d| d.code).collect();
    codes.sort_unstable();
    codes
}

fn with_code(diagnostics: &[Diagnostic], code: u32) -> Vec<&Diagnostic> {
    diagnostics.iter().filter(|d| d.code == code).collect()
}

#[test]
fn unhandled_throw_is_reported_at_the_throw() {
    let source = r#"
using System;
class C
{
    void M() { throw new InvalidOperationException(); }
}
"#;
    let diagnostics = check(source);
    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    let d = &diagnostics[0];
    assert_eq!(d.code, 1);
    assert_eq!(d.exception_type.as_deref(), Some("System.InvalidOperationException"));
    assert_eq!(d.start as usize, source.find("throw new").expect("throw"));
    assert_eq!(d.file, "test.cs");
    assert!(d.message_text.contains("System.InvalidOperationException"));
}

#[test]
fn handled_throw_is_silent() {
    let diagnostics = check(
        r#"
using System;
class C
{
    void M()
    {
        try { throw new InvalidOperationException(); }
        catch (InvalidOperationException e) { }
    }
}
"#,
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn declared_contract_is_seen_by_callers() {
    let handled = check(
        r#"
using System;
class C
{
    [Throws(typeof(FormatException))]
    void A() { throw new FormatException(); }

    void B()
    {
        try { A(); } catch (FormatException) { }
    }
}
"#,
    );
    assert!(handled.is_empty(), "{handled:?}");

    let source = r#"
using System;
class C
{
    [Throws(typeof(FormatException))]
    void A() { throw new FormatException(); }

    void B() { A(); }
}
"#;
    let unhandled = check(source);
    assert_eq!(unhandled.len(), 1, "{unhandled:?}");
    assert_eq!(unhandled[0].code, 1);
    assert_eq!(unhandled[0].exception_type.as_deref(), Some("System.FormatException"));
    assert_eq!(unhandled[0].start as usize, source.rfind("A();").expect("call"));
}

#[test]
fn declared_subtype_is_covered_by_declared_base() {
    let diagnostics = check(
        r#"
using System.IO;
class C
{
    [Throws(typeof(IOException))]
    void M() { throw new FileNotFoundException(); }
}
"#,
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn redundant_typed_catch_and_its_dead_body() {
    let diagnostics = check(
        r#"
using System;
class C
{
    void M()
    {
        try { Console.WriteLine("x"); }
        catch (FormatException) { Console.WriteLine("never"); }
    }
}
"#,
    );
    assert_eq!(sorted_codes(&diagnostics), vec![12, 16]);
    assert_eq!(
        with_code(&diagnostics, 12)[0].exception_type.as_deref(),
        Some("System.FormatException")
    );
}

#[test]
fn redundant_catch_all() {
    let diagnostics = check(
        r#"
class C
{
    void M()
    {
        try { } catch { }
    }
}
"#,
    );
    assert_eq!(sorted_codes(&diagnostics), vec![13, 16]);
}

#[test]
fn catch_overshadowed_by_earlier_clause() {
    let diagnostics = check(
        r#"
using System.IO;
class C
{
    [Throws(typeof(FileNotFoundException))]
    void Risky() { throw new FileNotFoundException(); }

    void M()
    {
        try { Risky(); }
        catch (IOException) { }
        catch (FileNotFoundException) { }
    }
}
"#,
    );
    assert_eq!(sorted_codes(&diagnostics), vec![15, 16]);
    let overshadowed = with_code(&diagnostics, 15)[0];
    assert_eq!(
        overshadowed.exception_type.as_deref(),
        Some("System.IO.FileNotFoundException")
    );
    assert!(overshadowed.message_text.contains("System.IO.IOException"));
}

#[test]
fn catch_overshadowed_by_earlier_most_general_clause() {
    let source = r#"
using System;
class C
{
    void M()
    {
        try { throw new FormatException(); }
        catch (Exception) { }
        catch (FormatException) { }
    }
}
"#;
    let diagnostics = check(source);
    assert_eq!(sorted_codes(&diagnostics), vec![15, 16], "{diagnostics:?}");
    let overshadowed = with_code(&diagnostics, 15)[0];
    assert_eq!(overshadowed.exception_type.as_deref(), Some("System.FormatException"));
    assert!(overshadowed.message_text.contains("System.Exception"));
    assert_eq!(
        overshadowed.start as usize,
        source.find("catch (FormatException)").expect("second clause")
    );
}

#[test]
fn long_operator_chain_reports_every_call() {
    let terms = vec!["F()"; 300].join(" + ");
    let source = format!(
        r#"
using System;
class C
{{
    [Throws(typeof(FormatException))]
    int F() {{ return 1; }}

    void M() {{ int x = {terms}; }}
}}
"#
    );
    let diagnostics = check(&source);
    let unhandled = with_code(&diagnostics, 1);
    assert_eq!(unhandled.len(), 300);
    assert!(
        unhandled
            .iter()
            .all(|d| d.exception_type.as_deref() == Some("System.FormatException"))
    );
    let first_call = source.find("F() +").expect("chain");
    assert!(unhandled.iter().any(|d| d.start as usize == first_call));
}

#[test]
fn catch_with_nothing_left_after_accumulated_handling() {
    let diagnostics = check(
        r#"
using System.IO;
class C
{
    [Throws(typeof(FileNotFoundException), typeof(DirectoryNotFoundException))]
    void Risky(bool file)
    {
        if (file) throw new FileNotFoundException();
        throw new DirectoryNotFoundException();
    }

    void M()
    {
        try { Risky(true); }
        catch (FileNotFoundException) { }
        catch (DirectoryNotFoundException) { }
        catch (IOException) { }
    }
}
"#,
    );
    assert_eq!(sorted_codes(&diagnostics), vec![14, 16]);
}

#[test]
fn broader_clause_after_partial_handling_is_live() {
    let diagnostics = check(
        r#"
using System.IO;
class C
{
    [Throws(typeof(FileNotFoundException), typeof(IOException))]
    void Risky(bool file)
    {
        if (file) throw new FileNotFoundException();
        throw new IOException();
    }

    void M()
    {
        try { Risky(true); }
        catch (FileNotFoundException) { }
        catch (IOException) { }
    }
}
"#,
    );
    // FileNotFoundException is redundant by hierarchy on Risky; M is clean.
    assert_eq!(sorted_codes(&diagnostics), vec![6]);
}

#[test]
fn rethrow_escapes_as_the_caught_type() {
    let source = r#"
using System.IO;
class C
{
    [Throws(typeof(FileNotFoundException))]
    void Risky() { throw new FileNotFoundException(); }

    void M()
    {
        try { Risky(); }
        catch (IOException) { throw; }
    }
}
"#;
    let diagnostics = check(source);
    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    assert_eq!(diagnostics[0].code, 1);
    assert_eq!(diagnostics[0].exception_type.as_deref(), Some("System.IO.IOException"));
    assert_eq!(diagnostics[0].start as usize, source.find("throw;").expect("rethrow"));
}

#[test]
fn declared_rethrow_is_silent() {
    let diagnostics = check(
        r#"
using System.IO;
class C
{
    [Throws(typeof(FileNotFoundException))]
    void Risky() { throw new FileNotFoundException(); }

    [Throws(typeof(IOException))]
    void M()
    {
        try { Risky(); }
        catch (IOException) { throw; }
    }
}
"#,
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn finally_that_throws_makes_following_code_dead() {
    let diagnostics = check(
        r#"
using System;
class C
{
    [Throws(typeof(InvalidOperationException))]
    void M()
    {
        try { Console.WriteLine("x"); }
        finally { throw new InvalidOperationException(); }
        Console.WriteLine("after");
    }
}
"#,
    );
    assert_eq!(sorted_codes(&diagnostics), vec![16]);
}

#[test]
fn exception_filter_does_not_handle() {
    let diagnostics = check(
        r#"
using System;
class C
{
    void M(bool retry)
    {
        try { throw new FormatException(); }
        catch (FormatException) when (retry) { }
    }
}
"#,
    );
    assert_eq!(sorted_codes(&diagnostics), vec![1]);
}

#[test]
fn handler_search_stops_at_lambda_boundary() {
    let diagnostics = check(
        r#"
using System;
class C
{
    void M()
    {
        try
        {
            Action a = () => throw new FormatException();
        }
        catch (FormatException) { }
    }
}
"#,
    );
    // The lambda's throw is not handled by M's try, and M's catch sees nothing.
    let unhandled = with_code(&diagnostics, 1);
    assert_eq!(unhandled.len(), 1, "{diagnostics:?}");
    assert_eq!(unhandled[0].exception_type.as_deref(), Some("System.FormatException"));
    assert_eq!(with_code(&diagnostics, 12).len(), 1);
}

#[test]
fn lambda_contract_is_charged_to_the_caller() {
    let diagnostics = check(
        r#"
using System;
class C
{
    void Run(Action action) { }

    void M()
    {
        Run([Throws(typeof(FormatException))] () => throw new FormatException());
    }
}
"#,
    );
    let unhandled = with_code(&diagnostics, 1);
    assert_eq!(unhandled.len(), 1, "{diagnostics:?}");
    assert_eq!(unhandled[0].exception_type.as_deref(), Some("System.FormatException"));
}

#[test]
fn throwing_the_most_general_type() {
    let source = r#"
using System;
class C
{
    void M() { throw new Exception(); }
}
"#;
    assert_eq!(sorted_codes(&check(source)), vec![1, 4]);
    assert_eq!(
        sorted_codes(&check_with(source, r#"{ "disableBaseExceptionThrownDiagnostic": true }"#)),
        vec![1]
    );
}

#[test]
fn informational_exceptions_are_messages() {
    let diagnostics = check_with(
        r#"
using System;
class C
{
    void M() { throw new NotImplementedException(); }
}
"#,
        r#"{ "informationalExceptions": ["System.NotImplementedException"] }"#,
    );
    assert_eq!(sorted_codes(&diagnostics), vec![2]);
    assert!(!diagnostics[0].is_warning());
}

#[test]
fn ignored_exceptions_vanish() {
    let diagnostics = check_with(
        r#"
using System;
class C
{
    void M() { throw new NotImplementedException(); }
}
"#,
        r#"{ "ignoredExceptions": ["System.NotImplemented*"] }"#,
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn negated_pattern_wins_over_ignore() {
    let diagnostics = check_with(
        r#"
using System;
class C
{
    void M() { throw new NotImplementedException(); }
}
"#,
        r#"{ "ignoredExceptions": ["System.*", "!System.NotImplementedException"] }"#,
    );
    assert_eq!(sorted_codes(&diagnostics), vec![1]);
}

#[test]
fn does_not_return_call_ends_the_path() {
    let diagnostics = check(
        r#"
using System;
using System.Diagnostics.CodeAnalysis;
class C
{
    [DoesNotReturn]
    void Fail() { while (true) { } }

    void M()
    {
        Fail();
        Console.WriteLine("after");
    }
}
"#,
    );
    assert_eq!(sorted_codes(&diagnostics), vec![16]);
}

#[test]
fn legacy_redundancy_without_control_flow() {
    let source = r#"
using System;
class C
{
    void M()
    {
        try { Console.WriteLine("x"); }
        catch (FormatException) { }
        return;
        Console.WriteLine("after");
    }
}
"#;
    assert!(check_with(source, r#"{ "disableControlFlowAnalysis": true }"#).is_empty());
    assert_eq!(
        sorted_codes(&check_with(
            source,
            r#"{ "disableControlFlowAnalysis": true, "enableLegacyRedundancyChecks": true }"#,
        )),
        vec![12]
    );
}

#[test]
fn checked_overflow_setting() {
    let source = r#"
class C
{
    int M(long value) { return (int)value; }
}
"#;
    assert!(check(source).is_empty());
    let diagnostics = check_with(source, r#"{ "checkOverflow": true }"#);
    assert_eq!(sorted_codes(&diagnostics), vec![1]);
    assert_eq!(diagnostics[0].exception_type.as_deref(), Some("System.OverflowException"));
}
