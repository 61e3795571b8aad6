//! Contract shape: duplicates, hierarchy redundancy, never-thrown entries,
//! documentation interop and base/interface member agreement.

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
    AnalysisSession::from_settings(&settings)
        .expect("valid settings")
        .analyze(&state)
}

fn check(source: &str) -> Vec<Diagnostic> {
    check_with(source, "{}")
}

fn get_codes(diagnostics: &[Diagnostic]) -> Vec<u32> {
    let mut codes: Vec<u32> = diagnostics.iter().map(|d| d.code).collect();
    codes.sort_unstable();
    codes
}

fn only(diagnostics: &[Diagnostic], code: u32) -> &Diagnostic {
    let matching: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.code == code).collect();
    assert_eq!(matching.len(), 1, "expected one {code}: {diagnostics:?}");
    matching[0]
}

#[test]
fn duplicate_declaration_reported_on_the_later_entry() {
    let source = r#"
using System;
class C
{
    [Throws(typeof(FormatException))]
    [Throws(typeof(FormatException))]
    void M() { throw new FormatException(); }
}
"#;
    let diagnostics = check(source);
    assert_eq!(get_codes(&diagnostics), vec![5]);
    let duplicate = only(&diagnostics, 5);
    assert_eq!(
        duplicate.start as usize,
        source.rfind("typeof(FormatException)").expect("second entry")
    );
}

#[test]
fn duplicate_within_one_attribute() {
    let diagnostics = check(
        r#"
using System;
class C
{
    [Throws(typeof(FormatException), typeof(OverflowException), typeof(FormatException))]
    void M(bool b)
    {
        if (b) throw new FormatException();
        throw new OverflowException();
    }
}
"#,
    );
    assert_eq!(get_codes(&diagnostics), vec![5]);
}

#[test]
fn declared_but_never_thrown() {
    let source = r#"
using System;
class C
{
    [Throws(typeof(FormatException))]
    void M() { }
}
"#;
    let diagnostics = check(source);
    assert_eq!(get_codes(&diagnostics), vec![11]);
    assert_eq!(
        only(&diagnostics, 11).exception_type.as_deref(),
        Some("System.FormatException")
    );

    // Removing the entry leaves nothing to report.
    assert!(check(&source.replace("[Throws(typeof(FormatException))]", "")).is_empty());
}

#[test]
fn declared_base_covers_thrown_subtype() {
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
fn never_thrown_check_needs_control_flow_or_legacy_mode() {
    let source = r#"
using System;
class C
{
    [Throws(typeof(FormatException))]
    void M() { }
}
"#;
    assert!(check_with(source, r#"{ "disableControlFlowAnalysis": true }"#).is_empty());
    assert_eq!(
        get_codes(&check_with(
            source,
            r#"{ "disableControlFlowAnalysis": true, "enableLegacyRedundancyChecks": true }"#,
        )),
        vec![11]
    );
}

#[test]
fn declaration_redundant_by_hierarchy() {
    let diagnostics = check(
        r#"
using System.IO;
class C
{
    [Throws(typeof(FileNotFoundException), typeof(IOException))]
    void M(bool missing)
    {
        if (missing) throw new FileNotFoundException();
        throw new IOException();
    }
}
"#,
    );
    assert_eq!(get_codes(&diagnostics), vec![6]);
    let redundant = only(&diagnostics, 6);
    assert_eq!(
        redundant.exception_type.as_deref(),
        Some("System.IO.FileNotFoundException")
    );
    assert!(redundant.message_text.contains("System.IO.IOException"));
}

#[test]
fn declaring_the_most_general_type() {
    let source = r#"
using System;
class C
{
    [Throws(typeof(Exception))]
    int M(string s) { return int.Parse(s); }
}
"#;
    assert_eq!(get_codes(&check(source)), vec![3]);
    assert!(check_with(source, r#"{ "disableBaseExceptionDeclaredDiagnostic": true }"#).is_empty());
    assert!(check_with(source, r#"{ "treatThrowsExceptionAsCatchRest": true }"#).is_empty());
}

#[test]
fn catch_rest_entry_does_not_make_specific_entries_redundant() {
    let source = r#"
using System;
class C
{
    [Throws(typeof(FormatException), typeof(Exception))]
    int M(string s) { return int.Parse(s); }
}
"#;
    assert_eq!(get_codes(&check(source)), vec![3, 6]);
    assert!(check_with(source, r#"{ "treatThrowsExceptionAsCatchRest": true }"#).is_empty());
}

#[test]
fn throwing_the_most_general_type_can_be_disabled() {
    let source = r#"
using System;
class C
{
    [Throws(typeof(Exception))]
    void M() { throw new Exception(); }
}
"#;
    assert_eq!(get_codes(&check(source)), vec![3, 4]);
    assert_eq!(
        get_codes(&check_with(source, r#"{ "disableBaseExceptionThrownDiagnostic": true }"#)),
        vec![3]
    );
}

#[test]
fn contract_on_full_property_belongs_on_accessors() {
    let source = r#"
using System;
class C
{
    [Throws(typeof(FormatException))]
    public int P { get; set; }
}
"#;
    let diagnostics = check(source);
    assert_eq!(get_codes(&diagnostics), vec![10]);
    let misplaced = only(&diagnostics, 10);
    assert_eq!(
        misplaced.start as usize,
        source.find("typeof(FormatException)").expect("entry")
    );
    assert!(misplaced.message_text.contains("'P'"));
}

#[test]
fn contract_on_expression_bodied_property_is_valid() {
    let diagnostics = check(
        r#"
using System;
class C
{
    [Throws(typeof(FormatException), typeof(OverflowException))]
    public int Q => int.Parse("42");
}
"#,
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn accessor_contract_is_seen_through_the_property() {
    let diagnostics = check(
        r#"
using System;
class C
{
    public int P
    {
        [Throws(typeof(InvalidOperationException))]
        get { throw new InvalidOperationException(); }
    }

    int Read() { return P; }
}
"#,
    );
    let unhandled = only(&diagnostics, 1);
    assert_eq!(
        unhandled.exception_type.as_deref(),
        Some("System.InvalidOperationException")
    );
    assert_eq!(get_codes(&diagnostics), vec![1]);
}

#[test]
fn documented_but_undeclared() {
    let source = r#"
using System;
class C
{
    /// <summary>Parses.</summary>
    /// <exception cref="T:System.FormatException">The input is malformed.</exception>
    void Parse() { }
}
"#;
    let diagnostics = check(source);
    assert_eq!(get_codes(&diagnostics), vec![9]);
    let documented = only(&diagnostics, 9);
    assert_eq!(documented.start as usize, source.find("Parse()").expect("name"));
    assert_eq!(documented.exception_type.as_deref(), Some("System.FormatException"));

    assert!(check_with(source, r#"{ "disableXmlDocInterop": true }"#).is_empty());
}

#[test]
fn documented_and_declared_agree() {
    let diagnostics = check(
        r#"
using System;
class C
{
    /// <exception cref="T:System.FormatException">The input is malformed.</exception>
    [Throws(typeof(FormatException))]
    void Parse() { throw new FormatException(); }
}
"#,
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn implementation_declares_more_than_interface() {
    let source = r#"
using System;
interface IRunner
{
    void Run();
}
class Runner : IRunner
{
    [Throws(typeof(FormatException))]
    public void Run() { throw new FormatException(); }
}
"#;
    let diagnostics = check(source);
    assert_eq!(get_codes(&diagnostics), vec![7]);
    let wider = only(&diagnostics, 7);
    assert_eq!(wider.exception_type.as_deref(), Some("System.FormatException"));
    assert!(wider.message_text.contains("IRunner.Run"));
    assert_eq!(
        wider.start as usize,
        source.find("typeof(FormatException)").expect("entry")
    );
}

#[test]
fn implementation_drops_interface_declaration() {
    let source = r#"
using System.IO;
interface IStore
{
    [Throws(typeof(IOException))]
    void Save();
}
class MemoryStore : IStore
{
    public void Save() { }
}
"#;
    let diagnostics = check(source);
    assert_eq!(get_codes(&diagnostics), vec![8]);
    let missing = only(&diagnostics, 8);
    assert_eq!(missing.exception_type.as_deref(), Some("System.IO.IOException"));
    assert!(missing.message_text.contains("IStore.Save"));
    assert_eq!(missing.start as usize, source.rfind("Save()").expect("name"));
}

#[test]
fn override_drops_base_declaration() {
    let diagnostics = check(
        r#"
using System.IO;
class Store
{
    [Throws(typeof(IOException))]
    public virtual void Save() { throw new IOException(); }
}
class CachedStore : Store
{
    public override void Save() { }
}
"#,
    );
    assert_eq!(get_codes(&diagnostics), vec![8]);
    assert!(only(&diagnostics, 8).message_text.contains("Store.Save"));
}

#[test]
fn override_narrowing_the_base_contract_is_fine() {
    let diagnostics = check(
        r#"
using System.IO;
class Store
{
    [Throws(typeof(IOException))]
    public virtual void Save() { throw new IOException(); }
}
class FileStore : Store
{
    [Throws(typeof(IOException))]
    public override void Save() { throw new FileNotFoundException(); }
}
"#,
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}
