//! Exception catalogs of referenced members: sidecar documentation files,
//! property accessor affinity and nullability filtering of call sites.

use exflow_binder::ProgramBuilder;
use exflow_checker::{AnalysisSession, parse_settings};
use exflow_common::Diagnostic;
use std::fs;
use std::path::Path;

const VENDOR_SOURCE: &str = r#"
namespace Vendor
{
    public static class Api
    {
        public static void Run(string path);
    }
}
"#;

const USER_SOURCE: &str = r#"
using Vendor;
class C
{
    void M() { Api.Run("data.bin"); }
}
"#;

fn analyze(
    session: &AnalysisSession,
    source: &str,
    references: &[(&Path, &str)],
) -> Vec<Diagnostic> {
    let mut builder = ProgramBuilder::new();
    for (path, text) in references {
        builder.add_reference(path, *text);
    }
    builder.add_source("test.cs", source);
    let state = builder.bind();
    assert!(
        state.parse_diagnostics().is_empty(),
        "unexpected parse errors: {:?}",
        state.parse_diagnostics()
    );
    session.analyze(&state)
}

fn check_with(source: &str, settings: &str) -> Vec<Diagnostic> {
    let settings = parse_settings(settings).expect("settings parse");
    let session = AnalysisSession::from_settings(&settings).expect("valid settings");
    analyze(&session, source, &[])
}

fn exception_types(diagnostics: &[Diagnostic]) -> Vec<&str> {
    let mut types: Vec<&str> = diagnostics
        .iter()
        .filter(|d| d.code == 1)
        .filter_map(|d| d.exception_type.as_deref())
        .collect();
    types.sort_unstable();
    types
}

#[test]
fn sidecar_documentation_is_loaded_once() {
    let dir = tempfile::tempdir().unwrap();
    let module = dir.path().join("Vendor.cs");
    fs::write(
        dir.path().join("Vendor.xml"),
        r#"<?xml version="1.0"?>
<doc>
  <assembly><name>Vendor</name></assembly>
  <members>
    <member name="M:Vendor.Api.Run(System.String)">
      <summary>Runs the job at <paramref name="path"/>.</summary>
      <exception cref="T:System.IO.IOException">The file cannot be read.</exception>
    </member>
  </members>
</doc>
"#,
    )
    .unwrap();

    let session = AnalysisSession::default();
    let diagnostics = analyze(&session, USER_SOURCE, &[(module.as_path(), VENDOR_SOURCE)]);
    assert_eq!(exception_types(&diagnostics), vec!["System.IO.IOException"]);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].start as usize,
        USER_SOURCE.find("Api.Run").expect("call")
    );
    assert_eq!(session.doc_cache().load_count(), 1);
}

#[test]
fn missing_sidecar_means_no_documented_exceptions() {
    let dir = tempfile::tempdir().unwrap();
    let module = dir.path().join("Vendor.cs");
    let session = AnalysisSession::default();
    let diagnostics = analyze(&session, USER_SOURCE, &[(module.as_path(), VENDOR_SOURCE)]);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn malformed_sidecar_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let module = dir.path().join("Vendor.cs");
    fs::write(
        dir.path().join("Vendor.xml"),
        r#"<doc><members><member name="M:Vendor.Api.Run(System.String)"><exception cref="#,
    )
    .unwrap();
    let session = AnalysisSession::default();
    let diagnostics = analyze(&session, USER_SOURCE, &[(module.as_path(), VENDOR_SOURCE)]);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn documentation_interop_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let module = dir.path().join("Vendor.cs");
    fs::write(
        dir.path().join("Vendor.xml"),
        r#"<doc><members><member name="M:Vendor.Api.Run(System.String)"><exception cref="T:System.IO.IOException">x</exception></member></members></doc>"#,
    )
    .unwrap();
    let settings = parse_settings(r#"{ "disableXmlDocInterop": true }"#).unwrap();
    let session = AnalysisSession::from_settings(&settings).unwrap();
    let diagnostics = analyze(&session, USER_SOURCE, &[(module.as_path(), VENDOR_SOURCE)]);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(session.doc_cache().load_count(), 0);
}

#[test]
fn property_documentation_follows_accessor_affinity() {
    let dir = tempfile::tempdir().unwrap();
    let module = dir.path().join("Net.cs");
    let library = r#"
namespace Net
{
    public class Connection
    {
        /// <summary>Gets or sets the timeout in seconds.</summary>
        /// <exception cref="T:System.ArgumentOutOfRangeException">The value assigned is negative.</exception>
        public int Timeout { get; set; }

        /// <summary>Gets or sets the host.</summary>
        /// <exception cref="T:System.InvalidOperationException">The connection is open.</exception>
        public string Host { get; set; }
    }
}
"#;
    let source = r#"
using Net;
class C
{
    void Write(Connection c) { c.Timeout = 5; }
    int Read(Connection c) { return c.Timeout; }
    string ReadHost(Connection c) { return c.Host; }
    void WriteHost(Connection c) { c.Host = "example.org"; }
}
"#;
    let session = AnalysisSession::default();
    let diagnostics = analyze(&session, source, &[(module.as_path(), library)]);
    let at = |needle: &str| source.find(needle).expect("site") as u32;

    let timeout: Vec<&Diagnostic> = diagnostics
        .iter()
        .filter(|d| d.exception_type.as_deref() == Some("System.ArgumentOutOfRangeException"))
        .collect();
    assert_eq!(timeout.len(), 1, "{diagnostics:?}");
    assert!(timeout[0].start >= at("c.Timeout = 5") && timeout[0].start < at("int Read"));

    // Unattributed prose goes to the getter by default.
    let host: Vec<&Diagnostic> = diagnostics
        .iter()
        .filter(|d| d.exception_type.as_deref() == Some("System.InvalidOperationException"))
        .collect();
    assert_eq!(host.len(), 1, "{diagnostics:?}");
    assert!(host[0].start >= at("return c.Host") && host[0].start < at("void WriteHost"));
}

#[test]
fn unattributed_property_documentation_can_apply_to_both_accessors() {
    let dir = tempfile::tempdir().unwrap();
    let module = dir.path().join("Net.cs");
    let library = r#"
namespace Net
{
    public class Connection
    {
        /// <exception cref="T:System.InvalidOperationException">The connection is open.</exception>
        public string Host { get; set; }
    }
}
"#;
    let source = r#"
using Net;
class C
{
    string ReadHost(Connection c) { return c.Host; }
    void WriteHost(Connection c) { c.Host = "example.org"; }
}
"#;
    let settings = parse_settings(r#"{ "ambiguousAccessorDocumentation": "both" }"#).unwrap();
    let session = AnalysisSession::from_settings(&settings).unwrap();
    let diagnostics = analyze(&session, source, &[(module.as_path(), library)]);
    assert_eq!(
        exception_types(&diagnostics),
        vec!["System.InvalidOperationException", "System.InvalidOperationException"]
    );
}

#[test]
fn literal_argument_cannot_be_null() {
    let diagnostics = check_with(
        r#"
class C
{
    int M() { return int.Parse("12"); }
}
"#,
        "{}",
    );
    assert_eq!(
        exception_types(&diagnostics),
        vec!["System.FormatException", "System.OverflowException"]
    );
}

#[test]
fn non_nullable_local_in_nullable_context() {
    let source = r#"
#nullable enable
class C
{
    int M(string? input)
    {
        string text = input ?? "0";
        string copy = text;
        return int.Parse(copy);
    }
}
"#;
    assert_eq!(
        exception_types(&check_with(source, "{}")),
        vec!["System.FormatException", "System.OverflowException"]
    );
}

#[test]
fn possibly_null_argument_keeps_argument_null() {
    let diagnostics = check_with(
        r#"
class C
{
    int M(string input) { return int.Parse(input); }
}
"#,
        "{}",
    );
    assert_eq!(
        exception_types(&diagnostics),
        vec![
            "System.ArgumentNullException",
            "System.FormatException",
            "System.OverflowException",
        ]
    );
}

#[test]
fn nullable_filtering_can_be_disabled() {
    let diagnostics = check_with(
        r#"
class C
{
    int M() { return int.Parse("12"); }
}
"#,
        r#"{ "nullableContext": false }"#,
    );
    assert_eq!(
        exception_types(&diagnostics),
        vec![
            "System.ArgumentNullException",
            "System.FormatException",
            "System.OverflowException",
        ]
    );
}
