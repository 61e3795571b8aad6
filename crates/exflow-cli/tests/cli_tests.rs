use clap::Parser;
use exflow_cli::args::{CliArgs, OutputFormat};
use exflow_cli::driver::{analyze, discover_sources, resolve_settings_path};
use exflow_cli::reporter::Reporter;
use std::fs;
use std::path::{Path, PathBuf};

const UNHANDLED: &str = "using System;\nclass C\n{\n    void M() { throw new InvalidOperationException(); }\n}\n";

fn write(dir: &Path, relative: &str, text: &str) -> PathBuf {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, text).unwrap();
    path
}

fn parse(args: &[&str]) -> CliArgs {
    CliArgs::try_parse_from(std::iter::once("exflow").chain(args.iter().copied()))
        .expect("args should parse")
}

#[test]
fn parses_defaults() {
    let args = parse(&["src"]);
    assert_eq!(args.format, OutputFormat::Text);
    assert!(args.settings.is_none());
    assert!(!args.no_color);
    assert!(args.references.is_empty());
    assert_eq!(args.paths, vec![PathBuf::from("src")]);
}

#[test]
fn parses_all_flags() {
    let args = parse(&[
        "--settings",
        "ci/exflow.settings.json",
        "--format",
        "JSON",
        "--no-color",
        "--reference",
        "lib/Vendor.cs",
        "-r",
        "lib/Net.cs",
        "a.cs",
        "b",
    ]);
    assert_eq!(
        args.settings.as_deref(),
        Some(Path::new("ci/exflow.settings.json"))
    );
    assert_eq!(args.format, OutputFormat::Json);
    assert!(args.no_color);
    assert_eq!(
        args.references,
        vec![PathBuf::from("lib/Vendor.cs"), PathBuf::from("lib/Net.cs")]
    );
    assert_eq!(args.paths.len(), 2);
}

#[test]
fn requires_a_path() {
    assert!(CliArgs::try_parse_from(["exflow"]).is_err());
}

#[test]
fn discovers_sources_recursively() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/A.cs", "class A { }");
    write(dir.path(), "src/nested/B.cs", "class B { }");
    write(dir.path(), "src/notes.txt", "not code");
    write(dir.path(), "src/bin/Generated.cs", "class G { }");
    write(dir.path(), "src/obj/Temp.cs", "class T { }");
    write(dir.path(), "src/.hidden/H.cs", "class H { }");
    let single = write(dir.path(), "Single.cs", "class S { }");

    let files = discover_sources(
        &[PathBuf::from("src"), PathBuf::from("Single.cs"), PathBuf::from("src")],
        dir.path(),
    )
    .unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|f| f.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(names, vec!["Single.cs", "src/A.cs", "src/nested/B.cs"]);
    assert!(files.contains(&single));

    assert!(discover_sources(&[PathBuf::from("missing")], dir.path()).is_err());
}

#[test]
fn analyzes_a_directory_with_discovered_settings() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/C.cs", UNHANDLED);
    let args = parse(&["src"]);

    let result = analyze(&args, dir.path()).unwrap();
    assert!(result.settings_path.is_none());
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].file, "src/C.cs");
    assert!(result.has_warnings());

    let settings = write(
        dir.path(),
        "exflow.settings.json",
        r#"{ "ignoredExceptions": ["System.InvalidOperationException"] }"#,
    );
    let result = analyze(&args, dir.path()).unwrap();
    assert_eq!(result.settings_path, Some(settings));
    assert!(result.diagnostics.is_empty());
    assert!(!result.has_warnings());
}

#[test]
fn explicit_settings_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "C.cs", UNHANDLED);
    let args = parse(&["--settings", "nope.json", "C.cs"]);
    assert!(resolve_settings_path(&args, dir.path()).is_err());
}

#[test]
fn invalid_settings_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "C.cs", UNHANDLED);
    write(dir.path(), "bad.json", r#"{ "exceptions": { "System.Exception": "Maybe" } }"#);
    let args = parse(&["--settings", "bad.json", "C.cs"]);
    let err = analyze(&args, dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Maybe"));
}

#[test]
fn references_contribute_documented_exceptions() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lib/Vendor.cs",
        "namespace Vendor { public static class Api { public static void Run(string path); } }",
    );
    write(
        dir.path(),
        "lib/Vendor.xml",
        r#"<doc><members><member name="M:Vendor.Api.Run(System.String)"><exception cref="T:System.IO.IOException">Cannot read.</exception></member></members></doc>"#,
    );
    write(
        dir.path(),
        "src/Use.cs",
        "using Vendor;\nclass Use\n{\n    void M() { Api.Run(\"x\"); }\n}\n",
    );
    let args = parse(&["--reference", "lib/Vendor.cs", "src"]);
    let result = analyze(&args, dir.path()).unwrap();
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(
        result.diagnostics[0].exception_type.as_deref(),
        Some("System.IO.IOException")
    );
}

#[test]
fn parse_errors_are_reported_as_errors() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Broken.cs", "class Broken { void M( }");
    let args = parse(&["Broken.cs"]);
    let result = analyze(&args, dir.path()).unwrap();
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.code == 0 && d.file == "Broken.cs")
    );
    assert!(result.has_warnings());
}

#[test]
fn renders_text_with_location_and_snippet() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "C.cs", UNHANDLED);
    let result = analyze(&parse(&["C.cs"]), dir.path()).unwrap();

    let mut reporter = Reporter::new(false);
    for (name, text) in &result.sources {
        reporter.add_source(name, text);
    }
    let text = reporter.render(&result.diagnostics);
    let first_line = text.lines().next().unwrap();
    assert_eq!(
        first_line,
        "C.cs:4:16 - warning THROW001: Exception 'System.InvalidOperationException' is neither handled nor declared."
    );
    assert!(text.contains("throw new InvalidOperationException();"));
    assert!(text.contains("~~~~"));
    assert_eq!(
        reporter.summary(&result.diagnostics, 1),
        "Found 1 warning and 0 messages in 1 file."
    );
}

#[test]
fn renders_json() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "C.cs", UNHANDLED);
    let result = analyze(&parse(&["--format", "json", "C.cs"]), dir.path()).unwrap();

    let mut reporter = Reporter::new(false);
    for (name, text) in &result.sources {
        reporter.add_source(name, text);
    }
    let json: serde_json::Value =
        serde_json::from_str(&reporter.render_json(&result.diagnostics).unwrap()).unwrap();
    let entry = &json[0];
    assert_eq!(entry["codeLabel"], "THROW001");
    assert_eq!(entry["code"], 1);
    assert_eq!(entry["line"], 4);
    assert_eq!(entry["column"], 16);
    assert_eq!(entry["category"], "warning");
    assert_eq!(entry["exception_type"], "System.InvalidOperationException");
}
