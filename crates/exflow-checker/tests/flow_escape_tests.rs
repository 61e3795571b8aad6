//! Escape sets and reachability of single scopes, checked directly on the
//! flow result rather than through diagnostics.

use crate::catalog::ExceptionCache;
use crate::config::parse_settings;
use crate::context::{CheckerContext, ScopeChecker};
use crate::doc_cache::DocFileCache;
use crate::policy::ClassificationPolicy;
use exflow_binder::{BinderState, ProgramBuilder, TypeHierarchy};
use exflow_parser::{NodeIndex, NodeKind};

fn bind(source: &str) -> BinderState {
    let mut builder = ProgramBuilder::new();
    builder.add_source("test.cs", source);
    let state = builder.bind();
    assert!(
        state.parse_diagnostics().is_empty(),
        "unexpected parse errors: {:?}",
        state.parse_diagnostics()
    );
    state
}

fn method(state: &BinderState, name: &str) -> NodeIndex {
    let arena = state.arena();
    (0..arena.len() as u32)
        .map(NodeIndex)
        .filter(|&idx| arena.file_of(idx).is_some_and(|f| !f.is_library))
        .find(|&idx| matches!(arena.kind(idx), Some(NodeKind::Method(m)) if m.name == name))
        .unwrap_or_else(|| panic!("no method {name}"))
}

struct Outcome {
    escapes: Vec<String>,
    end_reachable: bool,
    codes: Vec<u32>,
}

fn analyze_with(source: &str, name: &str, policy: &ClassificationPolicy) -> Outcome {
    let state = bind(source);
    let exceptions = ExceptionCache::new();
    let docs = DocFileCache::new();
    let ctx = CheckerContext::new(&state, policy, &exceptions, &docs);
    let mut checker = ScopeChecker::new(&ctx, method(&state, name));
    let flow = checker.analyze_scope();
    let mut escapes: Vec<String> = flow
        .escapes
        .iter()
        .map(|&ty| state.full_type_name(ty).to_string())
        .collect();
    escapes.sort();
    Outcome {
        escapes,
        end_reachable: flow.end_reachable,
        codes: checker.diagnostics.iter().map(|d| d.code).collect(),
    }
}

fn analyze(source: &str, name: &str) -> Outcome {
    analyze_with(source, name, &ClassificationPolicy::default())
}

fn count(codes: &[u32], code: u32) -> usize {
    codes.iter().filter(|&&c| c == code).count()
}

#[test]
fn throw_escapes_its_type() {
    let out = analyze(
        r#"
using System;
class C
{
    void M() { throw new InvalidOperationException(); }
}
"#,
        "M",
    );
    assert_eq!(out.escapes, vec!["System.InvalidOperationException"]);
    assert!(!out.end_reachable);
    assert_eq!(out.codes, vec![1]);
}

#[test]
fn matching_catch_absorbs() {
    let out = analyze(
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
        "M",
    );
    assert!(out.escapes.is_empty(), "{:?}", out.escapes);
    assert!(out.end_reachable);
    assert!(out.codes.is_empty(), "{:?}", out.codes);
}

#[test]
fn throwing_finally_overrides_try_outcome() {
    let out = analyze(
        r#"
using System;
class C
{
    void M()
    {
        try { } catch (FormatException) { } finally { throw new InvalidOperationException(); }
        Console.WriteLine("after");
    }
}
"#,
        "M",
    );
    assert_eq!(out.escapes, vec!["System.InvalidOperationException"]);
    assert!(!out.end_reachable);
    // The never-thrown FormatException clause, its body, and the statement after the try.
    assert_eq!(count(&out.codes, 12), 1);
    assert_eq!(count(&out.codes, 16), 2);
    assert_eq!(count(&out.codes, 1), 1);
}

#[test]
fn returning_finally_discards_escapes() {
    let out = analyze(
        r#"
using System;
class C
{
    void M()
    {
        try { throw new InvalidOperationException(); }
        finally { return; }
    }
}
"#,
        "M",
    );
    assert!(out.escapes.is_empty(), "{:?}", out.escapes);
    assert!(!out.end_reachable);
}

#[test]
fn rethrow_escapes_the_clause_type() {
    let out = analyze(
        r#"
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
"#,
        "M",
    );
    assert_eq!(out.escapes, vec!["System.IO.IOException"]);
    assert_eq!(out.codes, vec![1]);
}

#[test]
fn rethrow_from_catch_all_escapes_what_it_absorbed() {
    let out = analyze(
        r#"
using System.IO;
class C
{
    [Throws(typeof(FileNotFoundException))]
    void Risky() { throw new FileNotFoundException(); }

    void M()
    {
        try { Risky(); }
        catch { throw; }
    }
}
"#,
        "M",
    );
    assert_eq!(out.escapes, vec!["System.IO.FileNotFoundException"]);
}

#[test]
fn catch_all_never_adds_unhandled_diagnostics() {
    let body = |handler: &str| {
        format!(
            r#"
using System;
using System.IO;
class C
{{
    [Throws(typeof(IOException))]
    void Risky() {{ throw new IOException(); }}

    void M()
    {{
        try {{ Risky(); throw new FormatException(); }}
        catch (IOException) {{ }}
        {handler}
    }}
}}
"#
        )
    };
    let without = analyze(&body(""), "M");
    let with = analyze(&body("catch { }"), "M");
    assert!(count(&with.codes, 1) <= count(&without.codes, 1));
    assert_eq!(count(&without.codes, 1), 1);
    assert_eq!(count(&with.codes, 1), 0);
}

#[test]
fn constant_false_branch_is_dead() {
    let out = analyze(
        r#"
using System;
class C
{
    void M()
    {
        if (false) { throw new InvalidOperationException(); }
    }
}
"#,
        "M",
    );
    assert!(out.escapes.is_empty());
    assert!(out.end_reachable);
    assert_eq!(out.codes, vec![16]);
}

#[test]
fn dead_code_inside_dead_code_is_secondary() {
    let out = analyze(
        r#"
using System;
class C
{
    void M()
    {
        return;
        while (false) { Console.WriteLine("never"); }
    }
}
"#,
        "M",
    );
    let mut codes = out.codes;
    codes.sort_unstable();
    assert_eq!(codes, vec![16, 17]);
}

#[test]
fn infinite_loop_ends_only_through_break() {
    let forever = analyze(
        r#"
class C
{
    void M() { while (true) { } }
}
"#,
        "M",
    );
    assert!(!forever.end_reachable);

    let exits = analyze(
        r#"
class C
{
    void M(bool done) { while (true) { if (done) break; } }
}
"#,
        "M",
    );
    assert!(exits.end_reachable);

    let bare_for = analyze(
        r#"
class C
{
    void M() { for (;;) { } }
}
"#,
        "M",
    );
    assert!(!bare_for.end_reachable);
}

#[test]
fn switch_reachability_depends_on_default() {
    let exhaustive = analyze(
        r#"
using System;
class C
{
    int M(int x)
    {
        switch (x)
        {
            case 1: return 1;
            default: throw new ArgumentOutOfRangeException();
        }
    }
}
"#,
        "M",
    );
    assert!(!exhaustive.end_reachable);
    assert_eq!(exhaustive.escapes, vec!["System.ArgumentOutOfRangeException"]);

    let open = analyze(
        r#"
class C
{
    void M(int x)
    {
        switch (x)
        {
            case 1: return;
        }
    }
}
"#,
        "M",
    );
    assert!(open.end_reachable);
}

#[test]
fn lambda_bodies_are_separate_scopes() {
    let out = analyze(
        r#"
using System;
class C
{
    void M()
    {
        Func<int> f = () => throw new InvalidOperationException();
    }
}
"#,
        "M",
    );
    assert!(out.escapes.is_empty(), "{:?}", out.escapes);
}

#[test]
fn cast_failures() {
    let out = analyze(
        r#"
class C
{
    void M(object o, long l, decimal d, int? n)
    {
        var s = (string)o;
        var unchecked_narrowing = (int)l;
        var checked_narrowing = checked((int)l);
        var from_decimal = (int)d;
        var from_nullable = (int)n;
        var widening = (long)1;
    }
}
"#,
        "M",
    );
    assert_eq!(
        out.escapes,
        vec![
            "System.InvalidCastException",
            "System.InvalidOperationException",
            "System.OverflowException",
        ]
    );
}

#[test]
fn constant_that_fits_does_not_overflow() {
    let out = analyze(
        r#"
class C
{
    void M() { var b = checked((byte)200); }
}
"#,
        "M",
    );
    assert!(out.escapes.is_empty(), "{:?}", out.escapes);
}

#[test]
fn literal_argument_drops_argument_null() {
    let out = analyze(
        r#"
class C
{
    void M() { var x = int.Parse("1"); }
}
"#,
        "M",
    );
    assert_eq!(out.escapes, vec!["System.FormatException", "System.OverflowException"]);
}

#[test]
fn ignored_types_never_escape() {
    let settings = parse_settings(r#"{ "ignoredExceptions": ["System.FormatException"] }"#)
        .expect("settings");
    let policy = ClassificationPolicy::from_settings(&settings).expect("policy");
    let out = analyze_with(
        r#"
class C
{
    void M() { var x = int.Parse("1"); }
}
"#,
        "M",
        &policy,
    );
    assert_eq!(out.escapes, vec!["System.OverflowException"]);
}

#[test]
fn disabled_control_flow_keeps_everything_reachable() {
    let settings = parse_settings(r#"{ "disableControlFlowAnalysis": true }"#).expect("settings");
    let policy = ClassificationPolicy::from_settings(&settings).expect("policy");
    let out = analyze_with(
        r#"
using System;
class C
{
    void M()
    {
        if (false) { throw new InvalidOperationException(); }
        throw new FormatException();
        Console.WriteLine("after");
    }
}
"#,
        "M",
        &policy,
    );
    assert!(out.end_reachable);
    assert_eq!(count(&out.codes, 16), 0);
    assert_eq!(
        out.escapes,
        vec!["System.FormatException", "System.InvalidOperationException"]
    );
}
