//! Parser tests over small source snippets.

use exflow_parser::parser::node::{AccessorKind, LiteralKind, PropertyKind, TypeDeclKind};
use exflow_parser::{NodeArena, NodeIndex, NodeKind, parse_source_file};

fn parse(source: &str) -> (NodeArena, NodeIndex) {
    let mut arena = NodeArena::new();
    let result = parse_source_file(&mut arena, "test.cs", source, false);
    assert!(
        result.diagnostics.is_empty(),
        "unexpected parse errors: {:?}",
        result.diagnostics
    );
    (arena, result.root)
}

/// Every node of the file, in arena order.
fn all_nodes(arena: &NodeArena) -> Vec<NodeIndex> {
    (0..arena.len() as u32).map(NodeIndex).collect()
}

fn find_kind<'a>(arena: &'a NodeArena, name: &str) -> Vec<(NodeIndex, &'a NodeKind)> {
    all_nodes(arena)
        .into_iter()
        .filter_map(|idx| arena.kind(idx).map(|k| (idx, k)))
        .filter(|(_, k)| k.name() == name)
        .collect()
}

#[test]
fn parses_class_with_throws_attribute() {
    let (arena, _) = parse(
        r#"
namespace Demo
{
    using System;

    public class Service : Base, IService
    {
        [Throws(typeof(InvalidOperationException), typeof(ArgumentException))]
        public void Run(int count) { throw new InvalidOperationException(); }
    }
}
"#,
    );
    let types = find_kind(&arena, "TypeDecl");
    assert_eq!(types.len(), 1);
    let NodeKind::TypeDecl(decl) = types[0].1 else {
        unreachable!()
    };
    assert_eq!(decl.kind, TypeDeclKind::Class);
    assert_eq!(decl.name, "Service");
    assert_eq!(
        decl.bases.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
        vec!["Base", "IService"]
    );

    let attributes = find_kind(&arena, "Attribute");
    assert_eq!(attributes.len(), 1);
    let NodeKind::Attribute(attr) = attributes[0].1 else {
        unreachable!()
    };
    assert_eq!(attr.short_name(), "Throws");
    assert_eq!(attr.arguments.len(), 2);
    assert!(matches!(arena.kind(attr.arguments[0]), Some(NodeKind::TypeOf(t)) if t.name == "InvalidOperationException"));
}

#[test]
fn parent_links_reach_the_method() {
    let (arena, _) = parse("class C { void M() { if (true) { throw new E(); } } }");
    let throws = find_kind(&arena, "Throw");
    assert_eq!(throws.len(), 1);
    let owner = arena.enclosing_function_like(throws[0].0);
    assert!(matches!(arena.kind(owner), Some(NodeKind::Method(m)) if m.name == "M"));
}

#[test]
fn parses_try_catch_filter_finally_and_rethrow() {
    let (arena, _) = parse(
        r#"class C { void M() {
            try { Work(); }
            catch (IOException e) when (e.Message != null) { throw; }
            catch { }
            finally { Cleanup(); }
        } }"#,
    );
    let tries = find_kind(&arena, "Try");
    let NodeKind::Try(data) = tries[0].1 else {
        unreachable!()
    };
    assert_eq!(data.catches.len(), 2);
    assert!(data.finally_block.is_some());
    let Some(NodeKind::Catch(first)) = arena.kind(data.catches[0]) else {
        unreachable!()
    };
    assert_eq!(first.ty.as_ref().map(|t| t.name.as_str()), Some("IOException"));
    assert_eq!(first.name.as_deref(), Some("e"));
    assert!(first.filter.is_some());
    let Some(NodeKind::Catch(second)) = arena.kind(data.catches[1]) else {
        unreachable!()
    };
    assert!(second.ty.is_none());
    assert!(find_kind(&arena, "Throw")
        .iter()
        .any(|(_, k)| matches!(k, NodeKind::Throw(op) if op.is_none())));
}

#[test]
fn distinguishes_casts_from_parenthesized_expressions() {
    let (arena, _) = parse(
        "class C { void M(object o, int a, int b) { var x = (string)o; var y = (a) + b; var z = (int)-1; } }",
    );
    let casts = find_kind(&arena, "Cast");
    assert_eq!(casts.len(), 2);
    assert_eq!(find_kind(&arena, "Parenthesized").len(), 1);
}

#[test]
fn parses_generic_method_calls_and_comparisons() {
    let (arena, _) = parse(
        "class C { void M(List<object> xs, int a, int b) { var ys = xs.Cast<string>().ToList(); var c = a < b; } }",
    );
    let accesses = find_kind(&arena, "MemberAccess");
    assert!(accesses.iter().any(|(_, k)| matches!(
        k,
        NodeKind::MemberAccess(m) if m.name == "Cast" && m.type_args.len() == 1
    )));
    assert!(find_kind(&arena, "Binary").iter().any(|(_, k)| matches!(
        k,
        NodeKind::Binary(b) if b.op == exflow_parser::parser::node::BinaryOp::LessThan
    )));
}

#[test]
fn parses_lambdas_with_attributes() {
    let (arena, _) = parse(
        r#"class C { void M(IEnumerable<int> xs) {
            var a = xs.Where(x => x > 0);
            Func<int, int> f = [Throws(typeof(FormatException))] (int s) => s;
            Action g = () => { };
        } }"#,
    );
    let lambdas = find_kind(&arena, "Lambda");
    assert_eq!(lambdas.len(), 3);
    assert!(lambdas.iter().any(|(_, k)| matches!(k, NodeKind::Lambda(l) if l.attributes.len() == 1)));
}

#[test]
fn parses_properties_and_accessors() {
    let (arena, _) = parse(
        r#"class C {
            public int Value { get => 1; [Throws(typeof(ArgumentException))] set { } }
            public int Twice => Value * 2;
            public int this[int i] { get { return i; } }
            public int Auto { get; set; } = 3;
        }"#,
    );
    let properties = find_kind(&arena, "Property");
    assert_eq!(properties.len(), 4);
    let NodeKind::Property(twice) = properties[1].1 else {
        unreachable!()
    };
    assert!(!twice.has_accessor_list());
    assert!(twice.expression_body.is_some());
    let NodeKind::Property(indexer) = properties[2].1 else {
        unreachable!()
    };
    assert_eq!(indexer.kind, PropertyKind::Indexer);
    assert_eq!(indexer.params.len(), 1);

    let accessors = find_kind(&arena, "Accessor");
    assert!(accessors.iter().any(|(_, k)| matches!(
        k,
        NodeKind::Accessor(a) if a.kind == AccessorKind::Set && a.attributes.len() == 1
    )));
}

#[test]
fn captures_doc_comments_and_nullable_context() {
    let mut arena = NodeArena::new();
    let result = parse_source_file(
        &mut arena,
        "doc.cs",
        r#"#nullable enable
class C {
    /// <summary>Parses.</summary>
    /// <exception cref="FormatException">Bad input.</exception>
    public int Parse(string s) => 0;
}"#,
        false,
    );
    assert!(result.diagnostics.is_empty());
    let file = arena.file(result.file).map(|f| f.nullable_enabled);
    assert_eq!(file, Some(true));
    let methods = find_kind(&arena, "Method");
    let doc = arena.doc_comment(methods[0].0).unwrap_or_default();
    assert!(doc.contains("cref=\"FormatException\""));
}

#[test]
fn parses_loops_switch_and_local_functions() {
    let (arena, _) = parse(
        r#"class C { int M(int[] xs) {
            for (int i = 0; i < xs.Length; i++) { if (i == 2) break; }
            foreach (var x in xs) { continue; }
            while (true) { }
            do { } while (false);
            switch (xs.Length) { case 0: return 0; case 1: case 2: break; default: throw new E(); }
            int Local(int v) => v + 1;
            return Local(1);
        } }"#,
    );
    assert_eq!(find_kind(&arena, "For").len(), 1);
    assert_eq!(find_kind(&arena, "ForEach").len(), 1);
    assert_eq!(find_kind(&arena, "While").len(), 1);
    assert_eq!(find_kind(&arena, "Do").len(), 1);
    assert_eq!(find_kind(&arena, "SwitchSection").len(), 3);
    assert_eq!(find_kind(&arena, "LocalFunction").len(), 1);
}

#[test]
fn parses_interpolation_holes_as_expressions() {
    let (arena, _) = parse(r#"class C { string M(int a) { return $"value {a.ToString()}"; } }"#);
    let strings = find_kind(&arena, "InterpolatedString");
    let NodeKind::InterpolatedString(holes) = strings[0].1 else {
        unreachable!()
    };
    assert_eq!(holes.len(), 1);
    assert!(matches!(arena.kind(holes[0]), Some(NodeKind::Invocation(_))));
}

#[test]
fn decimal_literals_are_real() {
    let (arena, _) = parse("class C { decimal M() { return 1.5m; } }");
    assert!(find_kind(&arena, "Literal")
        .iter()
        .any(|(_, k)| matches!(k, NodeKind::Literal(l) if l.kind == LiteralKind::Real && l.text == "1.5m")));
}

#[test]
fn recovers_from_garbage_without_panicking() {
    let mut arena = NodeArena::new();
    let result = parse_source_file(&mut arena, "bad.cs", "class C { void M() { x = ; ) } } }", false);
    assert!(!result.diagnostics.is_empty());
}
