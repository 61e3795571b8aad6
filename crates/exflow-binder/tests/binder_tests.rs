//! Binder tests: declarations, contracts and semantic queries over source
//! snippets bound together with the prelude.

use exflow_binder::{
    BinderState, ConstValue, LocalKind, MemberKind, ProgramBuilder, SemanticModel, Ty,
    TypeHierarchy, WellKnownType, prelude_diagnostics,
};
use exflow_parser::parser::node::AccessorKind;
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

/// Nodes of the analysed file (not the prelude) with the given kind name.
fn user_nodes(state: &BinderState, kind: &str) -> Vec<NodeIndex> {
    let arena = state.arena();
    (0..arena.len() as u32)
        .map(NodeIndex)
        .filter(|&idx| arena.file_of(idx).is_some_and(|f| !f.is_library))
        .filter(|&idx| arena.kind(idx).is_some_and(|k| k.name() == kind))
        .collect()
}

/// The invocation whose callee text ends with `callee`.
fn invocation(state: &BinderState, callee: &str) -> NodeIndex {
    let arena = state.arena();
    user_nodes(state, "Invocation")
        .into_iter()
        .find(|&idx| match arena.kind(idx) {
            Some(NodeKind::Invocation(call)) => arena.text_of(call.expression).ends_with(callee),
            _ => false,
        })
        .unwrap_or_else(|| panic!("no invocation of {callee}"))
}

fn identifier(state: &BinderState, name: &str, nth: usize) -> NodeIndex {
    user_nodes(state, "Identifier")
        .into_iter()
        .filter(|&idx| state.arena().identifier_name(idx) == Some(name))
        .nth(nth)
        .unwrap_or_else(|| panic!("no identifier {name} #{nth}"))
}

fn resolved_name(state: &BinderState, invocation: NodeIndex) -> String {
    let call = state.resolve_call(invocation).expect("call resolves");
    let member = state.members().get(call.member).expect("member exists");
    let owner = state.full_type_name(member.owner);
    format!("{owner}.{}", member.name)
}

#[test]
fn prelude_parses_cleanly() {
    assert!(prelude_diagnostics().is_empty(), "{:?}", prelude_diagnostics());
}

#[test]
fn prelude_exception_hierarchy_is_single_inheritance() {
    let state = bind("class C { }");
    let argument_null = state
        .resolve_type_name("System.ArgumentNullException")
        .expect("ArgumentNullException");
    let argument = state.base_type(argument_null).expect("base");
    assert_eq!(state.full_type_name(argument), "System.ArgumentException");
    let system = state.base_type(argument).expect("base");
    assert_eq!(state.full_type_name(system), "System.SystemException");
    let exception = state.base_type(system).expect("base");
    assert_eq!(Some(exception), state.well_known(WellKnownType::Exception));
}

#[test]
fn documentation_style_names_resolve() {
    let state = bind("class C { }");
    let io = state.resolve_type_name("T:System.IO.IOException").expect("IOException");
    assert_eq!(state.type_name(io), "IOException");
    assert_eq!(
        state.resolve_type_name("List`1").map(|t| state.full_type_name(t).to_string()),
        Some("System.Collections.Generic.List".to_string())
    );
    assert_eq!(
        state.resolve_type_name("int").map(|t| state.full_type_name(t).to_string()),
        Some("System.Int32".to_string())
    );
}

#[test]
fn collects_throws_contracts_in_declaration_order() {
    let state = bind(
        r#"
using System;
using System.IO;

class Service
{
    [Throws(typeof(IOException), typeof(InvalidOperationException))]
    [Throws(typeof(IOException))]
    public void Run() { }

    public void Plain() { }
}
"#,
    );
    let methods = user_nodes(&state, "Method");
    let contract = state.contract_of(methods[0]).expect("contract on Run");
    let names: Vec<&str> = contract.types().map(|t| state.type_name(t)).collect();
    assert_eq!(names, vec!["IOException", "InvalidOperationException", "IOException"]);
    assert!(state.contract_of(methods[1]).is_none());
}

#[test]
fn does_not_return_attribute_is_recorded() {
    let state = bind(
        r#"
using System.Diagnostics.CodeAnalysis;

class Guard
{
    [DoesNotReturn]
    public static void Fail() { }
}
"#,
    );
    let method = user_nodes(&state, "Method")[0];
    let member = state.member_of_declaration(method).expect("member");
    assert!(state.members().get(member).is_some_and(|m| m.does_not_return));
}

#[test]
fn resolves_static_library_call() {
    let state = bind(
        r#"
class C
{
    int M(string s) { return int.Parse(s); }
}
"#,
    );
    let call = invocation(&state, "Parse");
    assert_eq!(resolved_name(&state, call), "System.Int32.Parse");
}

#[test]
fn resolves_overload_by_argument_count() {
    let state = bind(
        r#"
class C
{
    void Log(string message) { }
    void Log(string message, int level) { }
    void M() { Log("a", 1); }
}
"#,
    );
    let call = invocation(&state, "Log");
    let resolved = state.resolve_call(call).expect("resolves");
    assert_eq!(state.members().get(resolved.member).map(|m| m.params.len()), Some(2));
}

#[test]
fn linq_sum_picks_decimal_overload() {
    let state = bind(
        r#"
using System.Collections.Generic;
using System.Linq;

class C
{
    decimal Total(List<decimal> prices) { return prices.Sum(); }
    int Count(List<int> values) { return values.Sum(); }
}
"#,
    );
    let calls: Vec<NodeIndex> = user_nodes(&state, "Invocation");
    let returns: Vec<Ty> = calls
        .iter()
        .map(|&c| {
            let call = state.resolve_call(c).expect("resolves");
            assert!(call.is_extension);
            state.members().get(call.member).expect("member").ty.clone()
        })
        .collect();
    let decimal = state.resolve_type_name("System.Decimal").expect("decimal");
    let int = state.resolve_type_name("System.Int32").expect("int");
    assert_eq!(returns, vec![Ty::named(decimal), Ty::named(int)]);
}

#[test]
fn lambda_parameters_take_the_sequence_element_type() {
    let state = bind(
        r#"
using System.Collections.Generic;
using System.Linq;

class Order { public decimal Price { get; set; } }

class C
{
    decimal Total(List<Order> orders) { return orders.Where(o => o.Price > 0).Sum(o => o.Price); }
}
"#,
    );
    let order = state.resolve_type_name("Order").expect("Order");
    let o = identifier(&state, "o", 1);
    assert_eq!(state.type_of(o), Ty::named(order));
    let sum = invocation(&state, "Sum");
    assert_eq!(resolved_name(&state, sum), "System.Linq.Enumerable.Sum");
    let decimal = state.resolve_type_name("System.Decimal").expect("decimal");
    assert_eq!(state.type_of(sum), Ty::named(decimal));
}

#[test]
fn resolves_indexer_and_property_accessors() {
    let state = bind(
        r#"
using System.Collections.Generic;

class C
{
    int M(Dictionary<string, int> map, string s)
    {
        map["a"] = s.Length;
        return map["b"];
    }
}
"#,
    );
    let accesses = user_nodes(&state, "ElementAccess");
    assert_eq!(accesses.len(), 2);
    for access in accesses {
        let call = state.resolve_property(access).expect("indexer resolves");
        let member = state.members().get(call.member).expect("member");
        assert_eq!(member.kind, MemberKind::Indexer);
        assert!(state.accessor_of(call.member, AccessorKind::Get).is_some());
        assert!(state.accessor_of(call.member, AccessorKind::Set).is_some());
    }
    let length = user_nodes(&state, "MemberAccess")[0];
    let call = state.resolve_property(length).expect("Length resolves");
    assert_eq!(state.members().get(call.member).map(|m| m.name.as_str()), Some("Length"));
}

#[test]
fn folds_constants_through_locals_and_fields() {
    let state = bind(
        r#"
class C
{
    const int Limit = 10 * 3;

    bool M()
    {
        const int local = Limit + 2;
        return local > 31;
    }
}
"#,
    );
    let ret = user_nodes(&state, "Return")[0];
    let Some(NodeKind::Return(value)) = state.arena().kind(ret) else {
        unreachable!()
    };
    assert_eq!(state.constant_value(*value), Some(ConstValue::Bool(true)));
    let local = identifier(&state, "local", 0);
    assert_eq!(state.constant_value(local), Some(ConstValue::Int(32)));
}

#[test]
fn alias_initializer_requires_single_assignment() {
    let state = bind(
        r#"
class C
{
    void M()
    {
        var a = 1;
        var b = 2;
        b = 3;
        Use(a);
        Use(b);
    }

    void Use(int value) { }
}
"#,
    );
    let a = identifier(&state, "a", 0);
    assert!(state.alias_initializer(a).is_some());
    let b = identifier(&state, "b", 1);
    assert!(state.alias_initializer(b).is_none());
}

#[test]
fn locals_resolve_to_their_declarations() {
    let state = bind(
        r#"
using System;

class C
{
    void M(object o)
    {
        try
        {
            if (o is string text) { Console.WriteLine(text); }
        }
        catch (FormatException ex)
        {
            Console.WriteLine(ex.Message);
        }
    }
}
"#,
    );
    let text = identifier(&state, "text", 0);
    let local = state.lookup_local("text", text).expect("pattern variable");
    assert_eq!(local.kind, LocalKind::PatternVariable);
    let ex = identifier(&state, "ex", 0);
    let local = state.lookup_local("ex", ex).expect("catch variable");
    assert_eq!(local.kind, LocalKind::CatchVariable);
    let o = identifier(&state, "o", 0);
    assert_eq!(
        state.lookup_local("o", o).map(|l| l.kind),
        Some(LocalKind::Parameter)
    );
}

#[test]
fn links_overrides_and_interface_implementations() {
    let state = bind(
        r#"
using System;

interface IStore { void Save(); }

class Base { public virtual void Load() { } }

class Store : Base, IStore
{
    public override void Load() { }
    public void Save() { }
}
"#,
    );
    let methods = user_nodes(&state, "Method");
    let store_load = state.member_of_declaration(methods[2]).expect("Store.Load");
    let base_load = state.member_of_declaration(methods[1]).expect("Base.Load");
    assert_eq!(state.members().get(store_load).and_then(|m| m.overrides), Some(base_load));
    let store_save = state.member_of_declaration(methods[3]).expect("Store.Save");
    let interface_save = state.member_of_declaration(methods[0]).expect("IStore.Save");
    assert!(
        state
            .members()
            .get(store_save)
            .is_some_and(|m| m.implements.contains(&interface_save))
    );
}

#[test]
fn delegate_invocation_targets_the_lambda() {
    let state = bind(
        r#"
using System;

class C
{
    void M()
    {
        Func<int> produce = () => 42;
        produce();
    }
}
"#,
    );
    let call = invocation(&state, "produce");
    let resolved = state.resolve_call(call).expect("resolves");
    let member = state.members().get(resolved.member).expect("member");
    assert_eq!(member.kind, MemberKind::Lambda);
}
