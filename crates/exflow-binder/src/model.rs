//! Query boundary between the binder and the analysis core.
//!
//! The checker only sees a `&dyn SemanticModel`. Flow logic can therefore be
//! unit-tested against a hand-built [`TypeHierarchy`] without parsing source.

use crate::contracts::DeclaredContract;
use crate::members::{MemberId, MemberInfo};
use crate::state::BinderState;
use crate::state_resolution::ResolvedCall;
use crate::state_typing::{ConstValue, LocalSymbol};
use crate::types::{Ty, TypeId, TypeInfo};
use crate::well_known::{NumericKind, WellKnownType};
use exflow_common::FileId;
use exflow_parser::parser::node::AccessorKind;
use exflow_parser::{NodeArena, NodeIndex, TypeSyntax};
use std::path::Path;

/// Nominal type names and the declared base chain.
pub trait TypeHierarchy: Send + Sync {
    /// Declared base class; `None` at the root or for unknown types.
    fn base_type(&self, ty: TypeId) -> Option<TypeId>;

    /// Simple name (`IOException`).
    fn type_name(&self, ty: TypeId) -> &str;

    /// Fully qualified name (`System.IO.IOException`).
    fn full_type_name(&self, ty: TypeId) -> &str;

    fn well_known(&self, kind: WellKnownType) -> Option<TypeId>;

    /// Resolve a written or documentation-style (`T:`-prefixed) type name.
    fn resolve_type_name(&self, name: &str) -> Option<TypeId>;
}

/// Semantic queries over one bound program.
pub trait SemanticModel: TypeHierarchy {
    fn arena(&self) -> &NodeArena;

    /// Files whose bodies are analysed.
    fn user_files(&self) -> Vec<FileId>;

    fn type_of(&self, expr: NodeIndex) -> Ty;

    fn type_info(&self, ty: TypeId) -> Option<&TypeInfo>;

    fn member(&self, id: MemberId) -> Option<&MemberInfo>;

    /// Member declared by a declaration node (method, accessor, lambda, ...).
    fn member_of_declaration(&self, node: NodeIndex) -> Option<MemberId>;

    fn accessor_of(&self, property: MemberId, kind: AccessorKind) -> Option<MemberId>;

    /// Contract attached to a function-like node or property declaration.
    fn contract_of(&self, node: NodeIndex) -> Option<&DeclaredContract>;

    fn resolve_call(&self, invocation: NodeIndex) -> Option<ResolvedCall>;

    fn resolve_constructor(&self, creation: NodeIndex) -> Option<ResolvedCall>;

    /// Property or indexer an access expression denotes.
    fn resolve_property(&self, access: NodeIndex) -> Option<ResolvedCall>;

    /// Method a method-group expression (`list.ForEach(Print)`) refers to.
    fn resolve_method_group(&self, expr: NodeIndex) -> Option<MemberId>;

    /// Lambda or local function a delegate-valued expression refers to.
    fn delegate_target(&self, expr: NodeIndex) -> Option<MemberId>;

    fn is_delegate_invoke(&self, member: MemberId) -> bool;

    fn alias_initializer(&self, ident: NodeIndex) -> Option<NodeIndex>;

    fn constant_value(&self, expr: NodeIndex) -> Option<ConstValue>;

    fn lookup_local(&self, name: &str, at: NodeIndex) -> Option<LocalSymbol>;

    fn nullable_enabled_at(&self, node: NodeIndex) -> bool;

    fn resolve_type_syntax(&self, syntax: &TypeSyntax, at: NodeIndex) -> Ty;

    fn is_assignable(&self, from: &Ty, to: &Ty) -> bool;

    fn numeric_kind(&self, ty: &Ty) -> Option<NumericKind>;

    fn element_type(&self, sequence: &Ty) -> Ty;

    /// Path of the referenced module that declares `file`.
    fn module_path(&self, file: FileId) -> Option<&Path>;
}

impl TypeHierarchy for BinderState {
    fn base_type(&self, ty: TypeId) -> Option<TypeId> {
        self.types.get(ty)?.base.as_ref()?.def()
    }

    fn type_name(&self, ty: TypeId) -> &str {
        self.types.get(ty).map_or("?", |t| t.name.as_str())
    }

    fn full_type_name(&self, ty: TypeId) -> &str {
        self.types.get(ty).map_or("?", |t| t.full_name.as_str())
    }

    fn well_known(&self, kind: WellKnownType) -> Option<TypeId> {
        self.well_known_type(kind)
    }

    fn resolve_type_name(&self, name: &str) -> Option<TypeId> {
        self.resolve_type_name_text(name)
    }
}

impl SemanticModel for BinderState {
    fn arena(&self) -> &NodeArena {
        &self.arena
    }

    fn user_files(&self) -> Vec<FileId> {
        BinderState::user_files(self).collect()
    }

    fn type_of(&self, expr: NodeIndex) -> Ty {
        BinderState::type_of(self, expr)
    }

    fn type_info(&self, ty: TypeId) -> Option<&TypeInfo> {
        self.types.get(ty)
    }

    fn member(&self, id: MemberId) -> Option<&MemberInfo> {
        self.members.get(id)
    }

    fn member_of_declaration(&self, node: NodeIndex) -> Option<MemberId> {
        BinderState::member_of_declaration(self, node)
    }

    fn accessor_of(&self, property: MemberId, kind: AccessorKind) -> Option<MemberId> {
        self.members.accessor_of(property, kind)
    }

    fn contract_of(&self, node: NodeIndex) -> Option<&DeclaredContract> {
        self.contracts.get(&node)
    }

    fn resolve_call(&self, invocation: NodeIndex) -> Option<ResolvedCall> {
        BinderState::resolve_call(self, invocation)
    }

    fn resolve_constructor(&self, creation: NodeIndex) -> Option<ResolvedCall> {
        BinderState::resolve_constructor(self, creation)
    }

    fn resolve_property(&self, access: NodeIndex) -> Option<ResolvedCall> {
        BinderState::resolve_property(self, access)
    }

    fn resolve_method_group(&self, expr: NodeIndex) -> Option<MemberId> {
        BinderState::resolve_method_group(self, expr)
    }

    fn delegate_target(&self, expr: NodeIndex) -> Option<MemberId> {
        BinderState::delegate_target(self, expr)
    }

    fn is_delegate_invoke(&self, member: MemberId) -> bool {
        BinderState::is_delegate_invoke(self, member)
    }

    fn alias_initializer(&self, ident: NodeIndex) -> Option<NodeIndex> {
        BinderState::alias_initializer(self, ident)
    }

    fn constant_value(&self, expr: NodeIndex) -> Option<ConstValue> {
        BinderState::constant_value(self, expr)
    }

    fn lookup_local(&self, name: &str, at: NodeIndex) -> Option<LocalSymbol> {
        BinderState::lookup_local(self, name, at)
    }

    fn nullable_enabled_at(&self, node: NodeIndex) -> bool {
        BinderState::nullable_enabled_at(self, node)
    }

    fn resolve_type_syntax(&self, syntax: &TypeSyntax, at: NodeIndex) -> Ty {
        BinderState::resolve_type_syntax(self, syntax, at)
    }

    fn is_assignable(&self, from: &Ty, to: &Ty) -> bool {
        BinderState::is_assignable(self, from, to)
    }

    fn numeric_kind(&self, ty: &Ty) -> Option<NumericKind> {
        BinderState::numeric_kind(self, ty)
    }

    fn element_type(&self, sequence: &Ty) -> Ty {
        BinderState::element_type(self, sequence)
    }

    fn module_path(&self, file: FileId) -> Option<&Path> {
        BinderState::module_path(self, file)
    }
}
