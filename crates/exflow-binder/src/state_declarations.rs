//! Declaration passes: types, bases, members, anonymous callables,
//! declared contracts and override/implementation links.

use crate::contracts::{
    ContractEntry, DeclaredContract, is_does_not_return_attribute, is_throws_attribute,
};
use crate::members::{MemberId, MemberInfo, MemberKind, ParamInfo};
use crate::state::BinderState;
use crate::types::{Ty, TypeId, TypeInfo};
use crate::well_known::WellKnownType;
use exflow_common::FileId;
use exflow_common::limits::MAX_BASE_CHAIN_DEPTH;
use exflow_parser::parser::node::{
    AccessorKind, Modifiers, NodeKind, ParameterModifier, PropertyKind, TypeDeclKind,
};
use exflow_parser::NodeIndex;
use smallvec::SmallVec;
use tracing::trace;

const WELL_KNOWN: [WellKnownType; 14] = [
    WellKnownType::Object,
    WellKnownType::String,
    WellKnownType::Boolean,
    WellKnownType::Decimal,
    WellKnownType::Nullable,
    WellKnownType::Array,
    WellKnownType::IEnumerable,
    WellKnownType::Exception,
    WellKnownType::ArgumentException,
    WellKnownType::ArgumentNullException,
    WellKnownType::ArgumentOutOfRangeException,
    WellKnownType::InvalidOperationException,
    WellKnownType::InvalidCastException,
    WellKnownType::OverflowException,
];

/// Declaration modifiers of a member node.
pub(crate) fn modifiers_of(kind: &NodeKind) -> Modifiers {
    match kind {
        NodeKind::Method(d) | NodeKind::Constructor(d) | NodeKind::LocalFunction(d) => d.modifiers,
        NodeKind::Property(d) => d.modifiers,
        NodeKind::Accessor(d) => d.modifiers,
        NodeKind::Field(d) => d.modifiers,
        NodeKind::TypeDecl(d) => d.modifiers,
        _ => Modifiers::empty(),
    }
}

fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

impl BinderState {
    // =========================================================================
    // Types
    // =========================================================================

    pub(crate) fn declare_types(&mut self) {
        let roots: Vec<(FileId, NodeIndex)> =
            self.arena.files().iter().map(|f| (f.id, f.root)).collect();
        for (file, root) in roots {
            self.declare_types_in(root, "", None, file);
        }
        for kind in WELL_KNOWN {
            if let Some(id) = self.types.lookup_full(kind.full_name(), kind.arity()) {
                self.well_known.insert(kind, id);
            }
        }
    }

    fn declare_types_in(
        &mut self,
        node: NodeIndex,
        namespace: &str,
        outer: Option<TypeId>,
        file: FileId,
    ) {
        match self.arena.kind(node) {
            Some(NodeKind::SourceFile(d)) => {
                for member in d.members.clone() {
                    self.declare_types_in(member, namespace, None, file);
                }
            }
            Some(NodeKind::Namespace(d)) => {
                let ns = join_name(namespace, &d.name);
                for member in d.members.clone() {
                    self.declare_types_in(member, &ns, None, file);
                }
            }
            Some(NodeKind::TypeDecl(d)) => {
                let full_name = match outer.and_then(|o| self.types.get(o)) {
                    Some(outer_info) => join_name(&outer_info.full_name, &d.name),
                    None => join_name(namespace, &d.name),
                };
                let info = TypeInfo {
                    name: d.name.clone(),
                    namespace: namespace.to_string(),
                    full_name,
                    kind: d.kind,
                    type_params: d.type_params.clone(),
                    base: None,
                    interfaces: Vec::new(),
                    members: Vec::new(),
                    decl: node,
                    file,
                    is_static: d.modifiers.contains(Modifiers::STATIC),
                    is_sealed: d.modifiers.contains(Modifiers::SEALED),
                    outer,
                };
                let nested: Vec<NodeIndex> = d.members.clone();
                let id = self.types.insert(info);
                self.type_by_node.insert(node, id);
                for member in nested {
                    if matches!(self.arena.kind(member), Some(NodeKind::TypeDecl(_))) {
                        self.declare_types_in(member, namespace, Some(id), file);
                    }
                }
            }
            _ => {}
        }
    }

    pub(crate) fn resolve_bases(&mut self) {
        let object = self.well_known_type(WellKnownType::Object);
        let declared: Vec<(TypeId, NodeIndex)> =
            self.types.iter().map(|(id, t)| (id, t.decl)).collect();
        for (id, decl) in declared {
            let Some(NodeKind::TypeDecl(d)) = self.arena.kind(decl) else {
                continue;
            };
            let is_interface = d.kind == TypeDeclKind::Interface;
            let mut base = None;
            let mut interfaces = Vec::new();
            for syntax in &d.bases {
                let ty = self.resolve_type_syntax(syntax, decl);
                let Some(info) = ty.def().and_then(|def| self.types.get(def)) else {
                    continue;
                };
                if !info.is_interface() && !is_interface && base.is_none() {
                    base = Some(ty);
                } else {
                    interfaces.push(ty);
                }
            }
            if base.is_none() && !is_interface && object.is_some_and(|o| o != id) {
                base = object.map(Ty::named);
            }
            if let Some(info) = self.types.get_mut(id) {
                info.base = base;
                info.interfaces = interfaces;
            }
        }
    }

    // =========================================================================
    // Members
    // =========================================================================

    pub(crate) fn declare_members(&mut self) {
        let declared: Vec<(TypeId, NodeIndex)> =
            self.types.iter().map(|(id, t)| (id, t.decl)).collect();
        for (owner, decl) in declared {
            let Some(NodeKind::TypeDecl(d)) = self.arena.kind(decl) else {
                continue;
            };
            for member in d.members.clone() {
                self.declare_member(owner, member);
            }
        }
    }

    fn push_member(&mut self, info: MemberInfo) -> MemberId {
        let owner = info.owner;
        let decl = info.decl;
        let is_extension = info.is_extension;
        let name = info.name.clone();
        let kind = info.kind;
        let id = self.members.insert(info);
        self.member_by_node.insert(decl, id);
        if !matches!(kind, MemberKind::Lambda | MemberKind::LocalFunction) {
            if let Some(owner_info) = self.types.get_mut(owner) {
                owner_info.members.push(id);
            }
        }
        if is_extension {
            self.extension_methods.entry(name).or_default().push(id);
        }
        id
    }

    fn new_member(&self, name: String, kind: MemberKind, owner: TypeId, decl: NodeIndex) -> MemberInfo {
        let node = self.arena.get(decl);
        let file = node.map_or(FileId::NONE, |n| n.file);
        let nullable_context = self.arena.file(file).is_some_and(|f| f.nullable_enabled);
        let modifiers = node.map_or(Modifiers::empty(), |n| modifiers_of(&n.kind));
        MemberInfo {
            name,
            kind,
            owner,
            decl,
            file,
            type_params: Vec::new(),
            params: Vec::new(),
            ty: Ty::Unknown,
            is_static: modifiers.contains(Modifiers::STATIC) || modifiers.contains(Modifiers::CONST),
            is_extension: false,
            does_not_return: false,
            nullable_context,
            property: None,
            accessors: SmallVec::new(),
            overrides: None,
            implements: SmallVec::new(),
        }
    }

    fn param_infos(&self, params: &[NodeIndex]) -> Vec<ParamInfo> {
        params
            .iter()
            .filter_map(|&param| {
                let Some(NodeKind::Parameter(p)) = self.arena.kind(param) else {
                    return None;
                };
                let ty = p
                    .ty
                    .as_ref()
                    .map_or(Ty::Unknown, |t| self.resolve_type_syntax(t, param));
                Some(ParamInfo {
                    name: p.name.clone(),
                    ty,
                    annotated_nullable: p.ty.as_ref().is_some_and(|t| t.nullable),
                    has_default: p.default.is_some(),
                    is_params: p.modifier == ParameterModifier::Params,
                    node: param,
                })
            })
            .collect()
    }

    fn declare_member(&mut self, owner: TypeId, node: NodeIndex) {
        let Some(kind) = self.arena.kind(node).cloned() else {
            return;
        };
        match kind {
            NodeKind::Method(d) => {
                let mut info = self.new_member(d.name.clone(), MemberKind::Method, owner, node);
                info.type_params = d.type_params.clone();
                info.params = self.param_infos(&d.params);
                info.ty = self.resolve_type_syntax(&d.return_type, node);
                info.is_extension = info.is_static
                    && d.params.first().is_some_and(|&p| {
                        matches!(self.arena.kind(p), Some(NodeKind::Parameter(pd)) if pd.modifier == ParameterModifier::This)
                    });
                self.push_member(info);
            }
            NodeKind::Constructor(d) => {
                let mut info = self.new_member(d.name.clone(), MemberKind::Constructor, owner, node);
                info.params = self.param_infos(&d.params);
                info.ty = self.self_type(owner);
                self.push_member(info);
            }
            NodeKind::Property(d) => {
                let member_kind = match d.kind {
                    PropertyKind::Property => MemberKind::Property,
                    PropertyKind::Indexer => MemberKind::Indexer,
                    PropertyKind::Event => MemberKind::Event,
                };
                let mut info = self.new_member(d.name.clone(), member_kind, owner, node);
                info.params = self.param_infos(&d.params);
                info.ty = self.resolve_type_syntax(&d.ty, node);
                let params = info.params.clone();
                let ty = info.ty.clone();
                let is_static = info.is_static;
                let property = self.push_member(info);
                let mut accessors = SmallVec::new();
                for accessor in d.accessors.clone().unwrap_or_default() {
                    let Some(NodeKind::Accessor(a)) = self.arena.kind(accessor) else {
                        continue;
                    };
                    let accessor_kind = a.kind;
                    let mut info = self.new_member(
                        d.name.clone(),
                        MemberKind::Accessor(accessor_kind),
                        owner,
                        accessor,
                    );
                    info.params = params.clone();
                    info.ty = if accessor_kind == AccessorKind::Get {
                        ty.clone()
                    } else {
                        Ty::Unknown
                    };
                    info.is_static = is_static;
                    info.property = Some(property);
                    accessors.push(self.push_member(info));
                }
                if let Some(info) = self.members.get_mut(property) {
                    info.accessors = accessors;
                }
            }
            NodeKind::Field(d) => {
                let ty = self.resolve_type_syntax(&d.ty, node);
                let kind = if d.is_event {
                    MemberKind::Event
                } else {
                    MemberKind::Field
                };
                for declarator in d.declarators {
                    let Some(name) = self.arena.declaration_name(declarator).map(str::to_string)
                    else {
                        continue;
                    };
                    let mut info = self.new_member(name, kind, owner, declarator);
                    info.is_static = d.modifiers.contains(Modifiers::STATIC)
                        || d.modifiers.contains(Modifiers::CONST);
                    info.ty = ty.clone();
                    self.push_member(info);
                }
            }
            _ => {}
        }
    }

    /// The type a definition denotes inside its own body (`List<T>`).
    pub(crate) fn self_type(&self, id: TypeId) -> Ty {
        let args = self
            .types
            .get(id)
            .map(|t| t.type_params.iter().cloned().map(Ty::Param).collect())
            .unwrap_or_default();
        Ty::Named(id, args)
    }

    /// Lambdas and local functions: they own contracts and are call targets.
    pub(crate) fn declare_anonymous_callables(&mut self) {
        let object = self.well_known_type(WellKnownType::Object).unwrap_or(TypeId(0));
        for raw in 0..self.arena.len() as u32 {
            let node = NodeIndex(raw);
            let (name, kind, params, type_params, return_type) = match self.arena.kind(node) {
                Some(NodeKind::LocalFunction(d)) => (
                    d.name.clone(),
                    MemberKind::LocalFunction,
                    d.params.clone(),
                    d.type_params.clone(),
                    Some(d.return_type.clone()),
                ),
                Some(NodeKind::Lambda(d)) => (
                    "<lambda>".to_string(),
                    MemberKind::Lambda,
                    d.params.clone(),
                    Vec::new(),
                    None,
                ),
                _ => continue,
            };
            let owner = self
                .type_by_node
                .get(&self.arena.enclosing_type(node))
                .copied()
                .unwrap_or(object);
            let mut info = self.new_member(name, kind, owner, node);
            info.type_params = type_params;
            info.params = self.param_infos(&params);
            info.ty = return_type.map_or(Ty::Unknown, |t| self.resolve_type_syntax(&t, node));
            self.push_member(info);
        }
    }

    // =========================================================================
    // Contracts
    // =========================================================================

    pub(crate) fn collect_contracts(&mut self) {
        for raw in 0..self.arena.len() as u32 {
            let node = NodeIndex(raw);
            let owns_contract = matches!(
                self.arena.kind(node),
                Some(kind) if kind.is_function_like() || matches!(kind, NodeKind::Property(_))
            );
            if !owns_contract {
                continue;
            }
            let mut contract = DeclaredContract {
                owner: node,
                entries: SmallVec::new(),
            };
            let mut has_throws = false;
            let mut does_not_return = false;
            for &attribute in self.arena.attributes_of(node) {
                let Some(NodeKind::Attribute(data)) = self.arena.kind(attribute) else {
                    continue;
                };
                if is_does_not_return_attribute(data) {
                    does_not_return = true;
                }
                if !is_throws_attribute(data) {
                    continue;
                }
                has_throws = true;
                for &argument in &data.arguments {
                    let Some(NodeKind::TypeOf(syntax)) = self.arena.kind(argument) else {
                        continue;
                    };
                    match self.resolve_type_syntax(syntax, node).def() {
                        Some(ty) => contract.entries.push(ContractEntry {
                            ty,
                            attribute,
                            argument,
                        }),
                        None => trace!(name = %syntax.name, "unresolved contract type"),
                    }
                }
            }
            if has_throws {
                self.contracts.insert(node, contract);
            }
            if does_not_return
                && let Some(id) = self.member_by_node.get(&node).copied()
                && let Some(info) = self.members.get_mut(id)
            {
                info.does_not_return = true;
            }
        }
    }

    // =========================================================================
    // Overrides and interface implementations
    // =========================================================================

    pub(crate) fn link_base_members(&mut self) {
        let mut links: Vec<(MemberId, Option<MemberId>, SmallVec<[MemberId; 1]>)> = Vec::new();
        for (id, info) in self.members.iter() {
            if matches!(
                info.kind,
                MemberKind::Constructor
                    | MemberKind::Lambda
                    | MemberKind::LocalFunction
                    | MemberKind::Field
                    | MemberKind::Accessor(_)
            ) {
                continue;
            }
            let modifiers = self
                .arena
                .kind(info.decl)
                .map_or(Modifiers::empty(), modifiers_of);
            let overrides = if modifiers.contains(Modifiers::OVERRIDE) {
                self.find_base_member(info)
            } else {
                None
            };
            let implements = self.find_implemented_members(info);
            if overrides.is_some() || !implements.is_empty() {
                links.push((id, overrides, implements));
            }
        }
        for (id, overrides, implements) in links {
            self.link_accessors(id, overrides, &implements);
            if let Some(info) = self.members.get_mut(id) {
                info.overrides = overrides;
                info.implements = implements;
            }
        }
    }

    fn same_signature(a: &MemberInfo, b: &MemberInfo) -> bool {
        a.name == b.name
            && a.params.len() == b.params.len()
            && a.kind.is_property_like() == b.kind.is_property_like()
            && (a.kind == MemberKind::Method) == (b.kind == MemberKind::Method)
    }

    fn find_base_member(&self, info: &MemberInfo) -> Option<MemberId> {
        let mut current = self.types.get(info.owner)?.base.as_ref()?.def();
        let mut depth = 0;
        while let Some(ty) = current {
            depth += 1;
            if depth > MAX_BASE_CHAIN_DEPTH {
                return None;
            }
            let type_info = self.types.get(ty)?;
            for &candidate in &type_info.members {
                if self
                    .members
                    .get(candidate)
                    .is_some_and(|c| Self::same_signature(info, c))
                {
                    return Some(candidate);
                }
            }
            current = type_info.base.as_ref().and_then(Ty::def);
        }
        None
    }

    /// All interfaces a type implements, transitively, including through its bases.
    pub(crate) fn all_interfaces(&self, ty: TypeId) -> Vec<TypeId> {
        let mut out: Vec<TypeId> = Vec::new();
        let mut stack = vec![ty];
        let mut steps = 0;
        while let Some(current) = stack.pop() {
            steps += 1;
            if steps > MAX_BASE_CHAIN_DEPTH * 4 {
                break;
            }
            let Some(info) = self.types.get(current) else {
                continue;
            };
            for iface in info.interfaces.iter().filter_map(Ty::def) {
                if !out.contains(&iface) {
                    out.push(iface);
                    stack.push(iface);
                }
            }
            if let Some(base) = info.base.as_ref().and_then(Ty::def) {
                stack.push(base);
            }
        }
        out
    }

    fn find_implemented_members(&self, info: &MemberInfo) -> SmallVec<[MemberId; 1]> {
        let mut out = SmallVec::new();
        if info.is_static {
            return out;
        }
        for iface in self.all_interfaces(info.owner) {
            let Some(iface_info) = self.types.get(iface) else {
                continue;
            };
            for &candidate in &iface_info.members {
                if self
                    .members
                    .get(candidate)
                    .is_some_and(|c| Self::same_signature(info, c))
                {
                    out.push(candidate);
                }
            }
        }
        out
    }

    fn link_accessors(
        &mut self,
        property: MemberId,
        overrides: Option<MemberId>,
        implements: &[MemberId],
    ) {
        let Some(accessors) = self.members.get(property).map(|p| p.accessors.clone()) else {
            return;
        };
        for accessor in accessors {
            let Some(kind) = self.members.get(accessor).and_then(MemberInfo::accessor_kind) else {
                continue;
            };
            let base = overrides.and_then(|b| self.members.accessor_of(b, kind));
            let ifaces: SmallVec<[MemberId; 1]> = implements
                .iter()
                .filter_map(|&i| self.members.accessor_of(i, kind))
                .collect();
            if let Some(info) = self.members.get_mut(accessor) {
                info.overrides = base;
                info.implements = ifaces;
            }
        }
    }
}
