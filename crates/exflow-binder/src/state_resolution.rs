//! Name and call resolution: type syntax, supertypes, member lookup,
//! overload selection, and the resolution of calls, constructors,
//! property/indexer accesses, method groups and delegate targets.

use crate::members::{MemberId, MemberInfo, MemberKind};
use crate::state::BinderState;
use crate::state_typing::LocalKind;
use crate::types::{Ty, TypeId};
use crate::well_known::{NumericKind, WellKnownType, predefined_alias};
use exflow_common::limits::{MAX_BASE_CHAIN_DEPTH, MAX_EXPR_DEPTH};
use exflow_parser::parser::node::NodeKind;
use exflow_parser::{NodeIndex, TypeSyntax};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::iter;

/// Typing/resolution mode threaded through recursive queries.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Mode {
    pub depth: u32,
    /// Infer generic results from lambda bodies. Off while typing the
    /// parameters of a lambda, whose own call is being resolved.
    pub infer_lambdas: bool,
}

impl Mode {
    pub const FULL: Mode = Mode {
        depth: 0,
        infer_lambdas: true,
    };

    pub fn deeper(self) -> Option<Mode> {
        (self.depth < MAX_EXPR_DEPTH).then_some(Mode {
            depth: self.depth + 1,
            ..self
        })
    }

    pub fn without_lambdas(self) -> Mode {
        Mode {
            infer_lambdas: false,
            ..self
        }
    }
}

/// A call bound to its target.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedCall {
    pub member: MemberId,
    /// Bindings of the owner's and the method's type parameters.
    pub substitution: FxHashMap<String, Ty>,
    /// Receiver expression (`NONE` for unqualified and static calls).
    pub receiver: NodeIndex,
    /// Called with extension syntax; the receiver binds parameter 0.
    pub is_extension: bool,
    /// Parameter index bound to each argument, in argument order.
    pub arg_params: SmallVec<[Option<usize>; 4]>,
}

impl ResolvedCall {
    /// The argument expression bound to parameter `param` of `arguments`.
    pub fn argument_for_param(&self, arguments: &[NodeIndex], param: usize) -> NodeIndex {
        if self.is_extension && param == 0 {
            return self.receiver;
        }
        self.arg_params
            .iter()
            .position(|&p| p == Some(param))
            .and_then(|i| arguments.get(i).copied())
            .unwrap_or(NodeIndex::NONE)
    }
}

/// What the left side of a member access denotes.
#[derive(Clone, Debug)]
pub(crate) enum Receiver {
    Value(Ty),
    Type(TypeId),
    Base(Ty),
}

struct Candidate {
    score: i32,
    member: MemberId,
    substitution: FxHashMap<String, Ty>,
    arg_params: SmallVec<[Option<usize>; 4]>,
}

impl BinderState {
    // =========================================================================
    // Type syntax
    // =========================================================================

    /// Resolve a written type in the context of node `at` (whose enclosing
    /// declarations provide type parameters).
    pub fn resolve_type_syntax(&self, syntax: &TypeSyntax, at: NodeIndex) -> Ty {
        let mut ty = self.resolve_type_name(syntax, at);
        if syntax.nullable
            && let Some(def) = ty.def()
            && self.types.get(def).is_some_and(|t| t.is_value_type())
            && let Some(nullable) = self.well_known_type(WellKnownType::Nullable)
            && def != nullable
        {
            ty = Ty::Named(nullable, vec![ty]);
        }
        for _ in 0..syntax.array_rank {
            ty = Ty::Array(Box::new(ty));
        }
        ty
    }

    fn resolve_type_name(&self, syntax: &TypeSyntax, at: NodeIndex) -> Ty {
        let arity = syntax.type_args.len();
        if arity == 0 {
            if matches!(syntax.name.as_str(), "var" | "void" | "dynamic") {
                return Ty::Unknown;
            }
            if let Some(full) = predefined_alias(&syntax.name) {
                return self.types.lookup_full(full, 0).map_or(Ty::Unknown, Ty::named);
            }
            if self.type_param_in_scope(&syntax.name, at) {
                return Ty::Param(syntax.name.clone());
            }
        }
        let Some(def) = self.lookup_type_def(&syntax.name, arity, at) else {
            return Ty::Unknown;
        };
        let args = syntax
            .type_args
            .iter()
            .map(|a| self.resolve_type_syntax(a, at))
            .collect();
        Ty::Named(def, args)
    }

    fn type_param_in_scope(&self, name: &str, at: NodeIndex) -> bool {
        iter::once(at)
            .chain(self.arena.ancestors(at))
            .any(|node| match self.arena.kind(node) {
                Some(
                    NodeKind::Method(d) | NodeKind::Constructor(d) | NodeKind::LocalFunction(d),
                ) => d.type_params.iter().any(|p| p == name),
                Some(NodeKind::TypeDecl(d)) => d.type_params.iter().any(|p| p == name),
                _ => false,
            })
    }

    /// Find a type definition by (possibly qualified) name and arity. Exact
    /// full names win; otherwise a definition whose full name ends with the
    /// written name, preferring one declared in the same file as `at`.
    pub(crate) fn lookup_type_def(&self, name: &str, arity: usize, at: NodeIndex) -> Option<TypeId> {
        if let Some(id) = self.types.lookup_full(name, arity) {
            return Some(id);
        }
        let simple = name.rsplit('.').next().unwrap_or(name);
        let suffix = format!(".{name}");
        let file = self.arena.get(at).map(|n| n.file);
        let mut fallback = None;
        for &id in self.types.lookup_simple(simple) {
            let Some(info) = self.types.get(id) else {
                continue;
            };
            if info.type_params.len() != arity
                || !(info.full_name == name || info.full_name.ends_with(&suffix))
            {
                continue;
            }
            if Some(info.file) == file {
                return Some(id);
            }
            fallback.get_or_insert(id);
        }
        fallback
    }

    /// Resolve a bare or documentation-style type name (`T:System.IO.IOException`,
    /// ``List`1``, `FormatException`).
    pub fn resolve_type_name_text(&self, name: &str) -> Option<TypeId> {
        let name = name.trim();
        let name = name.strip_prefix("T:").unwrap_or(name);
        let (name, arity) = match name.split_once('`') {
            Some((base, count)) => (base, count.parse().unwrap_or(0)),
            None => (name, 0),
        };
        if let Some(full) = predefined_alias(name) {
            return self.types.lookup_full(full, 0);
        }
        self.lookup_type_def(name, arity, NodeIndex::NONE)
    }

    // =========================================================================
    // Supertypes and compatibility
    // =========================================================================

    /// `ty` followed by its base classes and interfaces, with type arguments
    /// substituted, nearest first.
    pub fn supertypes(&self, ty: &Ty) -> Vec<Ty> {
        let object = self.object_ty();
        match ty {
            Ty::Unknown => vec![Ty::Unknown],
            Ty::Null | Ty::Param(_) => vec![ty.clone(), object],
            Ty::Array(elem) => {
                let mut out = vec![ty.clone()];
                out.push(self.well_known_ty(WellKnownType::Array));
                for name in [
                    "System.Collections.Generic.IList",
                    "System.Collections.Generic.IReadOnlyList",
                    "System.Collections.Generic.ICollection",
                    "System.Collections.Generic.IEnumerable",
                ] {
                    if let Some(def) = self.types.lookup_full(name, 1) {
                        out.push(Ty::Named(def, vec![(**elem).clone()]));
                    }
                }
                out.push(object);
                out
            }
            Ty::Named(..) => {
                let mut out: Vec<Ty> = Vec::new();
                let mut queue = std::collections::VecDeque::from([ty.clone()]);
                while let Some(current) = queue.pop_front() {
                    if out.len() as u32 > MAX_BASE_CHAIN_DEPTH * 2 {
                        break;
                    }
                    if out.contains(&current) {
                        continue;
                    }
                    let Some(info) = current.def().and_then(|d| self.types.get(d)) else {
                        continue;
                    };
                    let substitution = info.substitution(current.args());
                    if let Some(base) = &info.base {
                        queue.push_back(base.substitute(&substitution));
                    }
                    for iface in &info.interfaces {
                        queue.push_back(iface.substitute(&substitution));
                    }
                    out.push(current);
                }
                if !out.contains(&object) && !object.is_unknown() {
                    out.push(object);
                }
                out
            }
        }
    }

    pub fn numeric_kind(&self, ty: &Ty) -> Option<NumericKind> {
        let info = self.types.get(ty.def()?)?;
        NumericKind::from_full_name(&info.full_name)
    }

    /// Implicit reference/identity compatibility, ignoring generic variance.
    pub fn is_assignable(&self, from: &Ty, to: &Ty) -> bool {
        match (from, to) {
            (Ty::Unknown, _) | (_, Ty::Unknown) | (_, Ty::Param(_)) => true,
            (Ty::Null, Ty::Named(def, _)) => self.types.get(*def).is_some_and(|t| {
                !t.is_value_type()
                    || Some(*def) == self.well_known_type(WellKnownType::Nullable)
            }),
            (Ty::Null, _) => true,
            (Ty::Array(f), Ty::Array(t)) => self.is_assignable(f, t),
            _ => {
                let Some(target) = to.def() else {
                    return false;
                };
                self.supertypes(from).iter().any(|s| s.def() == Some(target))
            }
        }
    }

    /// Bind method type variables in `param` from `arg`.
    fn unify(&self, param: &Ty, arg: &Ty, vars: &[String], subst: &mut FxHashMap<String, Ty>) {
        match param {
            Ty::Param(name) if vars.iter().any(|v| v == name) => {
                if !subst.contains_key(name) && !matches!(arg, Ty::Unknown | Ty::Null) {
                    subst.insert(name.clone(), arg.clone());
                }
            }
            Ty::Named(def, params) if !params.is_empty() => {
                let Some(matching) = self
                    .supertypes(arg)
                    .into_iter()
                    .find(|s| s.def() == Some(*def))
                else {
                    return;
                };
                for (p, a) in params.iter().zip(matching.args()) {
                    self.unify(p, a, vars, subst);
                }
            }
            Ty::Array(elem) => {
                if let Ty::Array(arg_elem) = arg {
                    self.unify(elem, arg_elem, vars, subst);
                }
            }
            _ => {}
        }
    }

    /// Score one argument against one parameter type; `None` when incompatible.
    fn argument_score(&self, arg: &Ty, param: &Ty) -> Option<i32> {
        if arg.is_unknown() || param.is_unknown() || matches!(param, Ty::Param(_)) {
            return Some(0);
        }
        if arg == param {
            return Some(3);
        }
        if let (Some(from), Some(to)) = (self.numeric_kind(arg), self.numeric_kind(param)) {
            return from.widens_to(to).then_some(1);
        }
        if self.is_assignable(arg, param) {
            return Some(2);
        }
        None
    }

    /// `System.Func`/`System.Action` definitions and their parameter count.
    pub fn delegate_shape(&self, ty: &Ty) -> Option<(usize, bool)> {
        let info = self.types.get(ty.def()?)?;
        match info.full_name.as_str() {
            "System.Func" => Some((info.type_params.len().saturating_sub(1), true)),
            "System.Action" => Some((info.type_params.len(), false)),
            _ => None,
        }
    }

    // =========================================================================
    // Member lookup
    // =========================================================================

    /// Members named `name` visible on `ty`, nearest declaration first. A
    /// member hides inherited members with the same name and parameter count.
    pub(crate) fn lookup_members(
        &self,
        ty: &Ty,
        name: &str,
        filter: impl Fn(&MemberInfo) -> bool,
    ) -> Vec<(MemberId, FxHashMap<String, Ty>)> {
        let mut out: Vec<(MemberId, FxHashMap<String, Ty>)> = Vec::new();
        // parameter counts declared by nearer types hide inherited members
        let mut hidden: SmallVec<[usize; 4]> = SmallVec::new();
        for supertype in self.supertypes(ty) {
            let Some(info) = supertype.def().and_then(|d| self.types.get(d)) else {
                continue;
            };
            let substitution = info.substitution(supertype.args());
            let mut declared_here: SmallVec<[usize; 4]> = SmallVec::new();
            for &id in &info.members {
                let Some(member) = self.members.get(id) else {
                    continue;
                };
                if member.name != name
                    || member.accessor_kind().is_some()
                    || hidden.contains(&member.params.len())
                    || !filter(member)
                {
                    continue;
                }
                declared_here.push(member.params.len());
                out.push((id, substitution.clone()));
            }
            hidden.extend(declared_here);
        }
        out
    }

    /// Enclosing type definitions of `at`, innermost first.
    pub(crate) fn enclosing_types(&self, at: NodeIndex) -> Vec<TypeId> {
        self.arena
            .ancestors(at)
            .filter_map(|a| self.type_by_node.get(&a).copied())
            .collect()
    }

    /// Unqualified member lookup through the enclosing types.
    pub(crate) fn lookup_in_enclosing_types(
        &self,
        name: &str,
        at: NodeIndex,
        filter: impl Fn(&MemberInfo) -> bool,
    ) -> Vec<(MemberId, FxHashMap<String, Ty>)> {
        for ty in self.enclosing_types(at) {
            let found = self.lookup_members(&self.self_type(ty), name, &filter);
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Dotted name of an identifier / member-access chain (`System.IO.File`).
    pub(crate) fn dotted_name(&self, expr: NodeIndex) -> Option<String> {
        match self.arena.kind(expr)? {
            NodeKind::Identifier(id) => Some(id.name.clone()),
            NodeKind::MemberAccess(m) if !m.conditional => {
                let mut prefix = self.dotted_name(m.expression)?;
                prefix.push('.');
                prefix.push_str(&m.name);
                Some(prefix)
            }
            _ => None,
        }
    }

    fn is_value_name(&self, name: &str, at: NodeIndex) -> bool {
        self.lookup_local(name, at).is_some()
            || !self
                .lookup_in_enclosing_types(name, at, |m| {
                    matches!(
                        m.kind,
                        MemberKind::Field
                            | MemberKind::Property
                            | MemberKind::Event
                    )
                })
                .is_empty()
    }

    pub(crate) fn receiver_of(&self, expr: NodeIndex, mode: Mode) -> Receiver {
        let expr = self.arena.skip_parentheses(expr);
        match self.arena.kind(expr) {
            Some(NodeKind::Base) => {
                let base = self
                    .enclosing_types(expr)
                    .first()
                    .and_then(|&t| self.types.get(t))
                    .and_then(|t| t.base.clone())
                    .unwrap_or(Ty::Unknown);
                Receiver::Base(base)
            }
            Some(NodeKind::Identifier(id)) => {
                if !self.is_value_name(&id.name, expr) {
                    if let Some(full) = predefined_alias(&id.name) {
                        if let Some(def) = self.types.lookup_full(full, 0) {
                            return Receiver::Type(def);
                        }
                    }
                    if let Some(def) = self.lookup_type_def(&id.name, id.type_args.len(), expr) {
                        return Receiver::Type(def);
                    }
                }
                Receiver::Value(self.type_of_mode(expr, mode))
            }
            Some(NodeKind::MemberAccess(m)) => {
                let ty = self.type_of_mode(expr, mode);
                if ty.is_unknown()
                    && let Some(name) = self.dotted_name(expr)
                    && let Some(def) = self.lookup_type_def(&name, m.type_args.len(), expr)
                {
                    return Receiver::Type(def);
                }
                Receiver::Value(ty)
            }
            _ => Receiver::Value(self.type_of_mode(expr, mode)),
        }
    }

    // =========================================================================
    // Overload selection
    // =========================================================================

    fn parameter_index(member: &MemberInfo, position: usize) -> Option<usize> {
        if position < member.params.len() {
            return Some(position);
        }
        member
            .params
            .last()
            .filter(|p| p.is_params)
            .map(|_| member.params.len() - 1)
    }

    /// Score a candidate for `arguments`; `None` when it is not applicable.
    fn score_candidate(
        &self,
        member_id: MemberId,
        owner_subst: &FxHashMap<String, Ty>,
        explicit_type_args: &[Ty],
        extension_receiver: Option<&Ty>,
        arguments: &[NodeIndex],
        mode: Mode,
    ) -> Option<Candidate> {
        let member = self.members.get(member_id)?;
        let offset = usize::from(extension_receiver.is_some());
        if !member.accepts_arity(arguments.len() + offset) {
            return None;
        }
        let mut subst = owner_subst.clone();
        if !explicit_type_args.is_empty() {
            if explicit_type_args.len() != member.type_params.len() {
                return None;
            }
            for (name, ty) in member.type_params.iter().zip(explicit_type_args) {
                subst.insert(name.clone(), ty.clone());
            }
        }
        let vars = &member.type_params;
        let mut score = 0;

        if let Some(receiver) = extension_receiver {
            let first = &member.params.first()?.ty;
            if let Some(def) = first.def()
                && !receiver.is_unknown()
            {
                let matching = self
                    .supertypes(receiver)
                    .into_iter()
                    .find(|s| s.def() == Some(def))?;
                if matching.args() == first.substitute(&subst).args() {
                    score += 3;
                }
            }
            self.unify(first, receiver, vars, &mut subst);
        }

        let mut arg_params: SmallVec<[Option<usize>; 4]> = SmallVec::new();
        let mut arg_types: SmallVec<[Option<Ty>; 4]> = SmallVec::new();
        for (i, &arg) in arguments.iter().enumerate() {
            let param_index = Self::parameter_index(member, i + offset);
            arg_params.push(param_index);
            let is_lambda = matches!(
                self.arena.kind(self.arena.skip_parentheses(arg)),
                Some(NodeKind::Lambda(_))
            );
            if is_lambda {
                arg_types.push(None);
                continue;
            }
            let arg_ty = mode
                .deeper()
                .map_or(Ty::Unknown, |m| self.type_of_mode(arg, m));
            if let Some(param) = param_index.and_then(|p| member.params.get(p)) {
                let param_ty = match (&param.ty, param.is_params, &arg_ty) {
                    (Ty::Array(elem), true, ty) if !matches!(ty, Ty::Array(_)) => (**elem).clone(),
                    (ty, _, _) => ty.clone(),
                };
                self.unify(&param_ty, &arg_ty, vars, &mut subst);
            }
            arg_types.push(Some(arg_ty));
        }

        // Lambdas once the other arguments have bound what they can.
        for (i, &arg) in arguments.iter().enumerate() {
            if arg_types[i].is_some() {
                continue;
            }
            let Some(param) = arg_params[i].and_then(|p| member.params.get(p)) else {
                continue;
            };
            let lambda = self.arena.skip_parentheses(arg);
            let Some((count, returns)) = self.delegate_shape(&param.ty) else {
                continue;
            };
            if self.arena.function_params(lambda).len() != count {
                return None;
            }
            score += 1;
            if returns && mode.infer_lambdas {
                let declared_result = param.ty.args().last().cloned().unwrap_or(Ty::Unknown);
                let result = mode
                    .deeper()
                    .map_or(Ty::Unknown, |m| self.lambda_return_type(lambda, m));
                match declared_result.substitute(&subst) {
                    Ty::Param(_) => self.unify(&declared_result, &result, vars, &mut subst),
                    expected => {
                        score += self.argument_score(&result, &expected).unwrap_or(0);
                    }
                }
            }
        }

        for (i, arg_ty) in arg_types.iter().enumerate() {
            let (Some(arg_ty), Some(param)) =
                (arg_ty, arg_params[i].and_then(|p| member.params.get(p)))
            else {
                continue;
            };
            let mut param_ty = param.ty.substitute(&subst);
            if param.is_params
                && !matches!(arg_ty, Ty::Array(_))
                && let Ty::Array(elem) = param_ty
            {
                param_ty = *elem;
            }
            score += self.argument_score(arg_ty, &param_ty)?;
        }

        Some(Candidate {
            score,
            member: member_id,
            substitution: subst,
            arg_params,
        })
    }

    fn best_candidate(
        &self,
        candidates: &[(MemberId, FxHashMap<String, Ty>)],
        explicit_type_args: &[Ty],
        extension_receiver: Option<&Ty>,
        arguments: &[NodeIndex],
        mode: Mode,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for (id, owner_subst) in candidates {
            let Some(candidate) = self.score_candidate(
                *id,
                owner_subst,
                explicit_type_args,
                extension_receiver,
                arguments,
                mode,
            ) else {
                continue;
            };
            if best.as_ref().is_none_or(|b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best
    }

    fn into_call(candidate: Candidate, receiver: NodeIndex, is_extension: bool) -> ResolvedCall {
        ResolvedCall {
            member: candidate.member,
            substitution: candidate.substitution,
            receiver,
            is_extension,
            arg_params: candidate.arg_params,
        }
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Resolve the target of an invocation expression.
    pub fn resolve_call(&self, invocation: NodeIndex) -> Option<ResolvedCall> {
        if let Some(cached) = self.call_cache.get(&invocation) {
            return cached.clone();
        }
        let resolved = self.resolve_call_mode(invocation, Mode::FULL);
        self.call_cache.insert(invocation, resolved.clone());
        resolved
    }

    pub(crate) fn resolve_call_mode(&self, invocation: NodeIndex, mode: Mode) -> Option<ResolvedCall> {
        let Some(NodeKind::Invocation(data)) = self.arena.kind(invocation) else {
            return None;
        };
        let arguments = &data.arguments;
        let callee = self.arena.skip_parentheses(data.expression);
        match self.arena.kind(callee)? {
            NodeKind::MemberAccess(access) => {
                let explicit: Vec<Ty> = access
                    .type_args
                    .iter()
                    .map(|t| self.resolve_type_syntax(t, invocation))
                    .collect();
                let name = access.name.as_str();
                match self.receiver_of(access.expression, mode) {
                    Receiver::Type(def) => {
                        let candidates =
                            self.lookup_members(&Ty::named(def), name, |m| {
                                m.kind == MemberKind::Method && m.is_static
                            });
                        self.best_candidate(&candidates, &explicit, None, arguments, mode)
                            .map(|c| Self::into_call(c, NodeIndex::NONE, false))
                    }
                    Receiver::Base(ty) | Receiver::Value(ty) => {
                        let candidates = self.lookup_members(&ty, name, |m| {
                            m.kind == MemberKind::Method && !m.is_static
                        });
                        if let Some(found) =
                            self.best_candidate(&candidates, &explicit, None, arguments, mode)
                        {
                            return Some(Self::into_call(found, access.expression, false));
                        }
                        if let Some(found) =
                            self.resolve_extension(name, &ty, &explicit, arguments, mode)
                        {
                            return Some(Self::into_call(found, access.expression, true));
                        }
                        self.resolve_delegate_invoke(callee, &[], arguments, mode)
                    }
                }
            }
            NodeKind::Identifier(id) => {
                if let Some(local) = self.lookup_local(&id.name, callee) {
                    if local.kind == LocalKind::LocalFunction {
                        let member = self.member_by_node.get(&local.decl).copied()?;
                        let candidate = self.score_candidate(
                            member,
                            &FxHashMap::default(),
                            &[],
                            None,
                            arguments,
                            mode,
                        )?;
                        return Some(Self::into_call(candidate, NodeIndex::NONE, false));
                    }
                    return self.resolve_delegate_invoke(callee, &[], arguments, mode);
                }
                let explicit: Vec<Ty> = id
                    .type_args
                    .iter()
                    .map(|t| self.resolve_type_syntax(t, invocation))
                    .collect();
                let candidates = self
                    .lookup_in_enclosing_types(&id.name, callee, |m| m.kind == MemberKind::Method);
                if candidates.is_empty() {
                    return self.resolve_delegate_invoke(callee, &[], arguments, mode);
                }
                self.best_candidate(&candidates, &explicit, None, arguments, mode)
                    .map(|c| Self::into_call(c, NodeIndex::NONE, false))
            }
            NodeKind::Base | NodeKind::This => {
                let ty = match self.receiver_of(callee, mode) {
                    Receiver::Base(ty) => ty,
                    _ => self
                        .enclosing_types(callee)
                        .first()
                        .map_or(Ty::Unknown, |&t| self.self_type(t)),
                };
                self.resolve_constructor_of(&ty, arguments, mode)
                    .map(|c| Self::into_call(c, NodeIndex::NONE, false))
            }
            _ => self.resolve_delegate_invoke(callee, &[], arguments, mode),
        }
    }

    fn resolve_extension(
        &self,
        name: &str,
        receiver: &Ty,
        explicit: &[Ty],
        arguments: &[NodeIndex],
        mode: Mode,
    ) -> Option<Candidate> {
        if receiver.is_unknown() {
            return None;
        }
        let candidates: Vec<(MemberId, FxHashMap<String, Ty>)> = self
            .extension_methods
            .get(name)?
            .iter()
            .map(|&id| (id, FxHashMap::default()))
            .collect();
        self.best_candidate(&candidates, explicit, Some(receiver), arguments, mode)
    }

    /// Invocation of a delegate value: a lambda or local function when the
    /// target is known, otherwise the delegate type's `Invoke`.
    fn resolve_delegate_invoke(
        &self,
        callee: NodeIndex,
        explicit: &[Ty],
        arguments: &[NodeIndex],
        mode: Mode,
    ) -> Option<ResolvedCall> {
        if let Some(target) = self.delegate_target(callee) {
            let candidate = self.score_candidate(
                target,
                &FxHashMap::default(),
                explicit,
                None,
                arguments,
                mode,
            )?;
            return Some(Self::into_call(candidate, NodeIndex::NONE, false));
        }
        let ty = mode
            .deeper()
            .map_or(Ty::Unknown, |m| self.type_of_mode(callee, m));
        self.delegate_shape(&ty)?;
        let candidates = self.lookup_members(&ty, "Invoke", |m| m.kind == MemberKind::Method);
        self.best_candidate(&candidates, explicit, None, arguments, mode)
            .map(|c| Self::into_call(c, callee, false))
    }

    /// The lambda, local function or method a delegate-valued expression
    /// refers to, when statically known.
    pub fn delegate_target(&self, expr: NodeIndex) -> Option<MemberId> {
        let expr = self.arena.skip_parentheses(expr);
        match self.arena.kind(expr)? {
            NodeKind::Lambda(_) => self.member_by_node.get(&expr).copied(),
            NodeKind::Identifier(id) => match self.lookup_local(&id.name, expr) {
                Some(local) if local.kind == LocalKind::LocalFunction => {
                    self.member_by_node.get(&local.decl).copied()
                }
                Some(_) => {
                    let initializer = self.alias_initializer(expr)?;
                    let initializer = self.arena.skip_parentheses(initializer);
                    if matches!(self.arena.kind(initializer), Some(NodeKind::Lambda(_))) {
                        self.member_by_node.get(&initializer).copied()
                    } else {
                        None
                    }
                }
                None => self.resolve_method_group(expr),
            },
            NodeKind::MemberAccess(_) => self.resolve_method_group(expr),
            _ => None,
        }
    }

    /// A method named by an expression used as a value (`list.ForEach(Process)`).
    pub fn resolve_method_group(&self, expr: NodeIndex) -> Option<MemberId> {
        let expr = self.arena.skip_parentheses(expr);
        match self.arena.kind(expr)? {
            NodeKind::Identifier(id) => {
                if self.lookup_local(&id.name, expr).is_some() {
                    return None;
                }
                self.lookup_in_enclosing_types(&id.name, expr, |m| m.kind == MemberKind::Method)
                    .first()
                    .map(|(id, _)| *id)
            }
            NodeKind::MemberAccess(access) => {
                let found = match self.receiver_of(access.expression, Mode::FULL) {
                    Receiver::Type(def) => self.lookup_members(&Ty::named(def), &access.name, |m| {
                        m.kind == MemberKind::Method && m.is_static
                    }),
                    Receiver::Base(ty) | Receiver::Value(ty) => {
                        self.lookup_members(&ty, &access.name, |m| m.kind == MemberKind::Method)
                    }
                };
                found.first().map(|(id, _)| *id)
            }
            _ => None,
        }
    }

    // =========================================================================
    // Constructors, properties and indexers
    // =========================================================================

    fn resolve_constructor_of(&self, ty: &Ty, arguments: &[NodeIndex], mode: Mode) -> Option<Candidate> {
        let def = ty.def()?;
        let info = self.types.get(def)?;
        let substitution = info.substitution(ty.args());
        let candidates: Vec<(MemberId, FxHashMap<String, Ty>)> = info
            .members
            .iter()
            .copied()
            .filter(|&m| {
                self.members
                    .get(m)
                    .is_some_and(|m| m.kind == MemberKind::Constructor)
            })
            .map(|m| (m, substitution.clone()))
            .collect();
        self.best_candidate(&candidates, &[], None, arguments, mode)
    }

    /// Resolve the constructor a `new T(...)` expression calls. `None` for
    /// types without declared constructors.
    pub fn resolve_constructor(&self, creation: NodeIndex) -> Option<ResolvedCall> {
        let Some(NodeKind::ObjectCreation(data)) = self.arena.kind(creation) else {
            return None;
        };
        let ty = self.type_of(creation);
        self.resolve_constructor_of(&ty, &data.arguments, Mode::FULL)
            .map(|c| Self::into_call(c, NodeIndex::NONE, false))
    }

    /// Resolve the property, indexer or event accessed by a member access,
    /// identifier or element access. Fields resolve to `None`.
    pub fn resolve_property(&self, node: NodeIndex) -> Option<ResolvedCall> {
        let property_like = |m: &MemberInfo| m.kind.is_property_like();
        match self.arena.kind(node)? {
            NodeKind::MemberAccess(access) => {
                let found = match self.receiver_of(access.expression, Mode::FULL) {
                    Receiver::Type(def) => self.lookup_members(&Ty::named(def), &access.name, |m| {
                        property_like(m) && m.is_static
                    }),
                    Receiver::Base(ty) | Receiver::Value(ty) => {
                        self.lookup_members(&ty, &access.name, property_like)
                    }
                };
                let (member, substitution) = found.into_iter().next()?;
                Some(ResolvedCall {
                    member,
                    substitution,
                    receiver: access.expression,
                    is_extension: false,
                    arg_params: SmallVec::new(),
                })
            }
            NodeKind::Identifier(id) => {
                if self.lookup_local(&id.name, node).is_some() {
                    return None;
                }
                let (member, substitution) = self
                    .lookup_in_enclosing_types(&id.name, node, property_like)
                    .into_iter()
                    .next()?;
                Some(ResolvedCall {
                    member,
                    substitution,
                    receiver: NodeIndex::NONE,
                    is_extension: false,
                    arg_params: SmallVec::new(),
                })
            }
            NodeKind::ElementAccess(access) => {
                let receiver_ty = if access.expression.is_some() {
                    self.type_of(access.expression)
                } else {
                    self.initializer_target_type(node)
                };
                if matches!(receiver_ty, Ty::Array(_) | Ty::Unknown) {
                    return None;
                }
                let candidates =
                    self.lookup_members(&receiver_ty, "this", |m| m.kind == MemberKind::Indexer);
                self.best_candidate(&candidates, &[], None, &access.arguments, Mode::FULL)
                    .map(|c| Self::into_call(c, access.expression, false))
            }
            _ => None,
        }
    }

    /// Type being initialised by the object initializer containing `node`
    /// (`new Dictionary<K, V> { [k] = v }`).
    fn initializer_target_type(&self, node: NodeIndex) -> Ty {
        for ancestor in self.arena.ancestors(node) {
            match self.arena.kind(ancestor) {
                Some(NodeKind::InitializerList(_) | NodeKind::Assignment(_)) => continue,
                Some(NodeKind::ObjectCreation(_)) => return self.type_of(ancestor),
                _ => return Ty::Unknown,
            }
        }
        Ty::Unknown
    }

    /// The `Invoke` member of a delegate type, used when a delegate value is
    /// called and its target is unknown.
    pub fn is_delegate_invoke(&self, member: MemberId) -> bool {
        self.members.get(member).is_some_and(|m| {
            m.name == "Invoke"
                && self
                    .types
                    .get(m.owner)
                    .is_some_and(|t| matches!(t.full_name.as_str(), "System.Func" | "System.Action"))
        })
    }
}
