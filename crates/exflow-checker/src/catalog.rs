//! Exception catalog: what a callable may throw.
//!
//! The exceptions of a member are the types of its declared contract plus,
//! with documentation interop, the `<exception>` tags of its doc comment
//! (inline, or from the sidecar file of a referenced module). The per-member
//! result is cached for the session; nullability filtering depends on the
//! arguments and is applied per call site on top of the cached list.

use crate::context::CheckerContext;
use crate::doc_comments::{
    Affinity, DocException, accessor_affinity, documentation_id, parse_fragment,
};
use crate::policy::{AccessorDefault, AnalysisFlags};
use dashmap::DashMap;
use exflow_binder::{
    LocalKind, MemberId, MemberInfo, MemberKind, ResolvedCall, Ty, TypeId, WellKnownType,
};
use exflow_parser::parser::node::{AccessorKind, BinaryOp, LiteralKind};
use exflow_parser::{NodeIndex, NodeKind};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub exception_type: TypeId,
    pub description: String,
    /// Parameters named by `<paramref>` in the description.
    pub parameter_names: SmallVec<[String; 1]>,
}

impl ExceptionInfo {
    fn declared(exception_type: TypeId) -> Self {
        ExceptionInfo {
            exception_type,
            description: String::new(),
            parameter_names: SmallVec::new(),
        }
    }
}

/// Session cache of per-member exception lists. Concurrent writers compute
/// the same value for a key, so last-writer-wins is harmless.
#[derive(Debug, Default)]
pub struct ExceptionCache {
    entries: DashMap<MemberId, Arc<[ExceptionInfo]>>,
}

impl ExceptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, member: MemberId) -> Option<Arc<[ExceptionInfo]>> {
        self.entries.get(&member).map(|e| Arc::clone(e.value()))
    }

    pub fn insert(&self, member: MemberId, exceptions: Arc<[ExceptionInfo]>) {
        self.entries.insert(member, exceptions);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> CheckerContext<'a> {
    /// Everything `member` is declared or documented to throw.
    pub fn exceptions_of(&self, member: MemberId) -> Arc<[ExceptionInfo]> {
        if let Some(cached) = self.exceptions.get(member) {
            return cached;
        }
        let computed: Arc<[ExceptionInfo]> = self.compute_exceptions(member).into();
        self.exceptions.insert(member, Arc::clone(&computed));
        computed
    }

    fn compute_exceptions(&self, member: MemberId) -> Vec<ExceptionInfo> {
        let Some(info) = self.model.member(member) else {
            return Vec::new();
        };
        let mut out: Vec<ExceptionInfo> = self
            .model
            .contract_of(info.decl)
            .map(|contract| contract.types().map(ExceptionInfo::declared).collect())
            .unwrap_or_default();
        if self.flag(AnalysisFlags::DOC_INTEROP) {
            for documented in self.documented_exceptions(info) {
                let duplicate = out.iter().any(|e| {
                    e.exception_type == documented.exception_type
                        && e.parameter_names == documented.parameter_names
                });
                if !duplicate {
                    out.push(documented);
                }
            }
        }
        trace!(member = %info.name, count = out.len(), "catalogued exceptions");
        out
    }

    /// Documented exceptions, split by accessor for property documentation.
    pub fn documented_exceptions(&self, info: &MemberInfo) -> Vec<ExceptionInfo> {
        let (documented, accessor) = match info.kind {
            MemberKind::Accessor(kind) => {
                let Some(property) = info.property.and_then(|p| self.model.member(p)) else {
                    return Vec::new();
                };
                (property, Some((info.property, kind)))
            }
            _ => (info, None),
        };
        self.doc_entries(documented)
            .into_iter()
            .filter(|entry| match accessor {
                Some((Some(property), kind)) => {
                    self.applies_to_accessor(property, kind, accessor_affinity(&entry.description))
                }
                _ => true,
            })
            .filter_map(|entry| {
                let Some(ty) = self.model.resolve_type_name(&entry.cref) else {
                    trace!(cref = %entry.cref, "unresolved documented exception");
                    return None;
                };
                Some(ExceptionInfo {
                    exception_type: ty,
                    description: entry.description,
                    parameter_names: entry.param_names,
                })
            })
            .collect()
    }

    /// Raw `<exception>` tags of a member: its own doc comment, else the
    /// sidecar file of the module that declares it.
    pub fn doc_entries(&self, info: &MemberInfo) -> Vec<DocException> {
        if let Some(fragment) = self.model.arena().doc_comment(info.decl) {
            return parse_fragment(fragment).unwrap_or_else(|err| {
                debug!(member = %info.name, error = %err, "malformed doc comment");
                Vec::new()
            });
        }
        let Some(module) = self.model.module_path(info.file) else {
            return Vec::new();
        };
        let Some(file) = self.docs.for_module(module) else {
            return Vec::new();
        };
        let Some(id) = documentation_id(self.model, info) else {
            return Vec::new();
        };
        file.exceptions(&id).map(<[_]>::to_vec).unwrap_or_default()
    }

    fn applies_to_accessor(&self, property: MemberId, kind: AccessorKind, affinity: Affinity) -> bool {
        if matches!(kind, AccessorKind::Add | AccessorKind::Remove) {
            return true;
        }
        let has_getter = self.model.accessor_of(property, AccessorKind::Get).is_some();
        let has_setter = self.model.accessor_of(property, AccessorKind::Set).is_some()
            || self.model.accessor_of(property, AccessorKind::Init).is_some();
        match affinity {
            Affinity::Getter => kind == AccessorKind::Get || !has_getter,
            Affinity::Setter => kind.is_setter_like() || !has_setter,
            Affinity::Unattributed if has_getter && has_setter => {
                kind == AccessorKind::Get || self.policy.accessor_default == AccessorDefault::Both
            }
            Affinity::Unattributed => true,
        }
    }

    // =========================================================================
    // Call sites
    // =========================================================================

    /// Exception types of a call to `member`, after nullability filtering
    /// against the call's arguments.
    pub fn call_site_exceptions(
        &self,
        member: MemberId,
        call: Option<(&ResolvedCall, &[NodeIndex])>,
    ) -> SmallVec<[TypeId; 4]> {
        let exceptions = self.exceptions_of(member);
        let argument_null = self.oracle.well_known(WellKnownType::ArgumentNullException);
        let info = self.model.member(member);
        let mut out = SmallVec::new();
        for exception in exceptions.iter() {
            let droppable = self.flag(AnalysisFlags::NULLABLE_CONTEXT)
                && Some(exception.exception_type) == argument_null
                && matches!((info, call), (Some(info), Some(call)) if self.null_argument_impossible(info, exception, call));
            if !droppable && !out.contains(&exception.exception_type) {
                out.push(exception.exception_type);
            }
        }
        out
    }

    fn null_argument_impossible(
        &self,
        info: &MemberInfo,
        exception: &ExceptionInfo,
        (call, arguments): (&ResolvedCall, &[NodeIndex]),
    ) -> bool {
        let argument_non_null = |param: usize| {
            let argument = call.argument_for_param(arguments, param);
            argument.is_some() && self.is_provably_non_null(argument)
        };
        if !exception.parameter_names.is_empty() {
            return exception.parameter_names.iter().all(|name| {
                info.params
                    .iter()
                    .position(|p| p.name == *name)
                    .is_some_and(argument_non_null)
            });
        }
        matches!(info.params.as_slice(), [only] if info.nullable_context && !only.annotated_nullable)
            && argument_non_null(0)
    }

    /// The expression can never evaluate to null.
    pub fn is_provably_non_null(&self, expr: NodeIndex) -> bool {
        self.is_provably_non_null_depth(expr, 0)
    }

    fn is_provably_non_null_depth(&self, expr: NodeIndex, depth: u32) -> bool {
        if depth > exflow_common::limits::MAX_PIPELINE_ALIAS_HOPS {
            return false;
        }
        let arena = self.model.arena();
        let expr = arena.skip_parentheses(expr);
        let Some(kind) = arena.kind(expr) else {
            return false;
        };
        match kind {
            NodeKind::Literal(literal) => literal.kind != LiteralKind::Null,
            NodeKind::ObjectCreation(_)
            | NodeKind::ArrayCreation(_)
            | NodeKind::This
            | NodeKind::TypeOf(_)
            | NodeKind::InterpolatedString(_) => true,
            NodeKind::Binary(binary) if binary.op == BinaryOp::Add => {
                let string = self.model.well_known(WellKnownType::String);
                let is_string =
                    |side: NodeIndex| string.is_some() && self.model.type_of(side).def() == string;
                is_string(binary.left) || is_string(binary.right)
            }
            NodeKind::Binary(binary) if binary.op == BinaryOp::Coalesce => {
                self.is_provably_non_null_depth(binary.right, depth + 1)
            }
            NodeKind::Identifier(ident) => {
                if let Some(local) = self.model.lookup_local(&ident.name, expr) {
                    let declared_non_null = local.declared_type.as_ref().is_some_and(|t| {
                        !t.is_var() && !t.nullable && self.model.nullable_enabled_at(expr)
                    });
                    if declared_non_null && local.kind != LocalKind::PatternVariable {
                        return true;
                    }
                    if let Some(initializer) = self.model.alias_initializer(expr) {
                        return self.is_provably_non_null_depth(initializer, depth + 1);
                    }
                }
                self.is_value_type_expression(expr)
            }
            _ => self.is_value_type_expression(expr),
        }
    }

    fn is_value_type_expression(&self, expr: NodeIndex) -> bool {
        let ty = self.model.type_of(expr);
        let Ty::Named(def, _) = ty else {
            return false;
        };
        if Some(def) == self.model.well_known(WellKnownType::Nullable) {
            return false;
        }
        self.model.type_info(def).is_some_and(|t| t.is_value_type())
    }
}
