//! Leaf exception discovery within one expression tree.
//!
//! Lambda bodies and local functions are separate scopes and are not
//! entered; a lambda passed as an argument contributes its declared
//! contract to the call instead.

use crate::context::{Escape, EscapeOrigin, ScopeChecker};
use crate::flow::EscapeSet;
use crate::matcher::Declared;
use crate::pipeline::PipelineRole;
use crate::policy::{AnalysisFlags, Classification};
use exflow_binder::{
    ConstValue, MemberId, MemberKind, NumericKind, ResolvedCall, Ty, TypeId, WellKnownType,
};
use exflow_common::diagnostic_messages;
use exflow_parser::parser::node::{AccessorKind, AssignmentOp, CastData};
use exflow_parser::{NodeIndex, NodeKind};
use smallvec::{SmallVec, smallvec};

impl<'a> ScopeChecker<'a> {
    /// Every escape raised by evaluating `expr`, in evaluation order.
    ///
    /// The tree is walked with an explicit stack: operator chains such as
    /// `a + b + c + ...` nest as deep as they are long.
    pub(crate) fn collect_escapes(&mut self, expr: NodeIndex) -> Vec<Escape> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeIndex, bool)> = vec![(expr, false)];
        while let Some((node, children_done)) = stack.pop() {
            if children_done {
                self.node_escapes(node, &mut out);
                continue;
            }
            let Some(kind) = self.model().arena().kind(node) else {
                continue;
            };
            if matches!(kind, NodeKind::Lambda(_) | NodeKind::LocalFunction(_)) {
                continue;
            }
            stack.push((node, true));
            stack.extend(kind.children().into_iter().rev().map(|child| (child, false)));
        }
        out
    }

    fn node_escapes(&mut self, node: NodeIndex, out: &mut Vec<Escape>) {
        let Some(kind) = self.model().arena().kind(node) else {
            return;
        };
        match kind {
            NodeKind::ThrowExpression(operand) => {
                if let Some(ty) = self.thrown_type(*operand) {
                    out.push(Escape {
                        site: node,
                        exception: ty,
                        origin: EscapeOrigin::Throw,
                    });
                }
            }
            NodeKind::Invocation(data) => self.call_escapes(node, &data.arguments, out),
            NodeKind::ObjectCreation(data) => {
                if let Some(call) = self.model().resolve_constructor(node) {
                    self.push_call_site(
                        node,
                        call.member,
                        Some((&call, &data.arguments)),
                        EscapeOrigin::Constructor,
                        out,
                    );
                }
            }
            NodeKind::Cast(data) => {
                if let Some(ty) = self.cast_failure(node, data) {
                    out.push(Escape {
                        site: node,
                        exception: ty,
                        origin: EscapeOrigin::Cast,
                    });
                }
            }
            NodeKind::Identifier(_) | NodeKind::MemberAccess(_) | NodeKind::ElementAccess(_) => {
                self.accessor_escapes(node, out);
            }
            _ => {}
        }
    }

    /// Type of the exception thrown by `throw operand`.
    pub(crate) fn thrown_type(&self, operand: NodeIndex) -> Option<TypeId> {
        if operand.is_none() {
            return None;
        }
        self.model().type_of(operand).def()
    }

    fn push_call_site(
        &self,
        site: NodeIndex,
        member: MemberId,
        call: Option<(&ResolvedCall, &[NodeIndex])>,
        origin: EscapeOrigin,
        out: &mut Vec<Escape>,
    ) {
        for exception in self.ctx.call_site_exceptions(member, call) {
            out.push(Escape {
                site,
                exception,
                origin,
            });
        }
    }

    // =========================================================================
    // Calls
    // =========================================================================

    fn call_escapes(&mut self, node: NodeIndex, arguments: &[NodeIndex], out: &mut Vec<Escape>) {
        let Some(call) = self.model().resolve_call(node) else {
            return;
        };
        self.push_call_site(node, call.member, Some((&call, arguments)), EscapeOrigin::Call, out);
        match self.call_pipeline_role(&call) {
            Some(PipelineRole::Stage) => {}
            Some(PipelineRole::Terminal | PipelineRole::Materializer) => {
                for (exception, origin) in self.enumeration_escapes(node, &call, arguments) {
                    out.push(Escape {
                        site: node,
                        exception,
                        origin,
                    });
                }
            }
            None => {
                let mut declared = EscapeSet::default();
                for &argument in arguments {
                    self.harvest_function_argument(argument, false, &mut declared);
                    self.check_pipeline_boundary(argument);
                }
                out.extend(declared.into_iter().map(|exception| Escape {
                    site: node,
                    exception,
                    origin: EscapeOrigin::Lambda,
                }));
            }
        }
    }

    /// The callee of `node`'s enclosing invocation is `node` itself.
    fn is_invocation_callee(&self, node: NodeIndex) -> bool {
        let arena = self.model().arena();
        let mut current = node;
        let mut parent = arena.parent(node);
        while let Some(NodeKind::Parenthesized(_)) = arena.kind(parent) {
            current = parent;
            parent = arena.parent(parent);
        }
        matches!(arena.kind(parent), Some(NodeKind::Invocation(data)) if data.expression == current)
    }

    // =========================================================================
    // Properties, indexers and events
    // =========================================================================

    fn accessor_escapes(&mut self, node: NodeIndex, out: &mut Vec<Escape>) {
        if self.is_invocation_callee(node) {
            return;
        }
        let model = self.model();
        let Some(call) = model.resolve_property(node) else {
            return;
        };
        let Some(property) = model.member(call.member) else {
            return;
        };
        let index_arguments: &[NodeIndex] = match model.arena().kind(node) {
            Some(NodeKind::ElementAccess(data)) => &data.arguments,
            _ => &[],
        };
        let mut used_accessor = false;
        for kind in self.accessed_kinds(node, property.kind) {
            let accessor = model.accessor_of(call.member, kind).or_else(|| {
                (kind == AccessorKind::Set)
                    .then(|| model.accessor_of(call.member, AccessorKind::Init))
                    .flatten()
            });
            if let Some(accessor) = accessor {
                used_accessor = true;
                self.push_call_site(
                    node,
                    accessor,
                    Some((&call, index_arguments)),
                    EscapeOrigin::Accessor,
                    out,
                );
            }
        }
        if !used_accessor && property.accessors.is_empty() {
            self.push_call_site(
                node,
                call.member,
                Some((&call, index_arguments)),
                EscapeOrigin::Accessor,
                out,
            );
        }
    }

    /// Accessors an access runs, by its syntactic position.
    fn accessed_kinds(&self, node: NodeIndex, member: MemberKind) -> SmallVec<[AccessorKind; 2]> {
        let arena = self.model().arena();
        let mut current = node;
        let mut parent = arena.parent(node);
        while let Some(NodeKind::Parenthesized(_)) = arena.kind(parent) {
            current = parent;
            parent = arena.parent(parent);
        }
        match arena.kind(parent) {
            Some(NodeKind::Assignment(data)) if data.target == current => {
                match (member, data.op) {
                    (MemberKind::Event, AssignmentOp::Add) => smallvec![AccessorKind::Add],
                    (MemberKind::Event, AssignmentOp::Subtract) => smallvec![AccessorKind::Remove],
                    (_, AssignmentOp::Assign) => smallvec![AccessorKind::Set],
                    _ => smallvec![AccessorKind::Get, AccessorKind::Set],
                }
            }
            Some(NodeKind::Unary(data)) if data.op.is_increment_or_decrement() => {
                smallvec![AccessorKind::Get, AccessorKind::Set]
            }
            _ => smallvec![AccessorKind::Get],
        }
    }

    // =========================================================================
    // Casts
    // =========================================================================

    fn cast_failure(&self, node: NodeIndex, data: &CastData) -> Option<TypeId> {
        let model = self.model();
        let oracle = self.oracle();
        let target = model.resolve_type_syntax(&data.ty, node);
        let source = model.type_of(data.expression);
        if target.is_unknown() || source.is_unknown() {
            return None;
        }
        if let (Some(from), Some(to)) = (model.numeric_kind(&source), model.numeric_kind(&target)) {
            if !from.is_narrowing_to(to) {
                return None;
            }
            let decimal_overflow = (from == NumericKind::Decimal && to.is_integral())
                || to == NumericKind::Decimal;
            if !decimal_overflow && !self.in_checked_context(node) {
                return None;
            }
            if let (Some(ConstValue::Int(value)), Some((lo, hi))) =
                (model.constant_value(data.expression), to.range())
                && (lo..=hi).contains(&value)
            {
                return None;
            }
            return oracle.well_known(WellKnownType::OverflowException);
        }
        let nullable = model.well_known(WellKnownType::Nullable);
        if nullable.is_some() && source.def() == nullable {
            if target.def() == nullable {
                return None;
            }
            return oracle.well_known(WellKnownType::InvalidOperationException);
        }
        if matches!(target, Ty::Param(_)) || matches!(source, Ty::Null) {
            return None;
        }
        if model.is_assignable(&source, &target) {
            return None;
        }
        if model.is_assignable(&target, &source) {
            return oracle.well_known(WellKnownType::InvalidCastException);
        }
        None
    }

    /// Integral narrowing at `node` is overflow-checked.
    fn in_checked_context(&self, node: NodeIndex) -> bool {
        let arena = self.model().arena();
        for ancestor in arena.ancestors(node) {
            match arena.kind(ancestor) {
                Some(NodeKind::CheckedExpression(data) | NodeKind::CheckedStatement(data)) => {
                    return data.checked;
                }
                Some(kind) if kind.is_function_like() => break,
                _ => {}
            }
        }
        self.ctx.flag(AnalysisFlags::CHECK_OVERFLOW)
    }

    // =========================================================================
    // Site checks
    // =========================================================================

    /// Record the non-ignored escapes in `out` and report the ones that are
    /// neither handled nor declared.
    pub(crate) fn check_sites(&mut self, escapes: &[Escape], out: &mut EscapeSet) {
        let oracle = self.oracle();
        for escape in escapes {
            let classification = oracle.classify(escape.exception);
            if classification == Classification::Ignored {
                continue;
            }
            out.insert(escape.exception);
            if !self.reporting() {
                continue;
            }
            if escape.origin == EscapeOrigin::Throw
                && oracle.is_most_general(escape.exception)
                && self.ctx.flag(AnalysisFlags::BASE_THROWN_DIAGNOSTIC)
            {
                self.report_exception(
                    escape.site,
                    &diagnostic_messages::EXCEPTION_THROWN_VIA_MOST_GENERAL_TYPE,
                    escape.exception,
                );
            }
            if self.is_handled_locally(escape.site, escape.exception) {
                continue;
            }
            let declared = self.is_declared(escape.site, escape.exception);
            match (classification, declared) {
                (_, Declared::Yes) => {}
                (Classification::Informational, _) => self.report_exception(
                    escape.site,
                    &diagnostic_messages::EXCEPTION_CLASSIFIED_INFORMATIONAL,
                    escape.exception,
                ),
                (_, Declared::Implicit) => self.report_exception(
                    escape.site,
                    &diagnostic_messages::IMPLICITLY_DECLARED_EXCEPTION_IN_DEFERRED_PIPELINE,
                    escape.exception,
                ),
                (_, Declared::No) => self.report_exception(
                    escape.site,
                    &diagnostic_messages::UNHANDLED_EXCEPTION,
                    escape.exception,
                ),
            }
        }
    }

    /// Evaluating `expr` never completes normally.
    pub(crate) fn always_throws(&self, expr: NodeIndex) -> bool {
        let model = self.model();
        let expr = model.arena().skip_parentheses(expr);
        match model.arena().kind(expr) {
            Some(NodeKind::ThrowExpression(_)) => true,
            Some(NodeKind::Invocation(_)) => model
                .resolve_call(expr)
                .and_then(|call| model.member(call.member))
                .is_some_and(|info| info.does_not_return),
            Some(NodeKind::Conditional(data)) => {
                self.always_throws(data.when_true) && self.always_throws(data.when_false)
            }
            Some(NodeKind::Assignment(data)) => self.always_throws(data.value),
            _ => false,
        }
    }
}
