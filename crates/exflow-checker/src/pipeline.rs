//! Deferred sequence pipelines (`xs.Where(..).Select(..).First()`).
//!
//! Stage operators only compose; their function arguments run when a
//! terminal operator or a materialisation (`ToList`, `foreach`) enumerates
//! the pipeline. The exceptions of every stage are therefore harvested at
//! that point by walking the pipeline backwards to its source.

use crate::context::{EscapeOrigin, ScopeChecker};
use crate::flow::EscapeSet;
use crate::policy::{AnalysisFlags, Classification};
use exflow_binder::{MemberInfo, ResolvedCall, Ty, TypeId, WellKnownType};
use exflow_common::diagnostic_messages;
use exflow_common::limits::{MAX_PIPELINE_ALIAS_HOPS, MAX_PIPELINE_STAGES};
use exflow_parser::{NodeIndex, NodeKind};
use smallvec::SmallVec;
use tracing::trace;

const ENUMERABLE: &str = "System.Linq.Enumerable";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineRole {
    /// Lazily composes a new sequence.
    Stage,
    /// Enumerates and produces a single value.
    Terminal,
    /// Enumerates into a collection.
    Materializer,
}

impl PipelineRole {
    pub const fn enumerates(self) -> bool {
        !matches!(self, PipelineRole::Stage)
    }
}

/// Role of a sequence operator by name.
pub fn pipeline_role(name: &str) -> Option<PipelineRole> {
    Some(match name {
        "Where" | "Select" | "SelectMany" | "OrderBy" | "OrderByDescending" | "ThenBy"
        | "ThenByDescending" | "Skip" | "Take" | "SkipWhile" | "TakeWhile" | "Distinct"
        | "Reverse" | "Concat" | "Cast" | "OfType" | "GroupBy" | "Zip" => PipelineRole::Stage,
        "First" | "FirstOrDefault" | "Last" | "LastOrDefault" | "Single" | "SingleOrDefault"
        | "ElementAt" | "ElementAtOrDefault" | "Count" | "LongCount" | "Any" | "All"
        | "Contains" | "Sum" | "Average" | "Min" | "Max" | "Aggregate" => PipelineRole::Terminal,
        "ToList" | "ToArray" | "ToHashSet" | "ToDictionary" | "ToLookup" => {
            PipelineRole::Materializer
        }
        _ => return None,
    })
}

impl<'a> ScopeChecker<'a> {
    /// Pipeline role of a resolved call, when sequence support is enabled.
    pub(crate) fn call_pipeline_role(&self, call: &ResolvedCall) -> Option<PipelineRole> {
        if !self.ctx.flag(AnalysisFlags::LINQ_SUPPORT) {
            return None;
        }
        let info = self.model().member(call.member)?;
        if self.model().full_type_name(info.owner) != ENUMERABLE {
            return None;
        }
        pipeline_role(&info.name)
    }

    /// Role of the operator invoked by `invocation`.
    pub(crate) fn invocation_pipeline_role(&self, invocation: NodeIndex) -> Option<PipelineRole> {
        let call = self.model().resolve_call(invocation)?;
        self.call_pipeline_role(&call)
    }

    /// Exceptions raised when an enumerating operator runs: its intrinsic
    /// failures, its own function arguments and every upstream stage.
    pub(crate) fn enumeration_escapes(
        &mut self,
        invocation: NodeIndex,
        call: &ResolvedCall,
        arguments: &[NodeIndex],
    ) -> SmallVec<[(TypeId, EscapeOrigin); 4]> {
        let mut out = SmallVec::new();
        if let Some(info) = self.model().member(call.member) {
            for ty in self.intrinsic_exceptions(info, call) {
                out.push((ty, EscapeOrigin::Call));
            }
        }
        let mut harvested = EscapeSet::default();
        self.harvest_arguments(call, arguments, &mut harvested);
        let source = call.argument_for_param(arguments, 0);
        self.walk_upstream(source, &mut harvested);
        trace!(
            invocation = invocation.0,
            count = harvested.len(),
            "harvested deferred pipeline"
        );
        out.extend(harvested.into_iter().map(|ty| (ty, EscapeOrigin::Pipeline)));
        out
    }

    /// Exceptions raised by enumerating `source` (a `foreach` expression).
    pub(crate) fn materialization_escapes(&mut self, source: NodeIndex) -> EscapeSet {
        let mut harvested = EscapeSet::default();
        if self.ctx.flag(AnalysisFlags::LINQ_SUPPORT) {
            self.walk_upstream(source, &mut harvested);
        }
        harvested
    }

    /// Follow parentheses, casts, aliases and stage operators from `source`
    /// towards the sequence the pipeline starts from.
    fn walk_upstream(&mut self, source: NodeIndex, out: &mut EscapeSet) {
        let mut current = source;
        let mut hops = 0;
        let mut stages = 0;
        while current.is_some() {
            let node = self.model().arena().skip_parentheses(current);
            match self.model().arena().kind(node) {
                Some(NodeKind::Cast(cast)) => current = cast.expression,
                Some(NodeKind::Identifier(_)) if hops < MAX_PIPELINE_ALIAS_HOPS => {
                    let Some(initializer) = self.model().alias_initializer(node) else {
                        break;
                    };
                    hops += 1;
                    current = initializer;
                }
                Some(NodeKind::Invocation(data)) if stages < MAX_PIPELINE_STAGES => {
                    let Some(call) = self.model().resolve_call(node) else {
                        break;
                    };
                    if self.call_pipeline_role(&call) != Some(PipelineRole::Stage) {
                        break;
                    }
                    stages += 1;
                    if let Some(ty) = self.cast_stage_failure(&call, &data.arguments) {
                        out.insert(ty);
                    }
                    self.harvest_arguments(&call, &data.arguments, out);
                    current = call.argument_for_param(&data.arguments, 0);
                }
                _ => break,
            }
        }
    }

    /// Exceptions contributed by the function arguments of one operator.
    fn harvest_arguments(&mut self, call: &ResolvedCall, arguments: &[NodeIndex], out: &mut EscapeSet) {
        let source = call.argument_for_param(arguments, 0);
        let implicit = self.ctx.flag(AnalysisFlags::LINQ_IMPLICIT_DECLARATION);
        for &argument in arguments {
            if argument == source {
                continue;
            }
            self.harvest_function_argument(argument, implicit, out);
        }
    }

    /// Declared exceptions of a lambda, local function or method group passed
    /// as an argument; with `implicit`, also what a lambda body lets escape.
    pub(crate) fn harvest_function_argument(
        &mut self,
        argument: NodeIndex,
        implicit: bool,
        out: &mut EscapeSet,
    ) {
        let model = self.model();
        let argument = model.arena().skip_parentheses(argument);
        let lambda = match model.arena().kind(argument) {
            Some(NodeKind::Lambda(_)) => Some(argument),
            Some(NodeKind::Identifier(_)) => model
                .alias_initializer(argument)
                .map(|init| model.arena().skip_parentheses(init))
                .filter(|&init| matches!(model.arena().kind(init), Some(NodeKind::Lambda(_)))),
            _ => None,
        };
        if let Some(lambda) = lambda {
            if let Some(contract) = model.contract_of(lambda) {
                out.extend(contract.types());
            }
            if implicit {
                out.extend(self.lambda_body_escapes(lambda));
            }
            return;
        }
        let target = model
            .resolve_method_group(argument)
            .or_else(|| model.delegate_target(argument));
        if let Some(target) = target {
            out.extend(self.ctx.exceptions_of(target).iter().map(|e| e.exception_type));
        }
    }

    /// Exceptions that escape a lambda body, from a silent analysis of the
    /// lambda as its own scope.
    fn lambda_body_escapes(&mut self, lambda: NodeIndex) -> EscapeSet {
        if let Some(cached) = self.lambda_escapes.get(&lambda) {
            return cached.clone();
        }
        let mut nested = ScopeChecker::silent(self.ctx, lambda);
        let escapes = nested.analyze_scope().escapes;
        self.lambda_escapes.insert(lambda, escapes.clone());
        escapes
    }

    fn intrinsic_exceptions(&self, info: &MemberInfo, call: &ResolvedCall) -> SmallVec<[TypeId; 2]> {
        let oracle = self.oracle();
        let decimal = self.model().well_known(WellKnownType::Decimal);
        let returns_decimal = || {
            decimal.is_some() && info.ty.substitute(&call.substitution).def() == decimal
        };
        let kind = match info.name.as_str() {
            "First" | "Last" | "Single" | "Min" | "Max" => {
                Some(WellKnownType::InvalidOperationException)
            }
            "ElementAt" => Some(WellKnownType::ArgumentOutOfRangeException),
            "Sum" if returns_decimal() => Some(WellKnownType::OverflowException),
            "Average" if returns_decimal() => Some(WellKnownType::OverflowException),
            "Average" => Some(WellKnownType::InvalidOperationException),
            "Aggregate" if info.params.len() == 2 => Some(WellKnownType::InvalidOperationException),
            "ToDictionary" => Some(WellKnownType::ArgumentException),
            _ => None,
        };
        kind.and_then(|k| oracle.well_known(k)).into_iter().collect()
    }

    /// `Cast<T>()` fails at enumeration when the element type of its source
    /// is not known to convert to `T`.
    fn cast_stage_failure(&self, call: &ResolvedCall, arguments: &[NodeIndex]) -> Option<TypeId> {
        let model = self.model();
        let info = model.member(call.member)?;
        if info.name != "Cast" {
            return None;
        }
        let target = info
            .type_params
            .first()
            .and_then(|p| call.substitution.get(p))
            .cloned()
            .unwrap_or(Ty::Unknown);
        if target.is_unknown() {
            return None;
        }
        let source = call.argument_for_param(arguments, 0);
        let element = model.element_type(&model.type_of(source));
        if !element.is_unknown() && model.is_assignable(&element, &target) {
            return None;
        }
        self.oracle().well_known(WellKnownType::InvalidCastException)
    }

    // =========================================================================
    // Boundaries
    // =========================================================================

    /// The stage invocation a deferred (not yet enumerated) pipeline
    /// expression ends in, following aliases.
    pub(crate) fn deferred_pipeline(&self, expr: NodeIndex) -> Option<NodeIndex> {
        let arena = self.model().arena();
        let mut current = expr;
        for _ in 0..=MAX_PIPELINE_ALIAS_HOPS {
            let node = arena.skip_parentheses(current);
            match arena.kind(node)? {
                NodeKind::Cast(cast) => current = cast.expression,
                NodeKind::Identifier(_) => current = self.model().alias_initializer(node)?,
                NodeKind::Invocation(_) => {
                    return (self.invocation_pipeline_role(node) == Some(PipelineRole::Stage))
                        .then_some(node);
                }
                _ => return None,
            }
        }
        None
    }

    /// Report a deferred pipeline that leaves the scope (returned, or handed
    /// to a callee that is not a sequence operator) while it can still throw.
    pub(crate) fn check_pipeline_boundary(&mut self, expr: NodeIndex) {
        if !self.reporting()
            || !self.ctx.flag(AnalysisFlags::LINQ_SUPPORT)
            || !self.ctx.flag(AnalysisFlags::LINQ_BOUNDARY_WARNINGS)
        {
            return;
        }
        if self.deferred_pipeline(expr).is_none() {
            return;
        }
        let mut harvested = EscapeSet::default();
        self.walk_upstream(expr, &mut harvested);
        let oracle = self.oracle();
        let first = harvested
            .iter()
            .copied()
            .find(|&ty| oracle.classify(ty) != Classification::Ignored);
        if let Some(ty) = first {
            self.report_exception(expr, &diagnostic_messages::DEFERRED_PIPELINE_ESCAPES_BOUNDARY, ty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_by_operator_name() {
        assert_eq!(pipeline_role("Where"), Some(PipelineRole::Stage));
        assert_eq!(pipeline_role("Cast"), Some(PipelineRole::Stage));
        assert_eq!(pipeline_role("FirstOrDefault"), Some(PipelineRole::Terminal));
        assert_eq!(pipeline_role("ToDictionary"), Some(PipelineRole::Materializer));
        assert_eq!(pipeline_role("Add"), None);
        assert!(PipelineRole::Materializer.enumerates());
        assert!(!PipelineRole::Stage.enumerates());
    }
}
