//! try / catch / finally.
//!
//! The try block's escapes are matched against the clauses in source order.
//! A clause absorbs the still-unhandled types it covers; a clause with
//! nothing left to absorb is redundant and its body is dead.

use super::{EscapeSet, FlowResult};
use crate::context::{CatchFrame, ScopeChecker};
use crate::policy::{AnalysisFlags, Classification};
use exflow_binder::TypeId;
use exflow_common::diagnostic_messages;
use exflow_parser::parser::node::{CatchData, TryData};
use exflow_parser::{NodeIndex, NodeKind};

/// What a catch clause catches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClauseType {
    /// `catch { }`, or a clause for the most general exception type.
    All(Option<TypeId>),
    Typed(TypeId),
    /// Names a type that does not resolve.
    Unknown,
}

impl<'a> ScopeChecker<'a> {
    pub(crate) fn try_flow(&mut self, data: &TryData) -> FlowResult {
        let arena = self.model().arena();
        let tried = self.statement_flow(data.block);
        let produced = tried.escapes.clone();
        let mut unhandled = tried.escapes;
        let mut result = FlowResult {
            end_reachable: tried.end_reachable,
            contains_return: tried.contains_return,
            contains_break: tried.contains_break,
            contains_continue: tried.contains_continue,
            escapes: EscapeSet::default(),
            caught_type: None,
        };
        let mut handled_by: Vec<TypeId> = Vec::new();
        let mut clause_escapes = EscapeSet::default();

        for &clause in &data.catches {
            let Some(NodeKind::Catch(catch)) = arena.kind(clause) else {
                continue;
            };
            let clause_type = self.clause_type(clause, catch);
            if catch.filter.is_some() {
                let filter = self.expression_flow(catch.filter);
                clause_escapes.extend(filter.escapes);
            }
            let absorbed = if catch.filter.is_some() {
                EscapeSet::default()
            } else {
                let oracle = self.oracle();
                absorb(&mut unhandled, clause_type, |a, b| oracle.is_subtype_or_equal(a, b))
            };
            let redundant = catch.filter.is_none()
                && self.reporting()
                && self.ctx.redundancy_enabled()
                && self.check_clause(
                    clause,
                    clause_type,
                    &produced,
                    &absorbed,
                    &unhandled,
                    &handled_by,
                );
            if let ClauseType::Typed(ty) | ClauseType::All(Some(ty)) = clause_type
                && catch.filter.is_none()
            {
                handled_by.push(ty);
            }

            let declared = match clause_type {
                ClauseType::Typed(ty) | ClauseType::All(Some(ty)) => Some(ty),
                ClauseType::All(None) | ClauseType::Unknown => None,
            };
            self.catch_frames.push(CatchFrame { declared, absorbed });
            if redundant && self.ctx.flag(AnalysisFlags::CONTROL_FLOW) {
                self.dead_branch(catch.block);
            } else {
                let mut body = self.statement_flow(catch.block);
                body.caught_type = declared;
                result.end_reachable |= body.end_reachable;
                result.contains_return |= body.contains_return;
                result.contains_break |= body.contains_break;
                result.contains_continue |= body.contains_continue;
                clause_escapes.extend(body.escapes);
            }
            self.catch_frames.pop();
        }

        result.escapes = unhandled;
        result.escapes.extend(clause_escapes);

        if data.finally_block.is_some() {
            let finally = self.statement_flow(data.finally_block);
            if !finally.end_reachable {
                return finally;
            }
            result.absorb(finally);
        }
        result
    }

    fn clause_type(&self, clause: NodeIndex, catch: &CatchData) -> ClauseType {
        let Some(syntax) = &catch.ty else {
            return ClauseType::All(None);
        };
        match self.model().resolve_type_syntax(syntax, clause).def() {
            Some(ty) if self.oracle().is_most_general(ty) => ClauseType::All(Some(ty)),
            Some(ty) => ClauseType::Typed(ty),
            None => ClauseType::Unknown,
        }
    }

    /// Report a clause that can never run; returns whether it is redundant.
    fn check_clause(
        &mut self,
        clause: NodeIndex,
        clause_type: ClauseType,
        produced: &EscapeSet,
        absorbed: &EscapeSet,
        remaining: &EscapeSet,
        handled_by: &[TypeId],
    ) -> bool {
        let oracle = self.oracle();
        match clause_type {
            ClauseType::Unknown => false,
            ClauseType::All(_) => {
                if !absorbed.is_empty() {
                    return false;
                }
                self.report(clause, &diagnostic_messages::REDUNDANT_CATCH_ALL_CLAUSE, &[]);
                true
            }
            ClauseType::Typed(ty) => {
                if oracle.classify(ty) == Classification::Ignored {
                    return false;
                }
                if !produced.iter().any(|&p| oracle.is_related(p, ty)) {
                    self.report_exception(
                        clause,
                        &diagnostic_messages::REDUNDANT_TYPED_CATCH_CLAUSE,
                        ty,
                    );
                    return true;
                }
                // A broader type is still unhandled: the clause catches the
                // instances that happen to be `ty`.
                let narrows_remaining = remaining
                    .iter()
                    .any(|&r| oracle.is_subtype_or_equal(ty, r));
                if !absorbed.is_empty() || narrows_remaining {
                    return false;
                }
                if let Some(&earlier) = handled_by
                    .iter()
                    .find(|&&h| oracle.is_subtype_or_equal(ty, h))
                {
                    self.report_exception_with(
                        clause,
                        &diagnostic_messages::CATCH_OVERSHADOWED_BY_EARLIER_CLAUSE,
                        ty,
                        oracle.full_name(earlier),
                    );
                } else {
                    self.report_exception(
                        clause,
                        &diagnostic_messages::CATCH_HANDLES_NO_REMAINING_EXCEPTIONS,
                        ty,
                    );
                }
                true
            }
        }
    }
}

/// Remove and return the unhandled types a clause catches.
fn absorb(
    unhandled: &mut EscapeSet,
    clause_type: ClauseType,
    is_subtype: impl Fn(TypeId, TypeId) -> bool,
) -> EscapeSet {
    match clause_type {
        ClauseType::All(_) => std::mem::take(unhandled),
        ClauseType::Typed(ty) => {
            let caught: EscapeSet = unhandled
                .iter()
                .copied()
                .filter(|&u| is_subtype(u, ty))
                .collect();
            unhandled.retain(|u| !caught.contains(u));
            caught
        }
        ClauseType::Unknown => EscapeSet::default(),
    }
}
