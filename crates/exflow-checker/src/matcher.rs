//! Handler and declaration matching for a single escape site.

use crate::context::ScopeChecker;
use crate::policy::AnalysisFlags;
use exflow_binder::TypeId;
use exflow_parser::parser::node::TryData;
use exflow_parser::{NodeIndex, NodeKind};

/// How an escaping type relates to the contract of its scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Declared {
    Yes,
    /// Surfaces at the enumeration of a deferred pipeline instead.
    Implicit,
    No,
}

impl<'a> ScopeChecker<'a> {
    /// An enclosing `try` of the same function-like scope catches `ty`
    /// thrown at `site`. Sites inside a catch or finally block are not
    /// handled by that block's own `try`.
    pub(crate) fn is_handled_locally(&self, site: NodeIndex, ty: TypeId) -> bool {
        let arena = self.model().arena();
        let mut child = site;
        for ancestor in arena.ancestors(site) {
            match arena.kind(ancestor) {
                None => return false,
                Some(kind) if kind.is_function_like() => return false,
                Some(NodeKind::Property(property)) if !property.has_accessor_list() => return false,
                Some(NodeKind::Try(data)) if data.block == child => {
                    if self.try_handles(data, ty) {
                        return true;
                    }
                }
                _ => {}
            }
            child = ancestor;
        }
        false
    }

    fn try_handles(&self, data: &TryData, ty: TypeId) -> bool {
        let arena = self.model().arena();
        data.catches.iter().any(|&clause| {
            let Some(NodeKind::Catch(catch)) = arena.kind(clause) else {
                return false;
            };
            if catch.filter.is_some() {
                return false;
            }
            let Some(syntax) = &catch.ty else {
                return true;
            };
            self.model()
                .resolve_type_syntax(syntax, clause)
                .def()
                .is_some_and(|declared| self.oracle().is_subtype_or_equal(ty, declared))
        })
    }

    /// Whether the nearest contract owner around `site` declares `ty`.
    pub(crate) fn is_declared(&self, site: NodeIndex, ty: TypeId) -> Declared {
        let model = self.model();
        let owner = model.arena().enclosing_contract_owner(site);
        match model.arena().kind(owner) {
            None | Some(NodeKind::Field(_)) => return Declared::No,
            _ => {}
        }
        if let Some(contract) = model.contract_of(owner)
            && self.oracle().is_covered_by(ty, contract.types())
        {
            return Declared::Yes;
        }
        if self.ctx.flag(AnalysisFlags::LINQ_IMPLICIT_DECLARATION)
            && self.is_pipeline_argument(owner)
        {
            return Declared::Implicit;
        }
        Declared::No
    }

    /// `lambda` is an argument of a sequence operator call.
    pub(crate) fn is_pipeline_argument(&self, lambda: NodeIndex) -> bool {
        let arena = self.model().arena();
        if !matches!(arena.kind(lambda), Some(NodeKind::Lambda(_))) {
            return false;
        }
        let mut argument = lambda;
        let mut parent = arena.parent(lambda);
        while let Some(NodeKind::Parenthesized(_)) = arena.kind(parent) {
            argument = parent;
            parent = arena.parent(parent);
        }
        match arena.kind(parent) {
            Some(NodeKind::Invocation(data)) if data.arguments.contains(&argument) => {
                self.invocation_pipeline_role(parent).is_some()
            }
            _ => false,
        }
    }
}
