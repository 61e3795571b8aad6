//! Contract shape and redundancy diagnostics.
//!
//! Runs once per scope after flow analysis, comparing the declared contract
//! with what the body actually lets escape, with the member's documentation,
//! and with the contracts of the base and interface members it implements.

use crate::context::ScopeChecker;
use crate::flow::FlowResult;
use crate::policy::{AnalysisFlags, Classification};
use exflow_binder::{ContractEntry, DeclaredContract, MemberId, MemberInfo, TypeId};
use exflow_common::{Span, diagnostic_messages};
use exflow_parser::{NodeIndex, NodeKind};
use smallvec::SmallVec;

impl<'a> ScopeChecker<'a> {
    /// Report everything wrong with the contract of the checked scope.
    /// `flow` is the result of [`Self::analyze_scope`].
    pub(crate) fn check_contract(&mut self, flow: &FlowResult) {
        let model = self.model();
        let arena = model.arena();
        let contract = model.contract_of(self.scope).filter(|c| !c.is_empty());

        if let Some(NodeKind::Property(property)) = arena.kind(self.scope)
            && property.has_accessor_list()
        {
            if let Some(contract) = contract {
                for entry in &contract.entries {
                    self.report(
                        entry.argument,
                        &diagnostic_messages::THROWS_DECLARATION_INVALID_ON_FULL_PROPERTY,
                        &[property.name.as_str()],
                    );
                }
            }
            return;
        }

        if let Some(contract) = contract {
            self.check_entries(contract);
            if self.ctx.redundancy_enabled() && arena.function_body(self.scope).is_some() {
                self.check_never_thrown(contract, flow);
            }
        }

        let Some(member) = model.member_of_declaration(self.scope) else {
            return;
        };
        let Some(info) = model.member(member) else {
            return;
        };
        let declared: SmallVec<[TypeId; 4]> =
            contract.map(|c| c.types().collect()).unwrap_or_default();
        if self.ctx.flag(AnalysisFlags::DOC_INTEROP) {
            self.check_documentation(info, &declared);
        }
        self.check_base_members(info, contract, &declared);
    }

    /// A declared `System.Exception` stands for "everything else".
    fn is_catch_rest(&self, ty: TypeId) -> bool {
        self.ctx.flag(AnalysisFlags::GENERAL_AS_CATCH_REST) && self.oracle().is_most_general(ty)
    }

    fn check_entries(&mut self, contract: &DeclaredContract) {
        let oracle = self.oracle();
        for (i, entry) in contract.entries.iter().enumerate() {
            let ty = entry.ty;
            if contract.entries[..i].iter().any(|e| e.ty == ty) {
                self.report_exception(entry.argument, &diagnostic_messages::DUPLICATE_DECLARATION, ty);
                continue;
            }
            if oracle.is_most_general(ty)
                && self.ctx.flag(AnalysisFlags::BASE_DECLARED_DIAGNOSTIC)
                && !self.is_catch_rest(ty)
            {
                self.report_exception(
                    entry.argument,
                    &diagnostic_messages::EXCEPTION_DECLARED_VIA_MOST_GENERAL_TYPE,
                    ty,
                );
            }
            let broader = contract
                .types()
                .find(|&other| other != ty && oracle.is_subtype_or_equal(ty, other));
            if let Some(broader) = broader
                && !self.is_catch_rest(broader)
            {
                self.report_exception_with(
                    entry.argument,
                    &diagnostic_messages::DECLARATION_REDUNDANT_BY_HIERARCHY,
                    ty,
                    oracle.full_name(broader),
                );
            }
        }
    }

    fn check_never_thrown(&mut self, contract: &DeclaredContract, flow: &FlowResult) {
        let oracle = self.oracle();
        for (i, entry) in contract.entries.iter().enumerate() {
            let ty = entry.ty;
            if contract.entries[..i].iter().any(|e| e.ty == ty)
                || self.is_catch_rest(ty)
                || oracle.classify(ty) == Classification::Ignored
            {
                continue;
            }
            let thrown = flow
                .escapes
                .iter()
                .any(|&escape| oracle.is_subtype_or_equal(escape, ty));
            if !thrown {
                self.report_exception(
                    entry.argument,
                    &diagnostic_messages::REDUNDANT_DECLARATION_NEVER_THROWN,
                    ty,
                );
            }
        }
    }

    fn check_documentation(&mut self, info: &MemberInfo, declared: &[TypeId]) {
        let oracle = self.oracle();
        let mut reported: SmallVec<[TypeId; 2]> = SmallVec::new();
        for documented in self.ctx.documented_exceptions(info) {
            let ty = documented.exception_type;
            if reported.contains(&ty)
                || oracle.classify(ty) == Classification::Ignored
                || oracle.is_covered_by(ty, declared.iter().copied())
            {
                continue;
            }
            reported.push(ty);
            let span = self.name_span(self.scope);
            let full = oracle.full_name(ty);
            self.report_span(
                self.scope,
                span,
                &diagnostic_messages::DOCUMENTATION_DECLARES_WITHOUT_CONTRACT,
                &[full],
            );
            if let Some(last) = self.diagnostics.last_mut() {
                last.exception_type = Some(full.to_string());
            }
        }
    }

    // =========================================================================
    // Base and interface members
    // =========================================================================

    fn check_base_members(
        &mut self,
        info: &MemberInfo,
        contract: Option<&DeclaredContract>,
        declared: &[TypeId],
    ) {
        let bases: SmallVec<[MemberId; 2]> =
            info.overrides.into_iter().chain(info.implements.iter().copied()).collect();
        for base in bases {
            let base_name = self.member_display_name(base);
            let base_types: SmallVec<[TypeId; 4]> = self
                .ctx
                .exceptions_of(base)
                .iter()
                .map(|e| e.exception_type)
                .collect();
            if let Some(contract) = contract {
                self.check_wider_than_base(contract, &base_types, &base_name);
            }
            self.check_missing_from_base(declared, &base_types, &base_name);
        }
    }

    /// Entries the base member does not cover.
    fn check_wider_than_base(
        &mut self,
        contract: &DeclaredContract,
        base_types: &[TypeId],
        base_name: &str,
    ) {
        let oracle = self.oracle();
        let mut seen: SmallVec<[TypeId; 4]> = SmallVec::new();
        for &ContractEntry { ty, argument, .. } in &contract.entries {
            if seen.contains(&ty) {
                continue;
            }
            seen.push(ty);
            if oracle.classify(ty) == Classification::Ignored
                || oracle.is_covered_by(ty, base_types.iter().copied())
            {
                continue;
            }
            self.report_exception_with(
                argument,
                &diagnostic_messages::MISSING_DECLARATION_RELATIVE_TO_BASE_MEMBER,
                ty,
                base_name,
            );
        }
    }

    /// Base declarations this member neither repeats nor covers.
    fn check_missing_from_base(&mut self, declared: &[TypeId], base_types: &[TypeId], base_name: &str) {
        let oracle = self.oracle();
        let mut seen: SmallVec<[TypeId; 4]> = SmallVec::new();
        for &ty in base_types {
            if seen.contains(&ty) {
                continue;
            }
            seen.push(ty);
            if oracle.classify(ty) == Classification::Ignored
                || oracle.is_covered_by(ty, declared.iter().copied())
            {
                continue;
            }
            let span = self.name_span(self.scope);
            let full = oracle.full_name(ty);
            self.report_span(
                self.scope,
                span,
                &diagnostic_messages::MISSING_DECLARATION_PROPAGATED_FROM_BASE_MEMBER,
                &[full, base_name],
            );
            if let Some(last) = self.diagnostics.last_mut() {
                last.exception_type = Some(full.to_string());
            }
        }
    }

    /// `Owner.Member`, as shown in diagnostics.
    fn member_display_name(&self, member: MemberId) -> String {
        let Some(info) = self.model().member(member) else {
            return String::new();
        };
        let owner = self.oracle().simple_name(info.owner);
        match info.accessor_kind() {
            Some(kind) => format!("{owner}.{}.{}", info.name, kind.keyword()),
            None => format!("{owner}.{}", info.name),
        }
    }

    /// Span of a declaration's name, or of the whole declaration.
    fn name_span(&self, decl: NodeIndex) -> Span {
        let arena = self.model().arena();
        match arena.kind(decl) {
            Some(NodeKind::Method(d) | NodeKind::Constructor(d) | NodeKind::LocalFunction(d)) => {
                d.name_span
            }
            Some(NodeKind::Property(d)) => d.name_span,
            _ => arena.span(decl),
        }
    }
}
