//! Shared analysis context and the per-scope checker state.

use crate::catalog::ExceptionCache;
use crate::doc_cache::DocFileCache;
use crate::flow::EscapeSet;
use crate::oracle::Oracle;
use crate::policy::{AnalysisFlags, ClassificationPolicy};
use exflow_binder::{SemanticModel, TypeId};
use exflow_common::diagnostics::DiagnosticMessage;
use exflow_common::{Diagnostic, Span};
use exflow_parser::NodeIndex;
use rustc_hash::FxHashMap;

/// Read-only collaborators of every scope analysis in a session.
pub struct CheckerContext<'a> {
    pub model: &'a dyn SemanticModel,
    pub policy: &'a ClassificationPolicy,
    pub exceptions: &'a ExceptionCache,
    pub docs: &'a DocFileCache,
    pub oracle: Oracle<'a, dyn SemanticModel + 'a>,
}

impl<'a> CheckerContext<'a> {
    pub fn new(
        model: &'a dyn SemanticModel,
        policy: &'a ClassificationPolicy,
        exceptions: &'a ExceptionCache,
        docs: &'a DocFileCache,
    ) -> Self {
        CheckerContext {
            model,
            policy,
            exceptions,
            docs,
            oracle: Oracle::new(model, policy),
        }
    }

    #[inline]
    pub fn flag(&self, flag: AnalysisFlags) -> bool {
        self.policy.is_enabled(flag)
    }

    /// Redundancy of catches and declarations is reported.
    pub fn redundancy_enabled(&self) -> bool {
        self.flag(AnalysisFlags::CONTROL_FLOW) || self.flag(AnalysisFlags::LEGACY_REDUNDANCY)
    }
}

/// How an escape was discovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EscapeOrigin {
    Throw,
    /// `throw;` inside a catch clause.
    Rethrow,
    Call,
    Constructor,
    Accessor,
    Cast,
    /// Harvested from a deferred pipeline at its terminal operation.
    Pipeline,
    /// Declared by a lambda or method group passed as an argument.
    Lambda,
}

/// One exception type that may leave an expression, and where.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Escape {
    pub site: NodeIndex,
    pub exception: TypeId,
    pub origin: EscapeOrigin,
}

/// The catch clause whose block is being analysed; `throw;` re-escapes
/// its declared type, or what a catch-all absorbed.
#[derive(Clone, Debug)]
pub(crate) struct CatchFrame {
    pub declared: Option<TypeId>,
    pub absorbed: EscapeSet,
}

/// Mutable state of one function-like scope analysis.
pub(crate) struct ScopeChecker<'a> {
    pub ctx: &'a CheckerContext<'a>,
    /// Function-like node or expression-bodied property being checked.
    pub scope: NodeIndex,
    pub diagnostics: Vec<Diagnostic>,
    /// Discover escapes without reporting anything (nested lambda bodies).
    pub silent: bool,
    /// Number of enclosing dead regions.
    pub dead_depth: u32,
    pub catch_frames: Vec<CatchFrame>,
    pub lambda_escapes: FxHashMap<NodeIndex, EscapeSet>,
}

impl<'a> ScopeChecker<'a> {
    pub fn new(ctx: &'a CheckerContext<'a>, scope: NodeIndex) -> Self {
        ScopeChecker {
            ctx,
            scope,
            diagnostics: Vec::new(),
            silent: false,
            dead_depth: 0,
            catch_frames: Vec::new(),
            lambda_escapes: FxHashMap::default(),
        }
    }

    pub fn silent(ctx: &'a CheckerContext<'a>, scope: NodeIndex) -> Self {
        ScopeChecker {
            silent: true,
            ..ScopeChecker::new(ctx, scope)
        }
    }

    #[inline]
    pub fn model(&self) -> &'a dyn SemanticModel {
        self.ctx.model
    }

    #[inline]
    pub fn oracle(&self) -> Oracle<'a, dyn SemanticModel + 'a> {
        self.ctx.oracle
    }

    /// Site diagnostics are emitted: not silent, and not inside dead code.
    pub fn reporting(&self) -> bool {
        !self.silent && self.dead_depth == 0
    }

    pub fn report(&mut self, node: NodeIndex, message: &DiagnosticMessage, args: &[&str]) {
        let span = self.model().arena().span(node);
        self.report_span(node, span, message, args);
    }

    /// Report with an explicit span; `anchor` locates the file.
    pub fn report_span(
        &mut self,
        anchor: NodeIndex,
        span: Span,
        message: &DiagnosticMessage,
        args: &[&str],
    ) {
        if self.silent {
            return;
        }
        let file = self
            .model()
            .arena()
            .file_of(anchor)
            .map_or_else(String::new, |f| f.file_name.clone());
        self.diagnostics.push(Diagnostic::from_message(
            message,
            file,
            span.start,
            span.len(),
            args,
        ));
    }

    /// Report a diagnostic about one exception type, named by its full name.
    pub fn report_exception(&mut self, node: NodeIndex, message: &DiagnosticMessage, ty: TypeId) {
        if self.silent {
            return;
        }
        let full = self.oracle().full_name(ty);
        self.report(node, message, &[full]);
        if let Some(last) = self.diagnostics.last_mut() {
            last.exception_type = Some(full.to_string());
        }
    }

    /// Like [`Self::report_exception`], with a second message argument.
    pub fn report_exception_with(
        &mut self,
        node: NodeIndex,
        message: &DiagnosticMessage,
        ty: TypeId,
        other: &str,
    ) {
        if self.silent {
            return;
        }
        let full = self.oracle().full_name(ty);
        self.report(node, message, &[full, other]);
        if let Some(last) = self.diagnostics.last_mut() {
            last.exception_type = Some(full.to_string());
        }
    }
}
