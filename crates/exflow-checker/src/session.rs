//! Analysis sessions.
//!
//! A session owns the classification policy and the caches shared by every
//! scope analysis. Scopes are independent: each one gets its own
//! [`ScopeChecker`] and they run in parallel on the rayon pool. Results are
//! sorted so the output does not depend on scheduling.

use crate::catalog::ExceptionCache;
use crate::config::{ConfigError, Settings};
use crate::context::{CheckerContext, ScopeChecker};
use crate::doc_cache::DocFileCache;
use crate::policy::ClassificationPolicy;
use exflow_binder::SemanticModel;
use exflow_common::Diagnostic;
use exflow_parser::{NodeIndex, NodeKind};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info_span};

/// Cooperative cancellation flag, checked before each scope.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct AnalysisSession {
    policy: Arc<ClassificationPolicy>,
    exceptions: ExceptionCache,
    docs: DocFileCache,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        AnalysisSession::new(ClassificationPolicy::default())
    }
}

impl AnalysisSession {
    pub fn new(policy: ClassificationPolicy) -> Self {
        AnalysisSession {
            policy: Arc::new(policy),
            exceptions: ExceptionCache::new(),
            docs: DocFileCache::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(AnalysisSession::new(ClassificationPolicy::from_settings(settings)?))
    }

    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    pub fn exception_cache(&self) -> &ExceptionCache {
        &self.exceptions
    }

    pub fn doc_cache(&self) -> &DocFileCache {
        &self.docs
    }

    /// Analyse every scope of the model's user files.
    pub fn analyze(&self, model: &dyn SemanticModel) -> Vec<Diagnostic> {
        self.analyze_with_cancellation(model, &CancellationToken::new())
    }

    /// Like [`Self::analyze`]; scopes reached after `cancel` is signalled
    /// contribute nothing.
    pub fn analyze_with_cancellation(
        &self,
        model: &dyn SemanticModel,
        cancel: &CancellationToken,
    ) -> Vec<Diagnostic> {
        let ctx = CheckerContext::new(model, &self.policy, &self.exceptions, &self.docs);
        let scopes = analysis_scopes(model);
        let _span = info_span!("analyze", scopes = scopes.len()).entered();

        let per_scope: Vec<Vec<Diagnostic>> = scopes
            .par_iter()
            .map(|&scope| {
                if cancel.is_cancelled() {
                    return Vec::new();
                }
                check_scope(&ctx, scope)
            })
            .collect();

        let mut diagnostics: Vec<Diagnostic> = per_scope.into_iter().flatten().collect();
        diagnostics.sort_by(|a, b| {
            (a.file.as_str(), a.start, a.code, a.length, a.message_text.as_str()).cmp(&(
                b.file.as_str(),
                b.start,
                b.code,
                b.length,
                b.message_text.as_str(),
            ))
        });
        diagnostics.dedup();
        debug!(
            diagnostics = diagnostics.len(),
            cached_members = self.exceptions.len(),
            "analysis finished"
        );
        diagnostics
    }
}

/// Function-like declarations and properties of the user files, in node order.
pub fn analysis_scopes(model: &dyn SemanticModel) -> Vec<NodeIndex> {
    let arena = model.arena();
    let user_files: FxHashSet<_> = model.user_files().into_iter().collect();
    (0..arena.len() as u32)
        .map(NodeIndex)
        .filter(|&idx| arena.file_of(idx).is_some_and(|f| user_files.contains(&f.id)))
        .filter(|&idx| {
            arena
                .kind(idx)
                .is_some_and(|kind| kind.is_function_like() || matches!(kind, NodeKind::Property(_)))
        })
        .collect()
}

fn check_scope(ctx: &CheckerContext<'_>, scope: NodeIndex) -> Vec<Diagnostic> {
    let name = ctx.model.arena().declaration_name(scope).unwrap_or("<anonymous>");
    let _span = info_span!("scope", node = scope.0, name).entered();
    let mut checker = ScopeChecker::new(ctx, scope);
    let flow = checker.analyze_scope();
    checker.check_contract(&flow);
    checker.diagnostics
}
