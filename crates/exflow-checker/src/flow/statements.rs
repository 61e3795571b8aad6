//! Statement-level propagation and reachability.

use super::FlowResult;
use crate::context::{Escape, EscapeOrigin, ScopeChecker};
use crate::policy::AnalysisFlags;
use exflow_binder::ConstValue;
use exflow_common::{Span, diagnostic_messages};
use exflow_parser::parser::node::{ForData, IfData, LoopData, SwitchData};
use exflow_parser::{NodeIndex, NodeKind};
use tracing::trace;

impl<'a> ScopeChecker<'a> {
    /// Analyse the body of the scope this checker was created for.
    pub(crate) fn analyze_scope(&mut self) -> FlowResult {
        let model = self.model();
        let arena = model.arena();
        let mut result = FlowResult::reachable();
        if let Some(NodeKind::Constructor(data)) = arena.kind(self.scope)
            && data.initializer.is_some()
        {
            result = self.expression_flow(data.initializer);
        }
        let body = arena.function_body(self.scope);
        if body.is_none() {
            return result;
        }
        let flow = if matches!(arena.kind(body), Some(NodeKind::Block(_))) {
            self.statement_flow(body)
        } else {
            if matches!(arena.kind(self.scope), Some(NodeKind::Method(_) | NodeKind::Property(_))) {
                self.check_pipeline_boundary(body);
            }
            self.expression_flow(body)
        };
        result.end_reachable = flow.end_reachable;
        result.absorb(flow);
        trace!(
            scope = self.scope.0,
            escapes = result.escapes.len(),
            "analysed scope"
        );
        result
    }

    /// Dead-code tracking applies.
    fn control_flow(&self) -> bool {
        self.ctx.flag(AnalysisFlags::CONTROL_FLOW)
    }

    /// Compile-time boolean value of a condition, when folding applies.
    fn constant_condition(&self, condition: NodeIndex) -> Option<bool> {
        if !self.control_flow() {
            return None;
        }
        match self.model().constant_value(condition)? {
            ConstValue::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn statement_flow(&mut self, stmt: NodeIndex) -> FlowResult {
        let arena = self.model().arena();
        let Some(kind) = arena.kind(stmt) else {
            return FlowResult::reachable();
        };
        let mut result = match kind {
            NodeKind::Block(block) => self.block_flow(&block.statements),
            NodeKind::LocalDeclaration(decl) => {
                let mut result = FlowResult::reachable();
                for &declarator in &decl.declarators {
                    if let Some(NodeKind::VariableDeclarator(d)) = arena.kind(declarator)
                        && d.initializer.is_some()
                    {
                        let flow = self.expression_flow(d.initializer);
                        result.end_reachable &= flow.end_reachable;
                        result.absorb(flow);
                    }
                }
                result
            }
            NodeKind::LocalFunction(_) | NodeKind::Empty => FlowResult::reachable(),
            NodeKind::ExpressionStatement(expr) => self.expression_flow(*expr),
            NodeKind::If(data) => self.if_flow(data),
            NodeKind::While(data) => self.while_flow(data),
            NodeKind::Do(data) => self.do_flow(data),
            NodeKind::For(data) => self.for_flow(data),
            NodeKind::ForEach(data) => {
                let mut result = self.expression_flow(data.expression);
                let enumerated: Vec<Escape> = self
                    .materialization_escapes(data.expression)
                    .into_iter()
                    .map(|exception| Escape {
                        site: data.expression,
                        exception,
                        origin: EscapeOrigin::Pipeline,
                    })
                    .collect();
                self.check_sites(&enumerated, &mut result.escapes);
                let body = self.statement_flow(data.body);
                result.absorb(body);
                result.contains_break = false;
                result.contains_continue = false;
                result
            }
            NodeKind::Switch(data) => self.switch_flow(data),
            NodeKind::Try(data) => self.try_flow(data),
            NodeKind::Throw(operand) if operand.is_none() => self.rethrow_flow(stmt),
            NodeKind::Throw(operand) => {
                let mut escapes = self.collect_escapes(*operand);
                if let Some(exception) = self.thrown_type(*operand) {
                    escapes.push(Escape {
                        site: stmt,
                        exception,
                        origin: EscapeOrigin::Throw,
                    });
                }
                let mut result = FlowResult::unreachable();
                self.check_sites(&escapes, &mut result.escapes);
                result
            }
            NodeKind::Return(expr) => {
                let mut result = if expr.is_some() {
                    self.check_pipeline_boundary(*expr);
                    self.expression_flow(*expr)
                } else {
                    FlowResult::reachable()
                };
                result.end_reachable = false;
                result.contains_return = true;
                result
            }
            NodeKind::Break => FlowResult {
                contains_break: true,
                ..FlowResult::unreachable()
            },
            NodeKind::Continue => FlowResult {
                contains_continue: true,
                ..FlowResult::unreachable()
            },
            NodeKind::Using(data) => {
                let mut result = match arena.kind(data.resource) {
                    Some(NodeKind::LocalDeclaration(_)) => self.statement_flow(data.resource),
                    Some(_) => self.expression_flow(data.resource),
                    None => FlowResult::reachable(),
                };
                let body = self.statement_flow(data.body);
                result.end_reachable = body.end_reachable;
                result.absorb(body);
                result
            }
            NodeKind::Lock(data) => {
                let mut result = self.expression_flow(data.expression);
                let body = self.statement_flow(data.body);
                result.end_reachable = body.end_reachable;
                result.absorb(body);
                result
            }
            NodeKind::CheckedStatement(data) => self.statement_flow(data.inner),
            _ => {
                trace!(kind = kind.name(), "unmodelled statement");
                let mut result = FlowResult::reachable();
                let escapes = self.collect_escapes(stmt);
                self.check_sites(&escapes, &mut result.escapes);
                result
            }
        };
        if !self.control_flow() {
            result.end_reachable = true;
        }
        result
    }

    /// Escapes of one expression evaluated for its effect.
    pub(crate) fn expression_flow(&mut self, expr: NodeIndex) -> FlowResult {
        let escapes = self.collect_escapes(expr);
        let mut result = FlowResult::reachable();
        self.check_sites(&escapes, &mut result.escapes);
        if self.control_flow() && self.always_throws(expr) {
            result.end_reachable = false;
        }
        result
    }

    // =========================================================================
    // Blocks and dead regions
    // =========================================================================

    pub(crate) fn block_flow(&mut self, statements: &[NodeIndex]) -> FlowResult {
        let arena = self.model().arena();
        let mut result = FlowResult::reachable();
        let mut dead: Option<(NodeIndex, Span)> = None;
        for &stmt in statements {
            if result.end_reachable {
                let flow = self.statement_flow(stmt);
                result.end_reachable = flow.end_reachable;
                result.absorb(flow);
                continue;
            }
            // Local functions stay callable and split a dead region.
            if matches!(arena.kind(stmt), Some(NodeKind::LocalFunction(_))) {
                self.flush_dead_region(dead.take());
                continue;
            }
            let span = arena.span(stmt);
            dead = Some(match dead {
                Some((anchor, region)) => (anchor, region.merge(span)),
                None => (stmt, span),
            });
            self.dead_statement(stmt);
        }
        self.flush_dead_region(dead);
        result
    }

    /// Walk a statement that can never execute, for nested diagnostics only.
    fn dead_statement(&mut self, stmt: NodeIndex) {
        self.dead_depth += 1;
        self.statement_flow(stmt);
        self.dead_depth -= 1;
    }

    fn flush_dead_region(&mut self, region: Option<(NodeIndex, Span)>) {
        if let Some((anchor, span)) = region {
            self.report_dead(anchor, span);
        }
    }

    /// Report one dead region; nested inside another it is secondary.
    pub(crate) fn report_dead(&mut self, anchor: NodeIndex, span: Span) {
        let message = if self.dead_depth > 0 {
            &diagnostic_messages::UNREACHABLE_CODE_SECONDARY
        } else {
            &diagnostic_messages::UNREACHABLE_CODE
        };
        self.report_span(anchor, span, message, &[]);
    }

    /// A whole statement is dead: report it and walk it as dead code.
    pub(crate) fn dead_branch(&mut self, stmt: NodeIndex) {
        if stmt.is_none() {
            return;
        }
        let span = self.model().arena().span(stmt);
        self.report_dead(stmt, span);
        self.dead_statement(stmt);
    }

    // =========================================================================
    // Branches and loops
    // =========================================================================

    fn if_flow(&mut self, data: &IfData) -> FlowResult {
        let mut result = self.expression_flow(data.condition);
        if !result.end_reachable {
            return result;
        }
        let (then_flow, else_flow) = match self.constant_condition(data.condition) {
            Some(true) => {
                let then_flow = self.statement_flow(data.then_statement);
                self.dead_branch(data.else_statement);
                (then_flow, FlowResult::unreachable())
            }
            Some(false) => {
                self.dead_branch(data.then_statement);
                let else_flow = if data.else_statement.is_some() {
                    self.statement_flow(data.else_statement)
                } else {
                    FlowResult::reachable()
                };
                (FlowResult::unreachable(), else_flow)
            }
            None => {
                let then_flow = self.statement_flow(data.then_statement);
                let else_flow = if data.else_statement.is_some() {
                    self.statement_flow(data.else_statement)
                } else {
                    FlowResult::reachable()
                };
                (then_flow, else_flow)
            }
        };
        let branches = then_flow.join(else_flow);
        result.end_reachable = branches.end_reachable;
        result.absorb(branches);
        result
    }

    /// Reachability after a loop whose body produced `body`.
    fn after_loop(&self, mut result: FlowResult, body: FlowResult, infinite: bool) -> FlowResult {
        result.end_reachable = !infinite || body.contains_break;
        result.contains_return |= body.contains_return;
        result.escapes.extend(body.escapes);
        result
    }

    fn while_flow(&mut self, data: &LoopData) -> FlowResult {
        let result = self.expression_flow(data.condition);
        match self.constant_condition(data.condition) {
            Some(false) => {
                self.dead_branch(data.body);
                result
            }
            constant => {
                let body = self.statement_flow(data.body);
                self.after_loop(result, body, constant == Some(true))
            }
        }
    }

    fn do_flow(&mut self, data: &LoopData) -> FlowResult {
        let body = self.statement_flow(data.body);
        let condition_reached = body.end_reachable || body.contains_continue;
        let mut result = if condition_reached {
            self.expression_flow(data.condition)
        } else {
            FlowResult::reachable()
        };
        let loops_forever = self.constant_condition(data.condition) == Some(true);
        result.end_reachable = (condition_reached && !loops_forever) || body.contains_break;
        result.contains_return |= body.contains_return;
        result.escapes.extend(body.escapes);
        result
    }

    fn for_flow(&mut self, data: &ForData) -> FlowResult {
        let arena = self.model().arena();
        let mut result = FlowResult::reachable();
        for &initializer in &data.initializers {
            let flow = match arena.kind(initializer) {
                Some(NodeKind::LocalDeclaration(_)) => self.statement_flow(initializer),
                _ => self.expression_flow(initializer),
            };
            result.absorb(flow);
        }
        let infinite = if data.condition.is_some() {
            result.absorb(self.expression_flow(data.condition));
            match self.constant_condition(data.condition) {
                Some(false) => {
                    self.dead_branch(data.body);
                    return result;
                }
                constant => constant == Some(true),
            }
        } else {
            self.control_flow()
        };
        let body = self.statement_flow(data.body);
        for &incrementor in &data.incrementors {
            let flow = self.expression_flow(incrementor);
            result.absorb(flow);
        }
        self.after_loop(result, body, infinite)
    }

    fn switch_flow(&mut self, data: &SwitchData) -> FlowResult {
        let arena = self.model().arena();
        let mut result = self.expression_flow(data.expression);
        let mut has_default = false;
        let mut any_exit = false;
        for &section in &data.sections {
            let Some(NodeKind::SwitchSection(section)) = arena.kind(section) else {
                continue;
            };
            has_default |= section.is_default;
            let flow = self.block_flow(&section.statements);
            any_exit |= flow.end_reachable || flow.contains_break;
            result.contains_return |= flow.contains_return;
            result.contains_continue |= flow.contains_continue;
            result.escapes.extend(flow.escapes);
        }
        result.end_reachable = result.end_reachable && (any_exit || !has_default);
        result
    }

    // =========================================================================
    // Rethrow
    // =========================================================================

    /// `throw;` re-escapes the type of the innermost catch clause, or what a
    /// catch-all clause absorbed.
    fn rethrow_flow(&mut self, stmt: NodeIndex) -> FlowResult {
        let rethrown: Vec<Escape> = match self.catch_frames.last() {
            Some(frame) => match frame.declared {
                Some(declared) => vec![Escape {
                    site: stmt,
                    exception: declared,
                    origin: EscapeOrigin::Rethrow,
                }],
                None => frame
                    .absorbed
                    .iter()
                    .map(|&exception| Escape {
                        site: stmt,
                        exception,
                        origin: EscapeOrigin::Rethrow,
                    })
                    .collect(),
            },
            None => Vec::new(),
        };
        let mut result = FlowResult::unreachable();
        result.caught_type = self.catch_frames.last().and_then(|f| f.declared);
        self.check_sites(&rethrown, &mut result.escapes);
        result
    }
}
