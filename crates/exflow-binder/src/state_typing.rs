//! Expression typing, local symbol lookup, constant folding and local
//! alias tracking.

use crate::members::MemberKind;
use crate::state::BinderState;
use crate::state_resolution::{Mode, Receiver};
use crate::types::Ty;
use crate::well_known::{NumericKind, WellKnownType};
use exflow_parser::parser::node::{BinaryOp, LiteralKind, Modifiers, NodeKind, UnaryOp};
use exflow_parser::{NodeIndex, TypeSyntax};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocalKind {
    Variable,
    Constant,
    Parameter,
    ForEachVariable,
    CatchVariable,
    PatternVariable,
    LocalFunction,
    /// The implicit `value` parameter of a setter.
    SetterValue,
}

/// A name bound inside a function body.
#[derive(Clone, Debug)]
pub struct LocalSymbol {
    pub kind: LocalKind,
    pub name: String,
    /// Declarator, parameter, foreach, catch, `is` pattern, local function
    /// or accessor node.
    pub decl: NodeIndex,
    /// `None` for `var` and implicitly typed lambda parameters.
    pub declared_type: Option<TypeSyntax>,
    pub initializer: NodeIndex,
}

/// A compile-time constant value.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i128),
    Real(f64),
    Str(String),
    Null,
}

/// Parse an integer literal (`1_000`, `0xFF`, `10UL`).
pub fn parse_integer_literal(text: &str) -> Option<i128> {
    let digits: String = text
        .trim_end_matches(['u', 'U', 'l', 'L'])
        .chars()
        .filter(|&c| c != '_')
        .collect();
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        return i128::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        return i128::from_str_radix(bin, 2).ok();
    }
    digits.parse().ok()
}

fn parse_real_literal(text: &str) -> Option<f64> {
    let digits: String = text
        .trim_end_matches(['m', 'M', 'f', 'F', 'd', 'D'])
        .chars()
        .filter(|&c| c != '_')
        .collect();
    digits.parse().ok()
}

impl BinderState {
    // =========================================================================
    // Locals
    // =========================================================================

    fn local_from_declarator(&self, declarator: NodeIndex, name: &str) -> Option<LocalSymbol> {
        let Some(NodeKind::VariableDeclarator(d)) = self.arena.kind(declarator) else {
            return None;
        };
        if d.name != name {
            return None;
        }
        let Some(NodeKind::LocalDeclaration(decl)) = self.arena.kind(self.arena.parent(declarator))
        else {
            return None;
        };
        Some(LocalSymbol {
            kind: if decl.is_const {
                LocalKind::Constant
            } else {
                LocalKind::Variable
            },
            name: name.to_string(),
            decl: declarator,
            declared_type: (!decl.ty.is_var()).then(|| decl.ty.clone()),
            initializer: d.initializer,
        })
    }

    fn local_from_declaration(&self, declaration: NodeIndex, name: &str) -> Option<LocalSymbol> {
        let Some(NodeKind::LocalDeclaration(d)) = self.arena.kind(declaration) else {
            return None;
        };
        d.declarators
            .iter()
            .find_map(|&declarator| self.local_from_declarator(declarator, name))
    }

    fn local_from_params(&self, params: &[NodeIndex], name: &str) -> Option<LocalSymbol> {
        params.iter().find_map(|&param| match self.arena.kind(param) {
            Some(NodeKind::Parameter(p)) if p.name == name => Some(LocalSymbol {
                kind: LocalKind::Parameter,
                name: name.to_string(),
                decl: param,
                declared_type: p.ty.clone(),
                initializer: NodeIndex::NONE,
            }),
            _ => None,
        })
    }

    /// `is T name` designation inside `root` that starts before `before`.
    /// Nested function bodies are not searched.
    fn find_pattern_variable(&self, root: NodeIndex, name: &str, before: u32) -> Option<LocalSymbol> {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let Some(kind) = self.arena.kind(node) else {
                continue;
            };
            if node != root && kind.is_function_like() {
                continue;
            }
            if let NodeKind::Is(d) = kind
                && d.designation.as_deref() == Some(name)
                && self.arena.span(node).start < before
            {
                return Some(LocalSymbol {
                    kind: LocalKind::PatternVariable,
                    name: name.to_string(),
                    decl: node,
                    declared_type: d.ty.clone(),
                    initializer: NodeIndex::NONE,
                });
            }
            stack.extend(kind.children());
        }
        None
    }

    fn find_in_statements(&self, statements: &[NodeIndex], name: &str, use_start: u32) -> Option<LocalSymbol> {
        let mut found = None;
        for &statement in statements {
            if let Some(NodeKind::LocalFunction(d)) = self.arena.kind(statement)
                && d.name == name
            {
                // local functions are in scope throughout their block
                return Some(LocalSymbol {
                    kind: LocalKind::LocalFunction,
                    name: name.to_string(),
                    decl: statement,
                    declared_type: None,
                    initializer: NodeIndex::NONE,
                });
            }
            if self.arena.span(statement).start > use_start {
                continue;
            }
            if let Some(local) = self.local_from_declaration(statement, name) {
                found = Some(local);
            } else if let Some(local) = self.find_pattern_variable(statement, name, use_start) {
                found = Some(local);
            }
        }
        found
    }

    /// Resolve `name` as a local, parameter or local function visible at `at`.
    pub fn lookup_local(&self, name: &str, at: NodeIndex) -> Option<LocalSymbol> {
        let use_start = self.arena.span(at).start;
        let mut child = at;
        for ancestor in self.arena.ancestors(at) {
            let found = match self.arena.kind(ancestor)? {
                NodeKind::Block(d) => self.find_in_statements(&d.statements, name, use_start),
                NodeKind::SwitchSection(d) => {
                    self.find_in_statements(&d.statements, name, use_start)
                }
                NodeKind::For(d) => d
                    .initializers
                    .iter()
                    .find_map(|&init| self.local_from_declaration(init, name)),
                NodeKind::Using(d) if d.resource != child => {
                    self.local_from_declaration(d.resource, name)
                }
                NodeKind::ForEach(d) if d.name == name && d.expression != child => {
                    Some(LocalSymbol {
                        kind: LocalKind::ForEachVariable,
                        name: name.to_string(),
                        decl: ancestor,
                        declared_type: (!d.ty.is_var()).then(|| d.ty.clone()),
                        initializer: NodeIndex::NONE,
                    })
                }
                NodeKind::Catch(d) if d.name.as_deref() == Some(name) => Some(LocalSymbol {
                    kind: LocalKind::CatchVariable,
                    name: name.to_string(),
                    decl: ancestor,
                    declared_type: d.ty.clone(),
                    initializer: NodeIndex::NONE,
                }),
                NodeKind::If(d) if d.condition != child => {
                    self.find_pattern_variable(d.condition, name, use_start)
                }
                NodeKind::Method(d) | NodeKind::Constructor(d) | NodeKind::LocalFunction(d) => {
                    self.local_from_params(&d.params, name)
                }
                NodeKind::Lambda(d) => self.local_from_params(&d.params, name),
                NodeKind::Property(d) => self.local_from_params(&d.params, name),
                NodeKind::Accessor(d) if d.kind.is_setter_like() && name == "value" => {
                    Some(LocalSymbol {
                        kind: LocalKind::SetterValue,
                        name: name.to_string(),
                        decl: ancestor,
                        declared_type: None,
                        initializer: NodeIndex::NONE,
                    })
                }
                NodeKind::TypeDecl(_) => return None,
                _ => None,
            };
            if found.is_some() {
                return found;
            }
            child = ancestor;
        }
        None
    }

    fn type_of_local(&self, local: &LocalSymbol, mode: Mode) -> Ty {
        if let Some(syntax) = &local.declared_type {
            return self.resolve_type_syntax(syntax, local.decl);
        }
        let Some(deeper) = mode.deeper() else {
            return Ty::Unknown;
        };
        match local.kind {
            LocalKind::Variable | LocalKind::Constant => {
                self.type_of_mode(local.initializer, deeper)
            }
            LocalKind::ForEachVariable => match self.arena.kind(local.decl) {
                Some(NodeKind::ForEach(d)) => {
                    let sequence = self.type_of_mode(d.expression, deeper);
                    self.element_type(&sequence)
                }
                _ => Ty::Unknown,
            },
            LocalKind::CatchVariable => self.well_known_ty(WellKnownType::Exception),
            LocalKind::Parameter => self.infer_lambda_parameter(local.decl, deeper),
            LocalKind::SetterValue => match self.arena.kind(self.arena.parent(local.decl)) {
                Some(NodeKind::Property(p)) => {
                    self.resolve_type_syntax(&p.ty, self.arena.parent(local.decl))
                }
                _ => Ty::Unknown,
            },
            LocalKind::PatternVariable | LocalKind::LocalFunction => Ty::Unknown,
        }
    }

    /// Type of an implicitly typed lambda parameter, from the delegate type
    /// the lambda converts to.
    fn infer_lambda_parameter(&self, param: NodeIndex, mode: Mode) -> Ty {
        let lambda = self.arena.parent(param);
        let Some(NodeKind::Lambda(data)) = self.arena.kind(lambda) else {
            return Ty::Unknown;
        };
        let Some(position) = data.params.iter().position(|&p| p == param) else {
            return Ty::Unknown;
        };
        let mut value = lambda;
        let mut site = self.arena.parent(lambda);
        while let Some(NodeKind::Parenthesized(_)) = self.arena.kind(site) {
            value = site;
            site = self.arena.parent(site);
        }
        let delegate = match self.arena.kind(site) {
            Some(NodeKind::Invocation(call)) => {
                let Some(index) = call.arguments.iter().position(|&a| a == value) else {
                    return Ty::Unknown;
                };
                let Some(resolved) = self.resolve_call_mode(site, mode.without_lambdas()) else {
                    return Ty::Unknown;
                };
                let Some(param_info) = resolved
                    .arg_params
                    .get(index)
                    .copied()
                    .flatten()
                    .and_then(|p| self.members.get(resolved.member)?.params.get(p))
                else {
                    return Ty::Unknown;
                };
                param_info.ty.substitute(&resolved.substitution)
            }
            Some(NodeKind::VariableDeclarator(_)) => match self.arena.kind(self.arena.parent(site)) {
                Some(NodeKind::LocalDeclaration(d)) if !d.ty.is_var() => {
                    self.resolve_type_syntax(&d.ty, site)
                }
                _ => Ty::Unknown,
            },
            Some(NodeKind::Assignment(a)) if a.value == value => self.type_of_mode(a.target, mode),
            Some(NodeKind::Cast(c)) => self.resolve_type_syntax(&c.ty, site),
            _ => Ty::Unknown,
        };
        if self.delegate_shape(&delegate).is_none() {
            return Ty::Unknown;
        }
        delegate.args().get(position).cloned().unwrap_or(Ty::Unknown)
    }

    /// Element type of a sequence (`T` for arrays and `IEnumerable<T>`).
    pub fn element_type(&self, sequence: &Ty) -> Ty {
        if let Ty::Array(elem) = sequence {
            return (**elem).clone();
        }
        let Some(enumerable) = self.well_known_type(WellKnownType::IEnumerable) else {
            return Ty::Unknown;
        };
        self.supertypes(sequence)
            .into_iter()
            .find(|s| s.def() == Some(enumerable))
            .and_then(|s| s.args().first().cloned())
            .unwrap_or(Ty::Unknown)
    }

    // =========================================================================
    // Expression types
    // =========================================================================

    /// Static type of an expression; `Unknown` when it cannot be determined.
    pub fn type_of(&self, expr: NodeIndex) -> Ty {
        self.type_of_mode(expr, Mode::FULL)
    }

    pub(crate) fn type_of_mode(&self, expr: NodeIndex, mode: Mode) -> Ty {
        if expr.is_none() {
            return Ty::Unknown;
        }
        if mode.infer_lambdas
            && let Some(cached) = self.type_cache.get(&expr)
        {
            return cached.clone();
        }
        let ty = self.compute_type(expr, mode);
        if mode.infer_lambdas {
            self.type_cache.insert(expr, ty.clone());
        }
        ty
    }

    fn named(&self, full_name: &str) -> Ty {
        self.types.lookup_full(full_name, 0).map_or(Ty::Unknown, Ty::named)
    }

    fn compute_type(&self, expr: NodeIndex, mode: Mode) -> Ty {
        let Some(deeper) = mode.deeper() else {
            return Ty::Unknown;
        };
        let Some(kind) = self.arena.kind(expr) else {
            return Ty::Unknown;
        };
        match kind {
            NodeKind::Literal(lit) => self.literal_type(lit.kind, &lit.text),
            NodeKind::InterpolatedString(_) => self.named("System.String"),
            NodeKind::Identifier(id) => {
                if let Some(local) = self.lookup_local(&id.name, expr) {
                    return self.type_of_local(&local, mode);
                }
                self.lookup_in_enclosing_types(&id.name, expr, |m| {
                    matches!(
                        m.kind,
                        MemberKind::Field | MemberKind::Property | MemberKind::Event
                    )
                })
                .first()
                .and_then(|(id, subst)| Some(self.members.get(*id)?.ty.substitute(subst)))
                .unwrap_or(Ty::Unknown)
            }
            NodeKind::This => self
                .enclosing_types(expr)
                .first()
                .map_or(Ty::Unknown, |&t| self.self_type(t)),
            NodeKind::Base => match self.receiver_of(expr, deeper) {
                Receiver::Base(ty) => ty,
                _ => Ty::Unknown,
            },
            NodeKind::Parenthesized(inner) => self.type_of_mode(*inner, deeper),
            NodeKind::CheckedExpression(d) => self.type_of_mode(d.inner, deeper),
            NodeKind::MemberAccess(access) => {
                let value_member = |m: &crate::members::MemberInfo| {
                    matches!(
                        m.kind,
                        MemberKind::Field | MemberKind::Property | MemberKind::Event
                    )
                };
                let found = match self.receiver_of(access.expression, deeper) {
                    Receiver::Type(def) => self.lookup_members(&Ty::named(def), &access.name, |m| {
                        value_member(m) && m.is_static
                    }),
                    Receiver::Base(ty) | Receiver::Value(ty) => {
                        self.lookup_members(&ty, &access.name, value_member)
                    }
                };
                found
                    .first()
                    .and_then(|(id, subst)| Some(self.members.get(*id)?.ty.substitute(subst)))
                    .unwrap_or(Ty::Unknown)
            }
            NodeKind::ElementAccess(access) => {
                if access.expression.is_some() {
                    let receiver = self.type_of_mode(access.expression, deeper);
                    if let Ty::Array(elem) = receiver {
                        return *elem;
                    }
                }
                self.resolve_property(expr)
                    .and_then(|call| {
                        Some(self.members.get(call.member)?.ty.substitute(&call.substitution))
                    })
                    .unwrap_or(Ty::Unknown)
            }
            NodeKind::Invocation(_) => {
                let call = if mode.infer_lambdas {
                    self.resolve_call(expr)
                } else {
                    self.resolve_call_mode(expr, deeper)
                };
                let Some(call) = call else {
                    return Ty::Unknown;
                };
                let Some(member) = self.members.get(call.member) else {
                    return Ty::Unknown;
                };
                match member.kind {
                    MemberKind::Constructor => Ty::Unknown,
                    MemberKind::Lambda => self.lambda_return_type(member.decl, deeper),
                    _ => member.ty.substitute(&call.substitution),
                }
            }
            NodeKind::ObjectCreation(d) => match &d.ty {
                Some(syntax) => self.resolve_type_syntax(syntax, expr),
                None => self.target_type(expr, deeper),
            },
            NodeKind::ArrayCreation(d) => {
                let elem = match &d.element_type {
                    Some(syntax) => self.resolve_type_syntax(syntax, expr),
                    None => d
                        .initializer
                        .first()
                        .map_or(Ty::Unknown, |&first| self.type_of_mode(first, deeper)),
                };
                Ty::Array(Box::new(elem))
            }
            NodeKind::Cast(d) => self.resolve_type_syntax(&d.ty, expr),
            NodeKind::As(d) => d
                .ty
                .as_ref()
                .map_or(Ty::Unknown, |t| self.resolve_type_syntax(t, expr)),
            NodeKind::Is(_) => self.named("System.Boolean"),
            NodeKind::Binary(b) => self.binary_type(b.op, b.left, b.right, deeper),
            NodeKind::Unary(u) => {
                let operand = self.type_of_mode(u.operand, deeper);
                match u.op {
                    UnaryOp::Not => self.named("System.Boolean"),
                    UnaryOp::Negate | UnaryOp::Plus | UnaryOp::BitwiseNot => {
                        match self.numeric_kind(&operand) {
                            Some(
                                NumericKind::SByte
                                | NumericKind::Byte
                                | NumericKind::Int16
                                | NumericKind::UInt16
                                | NumericKind::Char,
                            ) => self.named("System.Int32"),
                            _ => operand,
                        }
                    }
                    _ => operand,
                }
            }
            NodeKind::Assignment(a) => self.type_of_mode(a.target, deeper),
            NodeKind::Conditional(c) => {
                let when_true = self.type_of_mode(c.when_true, deeper);
                if matches!(when_true, Ty::Unknown | Ty::Null) {
                    self.type_of_mode(c.when_false, deeper)
                } else {
                    when_true
                }
            }
            NodeKind::TypeOf(_) => self.named("System.Type"),
            NodeKind::Default(Some(syntax)) => self.resolve_type_syntax(syntax, expr),
            _ => Ty::Unknown,
        }
    }

    fn literal_type(&self, kind: LiteralKind, text: &str) -> Ty {
        match kind {
            LiteralKind::Integer => {
                let lower = text.to_ascii_lowercase();
                let name = if lower.ends_with("ul") || lower.ends_with("lu") {
                    "System.UInt64"
                } else if lower.ends_with('l') {
                    "System.Int64"
                } else if lower.ends_with('u') {
                    "System.UInt32"
                } else if parse_integer_literal(text).is_some_and(|v| v > i32::MAX as i128) {
                    "System.Int64"
                } else {
                    "System.Int32"
                };
                self.named(name)
            }
            LiteralKind::Real => {
                let name = match text.chars().last() {
                    Some('m' | 'M') => "System.Decimal",
                    Some('f' | 'F') => "System.Single",
                    _ => "System.Double",
                };
                self.named(name)
            }
            LiteralKind::String => self.named("System.String"),
            LiteralKind::Char => self.named("System.Char"),
            LiteralKind::True | LiteralKind::False => self.named("System.Boolean"),
            LiteralKind::Null => Ty::Null,
        }
    }

    fn binary_type(&self, op: BinaryOp, left: NodeIndex, right: NodeIndex, mode: Mode) -> Ty {
        match op {
            BinaryOp::LessThan
            | BinaryOp::GreaterThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThanOrEqual
            | BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::LogicalAnd
            | BinaryOp::LogicalOr => self.named("System.Boolean"),
            BinaryOp::Coalesce => {
                let left_ty = self.type_of_mode(left, mode);
                match &left_ty {
                    Ty::Named(def, args)
                        if Some(*def) == self.well_known_type(WellKnownType::Nullable) =>
                    {
                        args.first().cloned().unwrap_or(Ty::Unknown)
                    }
                    Ty::Unknown | Ty::Null => self.type_of_mode(right, mode),
                    _ => left_ty,
                }
            }
            _ => {
                let left_ty = self.type_of_mode(left, mode);
                let right_ty = self.type_of_mode(right, mode);
                let string = self.named("System.String");
                if op == BinaryOp::Add && (left_ty == string || right_ty == string) {
                    return string;
                }
                match (self.numeric_kind(&left_ty), self.numeric_kind(&right_ty)) {
                    (Some(l), Some(r)) => self.named(Self::promote(l, r)),
                    _ => left_ty,
                }
            }
        }
    }

    /// Binary numeric promotion.
    fn promote(left: NumericKind, right: NumericKind) -> &'static str {
        let either = |k: NumericKind| left == k || right == k;
        if either(NumericKind::Decimal) {
            "System.Decimal"
        } else if either(NumericKind::Double) {
            "System.Double"
        } else if either(NumericKind::Single) {
            "System.Single"
        } else if either(NumericKind::UInt64) && !either(NumericKind::Int64) {
            "System.UInt64"
        } else if either(NumericKind::Int64) || either(NumericKind::UInt64) {
            "System.Int64"
        } else if either(NumericKind::UInt32) {
            let signed = |k: NumericKind| matches!(k, NumericKind::SByte | NumericKind::Int16 | NumericKind::Int32);
            if signed(left) || signed(right) {
                "System.Int64"
            } else {
                "System.UInt32"
            }
        } else {
            "System.Int32"
        }
    }

    /// Type a target-typed `new()` converts to.
    fn target_type(&self, expr: NodeIndex, mode: Mode) -> Ty {
        let parent = self.arena.parent(expr);
        match self.arena.kind(parent) {
            Some(NodeKind::VariableDeclarator(_)) => {
                match self.arena.kind(self.arena.parent(parent)) {
                    Some(NodeKind::LocalDeclaration(d)) if !d.ty.is_var() => {
                        self.resolve_type_syntax(&d.ty, parent)
                    }
                    Some(NodeKind::Field(d)) => self.resolve_type_syntax(&d.ty, parent),
                    _ => Ty::Unknown,
                }
            }
            Some(NodeKind::Assignment(a)) if a.value == expr => self.type_of_mode(a.target, mode),
            _ => Ty::Unknown,
        }
    }

    /// Type of the value a lambda produces.
    pub(crate) fn lambda_return_type(&self, lambda: NodeIndex, mode: Mode) -> Ty {
        let body = self.arena.function_body(lambda);
        if !matches!(self.arena.kind(body), Some(NodeKind::Block(_))) {
            return self.type_of_mode(body, mode);
        }
        let mut stack = vec![body];
        while let Some(node) = stack.pop() {
            let Some(kind) = self.arena.kind(node) else {
                continue;
            };
            if kind.is_function_like() {
                continue;
            }
            if let NodeKind::Return(value) = kind
                && value.is_some()
            {
                return self.type_of_mode(*value, mode);
            }
            let children = kind.children();
            stack.extend(children.into_iter().rev());
        }
        Ty::Unknown
    }

    /// The type a type-name string denotes, for keyword aliases too.
    pub fn type_named(&self, name: &str) -> Ty {
        self.resolve_type_name_text(name)
            .map_or(Ty::Unknown, Ty::named)
    }

    // =========================================================================
    // Constants
    // =========================================================================

    /// Compile-time value of an expression, if it has one.
    pub fn constant_value(&self, expr: NodeIndex) -> Option<ConstValue> {
        self.constant_value_depth(expr, 0)
    }

    fn constant_value_depth(&self, expr: NodeIndex, depth: u32) -> Option<ConstValue> {
        if depth > exflow_common::limits::MAX_EXPR_DEPTH {
            return None;
        }
        let next = depth + 1;
        match self.arena.kind(expr)? {
            NodeKind::Literal(lit) => match lit.kind {
                LiteralKind::Integer => parse_integer_literal(&lit.text).map(ConstValue::Int),
                LiteralKind::Real => parse_real_literal(&lit.text).map(ConstValue::Real),
                LiteralKind::String => Some(ConstValue::Str(
                    lit.text.trim_start_matches('@').trim_matches('"').to_string(),
                )),
                LiteralKind::Char => {
                    let inner = lit.text.trim_matches('\'');
                    let mut chars = inner.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(ConstValue::Int(c as i128)),
                        _ => None,
                    }
                }
                LiteralKind::True => Some(ConstValue::Bool(true)),
                LiteralKind::False => Some(ConstValue::Bool(false)),
                LiteralKind::Null => Some(ConstValue::Null),
            },
            NodeKind::Parenthesized(inner) => self.constant_value_depth(*inner, next),
            NodeKind::CheckedExpression(d) => self.constant_value_depth(d.inner, next),
            NodeKind::Cast(d) => self.constant_value_depth(d.expression, next),
            NodeKind::Unary(u) => {
                let value = self.constant_value_depth(u.operand, next)?;
                match (u.op, value) {
                    (UnaryOp::Not, ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
                    (UnaryOp::Negate, ConstValue::Int(i)) => i.checked_neg().map(ConstValue::Int),
                    (UnaryOp::Negate, ConstValue::Real(r)) => Some(ConstValue::Real(-r)),
                    (UnaryOp::Plus, v @ (ConstValue::Int(_) | ConstValue::Real(_))) => Some(v),
                    (UnaryOp::BitwiseNot, ConstValue::Int(i)) => Some(ConstValue::Int(!i)),
                    _ => None,
                }
            }
            NodeKind::Binary(b) => {
                let left = self.constant_value_depth(b.left, next)?;
                // short-circuit operators fold on the left operand alone
                match (b.op, &left) {
                    (BinaryOp::LogicalAnd, ConstValue::Bool(false)) => {
                        return Some(ConstValue::Bool(false));
                    }
                    (BinaryOp::LogicalOr, ConstValue::Bool(true)) => {
                        return Some(ConstValue::Bool(true));
                    }
                    _ => {}
                }
                let right = self.constant_value_depth(b.right, next)?;
                Self::fold_binary(b.op, left, right)
            }
            NodeKind::Conditional(c) => match self.constant_value_depth(c.condition, next)? {
                ConstValue::Bool(true) => self.constant_value_depth(c.when_true, next),
                ConstValue::Bool(false) => self.constant_value_depth(c.when_false, next),
                _ => None,
            },
            NodeKind::Identifier(id) => {
                if let Some(local) = self.lookup_local(&id.name, expr) {
                    return match local.kind {
                        LocalKind::Constant => self.constant_value_depth(local.initializer, next),
                        _ => None,
                    };
                }
                let (member, _) = self
                    .lookup_in_enclosing_types(&id.name, expr, |m| m.kind == MemberKind::Field)
                    .into_iter()
                    .next()?;
                self.constant_value_depth(self.const_field_initializer(member)?, next)
            }
            NodeKind::MemberAccess(access) => {
                let found = match self.receiver_of(access.expression, Mode::FULL) {
                    Receiver::Type(def) => self.lookup_members(&Ty::named(def), &access.name, |m| {
                        m.kind == MemberKind::Field
                    }),
                    _ => return None,
                };
                let (member, _) = found.into_iter().next()?;
                self.constant_value_depth(self.const_field_initializer(member)?, next)
            }
            _ => None,
        }
    }

    fn const_field_initializer(&self, member: crate::members::MemberId) -> Option<NodeIndex> {
        let info = self.members.get(member)?;
        let Some(NodeKind::Field(field)) = self.arena.kind(self.arena.parent(info.decl)) else {
            return None;
        };
        if !field.modifiers.contains(Modifiers::CONST) {
            return None;
        }
        match self.arena.kind(info.decl)? {
            NodeKind::VariableDeclarator(d) => d.initializer.some(),
            _ => None,
        }
    }

    fn fold_binary(op: BinaryOp, left: ConstValue, right: ConstValue) -> Option<ConstValue> {
        use ConstValue::{Bool, Int, Real};
        Some(match (op, left, right) {
            (BinaryOp::Add, Int(a), Int(b)) => Int(a.checked_add(b)?),
            (BinaryOp::Subtract, Int(a), Int(b)) => Int(a.checked_sub(b)?),
            (BinaryOp::Multiply, Int(a), Int(b)) => Int(a.checked_mul(b)?),
            (BinaryOp::Divide, Int(a), Int(b)) => Int(a.checked_div(b)?),
            (BinaryOp::Modulo, Int(a), Int(b)) => Int(a.checked_rem(b)?),
            (BinaryOp::BitwiseAnd, Int(a), Int(b)) => Int(a & b),
            (BinaryOp::BitwiseOr, Int(a), Int(b)) => Int(a | b),
            (BinaryOp::ExclusiveOr, Int(a), Int(b)) => Int(a ^ b),
            (BinaryOp::LeftShift, Int(a), Int(b)) => Int(a.checked_shl(u32::try_from(b).ok()?)?),
            (BinaryOp::RightShift, Int(a), Int(b)) => Int(a.checked_shr(u32::try_from(b).ok()?)?),
            (BinaryOp::Add, Real(a), Real(b)) => Real(a + b),
            (BinaryOp::Subtract, Real(a), Real(b)) => Real(a - b),
            (BinaryOp::Multiply, Real(a), Real(b)) => Real(a * b),
            (BinaryOp::LessThan, Int(a), Int(b)) => Bool(a < b),
            (BinaryOp::GreaterThan, Int(a), Int(b)) => Bool(a > b),
            (BinaryOp::LessThanOrEqual, Int(a), Int(b)) => Bool(a <= b),
            (BinaryOp::GreaterThanOrEqual, Int(a), Int(b)) => Bool(a >= b),
            (BinaryOp::LogicalAnd, Bool(a), Bool(b)) => Bool(a && b),
            (BinaryOp::LogicalOr, Bool(a), Bool(b)) => Bool(a || b),
            (BinaryOp::ExclusiveOr, Bool(a), Bool(b)) => Bool(a ^ b),
            (BinaryOp::Equal, a, b) => Bool(a == b),
            (BinaryOp::NotEqual, a, b) => Bool(a != b),
            _ => return None,
        })
    }

    // =========================================================================
    // Aliases
    // =========================================================================

    /// Initializer of the local an identifier refers to, when the local has
    /// exactly one initializer and is never assigned afterwards.
    pub fn alias_initializer(&self, ident: NodeIndex) -> Option<NodeIndex> {
        let name = self.arena.identifier_name(ident)?;
        let local = self.lookup_local(name, ident)?;
        if !matches!(local.kind, LocalKind::Variable | LocalKind::Constant) {
            return None;
        }
        let initializer = local.initializer.some()?;
        let scope = match self.arena.enclosing_function_like(local.decl).some() {
            Some(function) => function,
            None => self.arena.file_of(local.decl)?.root,
        };
        if self.is_reassigned(&local, scope) {
            return None;
        }
        Some(initializer)
    }

    fn is_reassigned(&self, local: &LocalSymbol, scope: NodeIndex) -> bool {
        let refers_to_local = |target: NodeIndex| {
            let target = self.arena.skip_parentheses(target);
            self.arena.identifier_name(target) == Some(local.name.as_str())
                && self
                    .lookup_local(&local.name, target)
                    .is_some_and(|l| l.decl == local.decl)
        };
        let mut stack = vec![scope];
        while let Some(node) = stack.pop() {
            let Some(kind) = self.arena.kind(node) else {
                continue;
            };
            match kind {
                NodeKind::Assignment(a) if refers_to_local(a.target) => return true,
                NodeKind::Unary(u) if u.op.is_increment_or_decrement() && refers_to_local(u.operand) => {
                    return true;
                }
                _ => {}
            }
            stack.extend(kind.children());
        }
        false
    }

    /// `#nullable enable` is in effect for the file containing `node`.
    pub fn nullable_enabled_at(&self, node: NodeIndex) -> bool {
        self.arena.file_of(node).is_some_and(|f| f.nullable_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals_parse_with_suffixes_and_radix() {
        assert_eq!(parse_integer_literal("1_000"), Some(1000));
        assert_eq!(parse_integer_literal("0xFF"), Some(255));
        assert_eq!(parse_integer_literal("0b101"), Some(5));
        assert_eq!(parse_integer_literal("10UL"), Some(10));
        assert_eq!(parse_integer_literal("abc"), None);
    }

    #[test]
    fn folding_respects_overflow() {
        assert_eq!(
            BinderState::fold_binary(BinaryOp::Add, ConstValue::Int(1), ConstValue::Int(2)),
            Some(ConstValue::Int(3))
        );
        assert_eq!(
            BinderState::fold_binary(BinaryOp::Divide, ConstValue::Int(1), ConstValue::Int(0)),
            None
        );
        assert_eq!(
            BinderState::fold_binary(BinaryOp::LessThan, ConstValue::Int(1), ConstValue::Int(2)),
            Some(ConstValue::Bool(true))
        );
    }
}
