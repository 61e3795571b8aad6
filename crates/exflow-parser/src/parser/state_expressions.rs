//! Parser state - expressions.
//!
//! Precedence, loosest first: assignment / lambda, `?:`, `??`, `||`, `&&`,
//! `|`, `^`, `&`, equality, relational and type testing, shift, additive,
//! multiplicative, unary (including casts), postfix / primary.

use super::base::{NodeIndex, NodeList};
use super::node::{
    ArrayCreationData, AssignmentData, AssignmentOp, BinaryData, BinaryOp, CastData, CheckedData,
    ConditionalData, ElementAccessData, IdentifierData, InvocationData, LambdaData, LiteralData,
    LiteralKind, MemberAccessData, NodeKind, ObjectCreationData, ParameterData, ParameterModifier,
    TypeTestData, UnaryData, UnaryOp,
};
use super::state::ParserState;
use super::state_types::TypeContext;
use crate::scanner::{ScannerState, SyntaxKind};
use exflow_common::Span;

impl ParserState<'_> {
    pub(crate) fn parse_expression(&mut self) -> NodeIndex {
        if !self.enter() {
            self.leave();
            self.skip_until(&[
                SyntaxKind::Semicolon,
                SyntaxKind::CloseParen,
                SyntaxKind::CloseBrace,
            ]);
            return self.missing_node();
        }
        let result = self.parse_assignment_expression();
        self.leave();
        result
    }

    /// Field/local initializer: an expression or a bare `{ ... }` array initializer.
    pub(crate) fn parse_variable_initializer(&mut self) -> NodeIndex {
        if self.at(SyntaxKind::OpenBrace) {
            return self.parse_initializer_list();
        }
        self.parse_expression()
    }

    fn parse_assignment_expression(&mut self) -> NodeIndex {
        if self.is_lambda_start() {
            return self.parse_lambda();
        }
        let start = self.token_start();
        let target = self.parse_conditional_expression();
        let op = match self.kind() {
            SyntaxKind::Equals => AssignmentOp::Assign,
            SyntaxKind::PlusEquals => AssignmentOp::Add,
            SyntaxKind::MinusEquals => AssignmentOp::Subtract,
            SyntaxKind::AsteriskEquals => AssignmentOp::Multiply,
            SyntaxKind::SlashEquals => AssignmentOp::Divide,
            SyntaxKind::PercentEquals => AssignmentOp::Modulo,
            SyntaxKind::AmpersandEquals => AssignmentOp::And,
            SyntaxKind::BarEquals => AssignmentOp::Or,
            SyntaxKind::CaretEquals => AssignmentOp::ExclusiveOr,
            SyntaxKind::QuestionQuestionEquals => AssignmentOp::Coalesce,
            _ => return target,
        };
        self.advance();
        let value = if self.at(SyntaxKind::OpenBrace) {
            self.parse_initializer_list()
        } else {
            self.parse_expression()
        };
        self.finish_node(
            NodeKind::Assignment(AssignmentData { op, target, value }),
            start,
        )
    }

    pub(crate) fn parse_conditional_expression(&mut self) -> NodeIndex {
        let start = self.token_start();
        let condition = self.parse_coalesce_expression();
        if !self.at(SyntaxKind::Question) {
            return condition;
        }
        self.advance();
        let when_true = self.parse_expression();
        self.expect(SyntaxKind::Colon);
        let when_false = self.parse_expression();
        self.finish_node(
            NodeKind::Conditional(ConditionalData {
                condition,
                when_true,
                when_false,
            }),
            start,
        )
    }

    fn parse_coalesce_expression(&mut self) -> NodeIndex {
        let start = self.token_start();
        let left = self.parse_binary_expression(0);
        if !self.eat(SyntaxKind::QuestionQuestion) {
            return left;
        }
        let right = if self.at(SyntaxKind::ThrowKeyword) {
            self.parse_unary_expression()
        } else {
            self.parse_coalesce_expression()
        };
        self.finish_node(
            NodeKind::Binary(BinaryData {
                op: BinaryOp::Coalesce,
                left,
                right,
            }),
            start,
        )
    }

    /// Binary operator at the current position with its precedence and width in tokens.
    fn current_binary_operator(&self) -> Option<(BinaryOp, u8, usize)> {
        let op = match self.kind() {
            SyntaxKind::BarBar => (BinaryOp::LogicalOr, 1, 1),
            SyntaxKind::AmpersandAmpersand => (BinaryOp::LogicalAnd, 2, 1),
            SyntaxKind::Bar => (BinaryOp::BitwiseOr, 3, 1),
            SyntaxKind::Caret => (BinaryOp::ExclusiveOr, 4, 1),
            SyntaxKind::Ampersand => (BinaryOp::BitwiseAnd, 5, 1),
            SyntaxKind::EqualsEquals => (BinaryOp::Equal, 6, 1),
            SyntaxKind::ExclamationEquals => (BinaryOp::NotEqual, 6, 1),
            SyntaxKind::LessThan => (BinaryOp::LessThan, 7, 1),
            SyntaxKind::LessThanEquals => (BinaryOp::LessThanOrEqual, 7, 1),
            SyntaxKind::GreaterThanEquals => (BinaryOp::GreaterThanOrEqual, 7, 1),
            SyntaxKind::GreaterThan => {
                let next = self.peek(1);
                if next.kind == SyntaxKind::GreaterThan && next.span.start == self.current().span.end
                {
                    (BinaryOp::RightShift, 8, 2)
                } else {
                    (BinaryOp::GreaterThan, 7, 1)
                }
            }
            SyntaxKind::LessThanLessThan => (BinaryOp::LeftShift, 8, 1),
            SyntaxKind::Plus => (BinaryOp::Add, 9, 1),
            SyntaxKind::Minus => (BinaryOp::Subtract, 9, 1),
            SyntaxKind::Asterisk => (BinaryOp::Multiply, 10, 1),
            SyntaxKind::Slash => (BinaryOp::Divide, 10, 1),
            SyntaxKind::Percent => (BinaryOp::Modulo, 10, 1),
            _ => return None,
        };
        Some(op)
    }

    const TYPE_TEST_PRECEDENCE: u8 = 7;

    fn parse_binary_expression(&mut self, min_precedence: u8) -> NodeIndex {
        let start = self.token_start();
        let mut left = self.parse_unary_expression();
        loop {
            if (self.at(SyntaxKind::IsKeyword) || self.at(SyntaxKind::AsKeyword))
                && Self::TYPE_TEST_PRECEDENCE > min_precedence
            {
                left = self.parse_type_test(left, start);
                continue;
            }
            let Some((op, precedence, width)) = self.current_binary_operator() else {
                break;
            };
            if precedence <= min_precedence {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            let right = self.parse_binary_expression(precedence);
            left = self.finish_node(NodeKind::Binary(BinaryData { op, left, right }), start);
        }
        left
    }

    /// `e is T`, `e is T name`, `e is null`, `e is not null`, `e as T`.
    fn parse_type_test(&mut self, expression: NodeIndex, start: u32) -> NodeIndex {
        let is_as = self.at(SyntaxKind::AsKeyword);
        self.advance();
        if is_as {
            let ty = self.try_parse_type(TypeContext::Expression);
            if ty.is_none() {
                self.error_at_current("type expected".to_string());
            }
            return self.finish_node(
                NodeKind::As(TypeTestData {
                    expression,
                    ty,
                    designation: None,
                    pattern: NodeIndex::NONE,
                }),
                start,
            );
        }

        self.eat_contextual("not");
        let mut data = TypeTestData {
            expression,
            ty: None,
            designation: None,
            pattern: NodeIndex::NONE,
        };
        let is_constant_pattern = matches!(
            self.kind(),
            SyntaxKind::NullKeyword
                | SyntaxKind::TrueKeyword
                | SyntaxKind::FalseKeyword
                | SyntaxKind::IntegerLiteral
                | SyntaxKind::RealLiteral
                | SyntaxKind::StringLiteral
                | SyntaxKind::CharLiteral
                | SyntaxKind::Minus
        );
        if is_constant_pattern {
            data.pattern = self.parse_unary_expression();
        } else if self.at(SyntaxKind::OpenBrace) {
            // property pattern `{ Length: > 0 }` carries no exceptions
            self.skip_balanced();
        } else {
            data.ty = self.try_parse_type(TypeContext::Expression);
            if data.ty.is_none() {
                self.error_at_current("type or pattern expected".to_string());
            }
            if self.at(SyntaxKind::OpenBrace) {
                self.skip_balanced();
            }
            if self.at(SyntaxKind::Identifier) && !self.at_contextual("when") {
                data.designation = Some(self.current().text.clone());
                self.advance();
            }
        }
        self.finish_node(NodeKind::Is(data), start)
    }

    pub(crate) fn parse_unary_expression(&mut self) -> NodeIndex {
        let start = self.token_start();
        let op = match self.kind() {
            SyntaxKind::Exclamation => Some(UnaryOp::Not),
            SyntaxKind::Minus => Some(UnaryOp::Negate),
            SyntaxKind::Plus => Some(UnaryOp::Plus),
            SyntaxKind::Tilde => Some(UnaryOp::BitwiseNot),
            SyntaxKind::PlusPlus => Some(UnaryOp::PreIncrement),
            SyntaxKind::MinusMinus => Some(UnaryOp::PreDecrement),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary_expression();
            return self.finish_node(NodeKind::Unary(UnaryData { op, operand }), start);
        }
        if self.at(SyntaxKind::ThrowKeyword) {
            self.advance();
            let operand = self.parse_expression();
            return self.finish_node(NodeKind::ThrowExpression(operand), start);
        }
        if self.at_contextual("await") && self.token_starts_expression(1) {
            // awaiting does not change which exceptions surface
            self.advance();
            return self.parse_unary_expression();
        }
        if self.at(SyntaxKind::OpenParen)
            && let Some(cast) = self.try_parse_cast(start)
        {
            return cast;
        }
        let primary = self.parse_primary_expression();
        self.parse_postfix_expression(primary, start)
    }

    /// `(T)expr` when the parenthesized tokens form a type and the next
    /// token can start an operand.
    fn try_parse_cast(&mut self, start: u32) -> Option<NodeIndex> {
        let snapshot = self.snapshot();
        self.advance();
        let ty = match self.try_parse_type(TypeContext::Expression) {
            Some(ty) if self.at(SyntaxKind::CloseParen) => ty,
            _ => {
                self.restore(snapshot);
                return None;
            }
        };
        let predefined = ty.type_args.is_empty()
            && crate::scanner::SyntaxKind::is_predefined_type_name(&ty.name);
        let follows_operand = matches!(
            self.peek_kind(1),
            SyntaxKind::Identifier
                | SyntaxKind::IntegerLiteral
                | SyntaxKind::RealLiteral
                | SyntaxKind::StringLiteral
                | SyntaxKind::CharLiteral
                | SyntaxKind::OpenParen
                | SyntaxKind::ThisKeyword
                | SyntaxKind::BaseKeyword
                | SyntaxKind::NewKeyword
                | SyntaxKind::TypeofKeyword
                | SyntaxKind::DefaultKeyword
                | SyntaxKind::CheckedKeyword
                | SyntaxKind::UncheckedKeyword
                | SyntaxKind::TrueKeyword
                | SyntaxKind::FalseKeyword
                | SyntaxKind::NullKeyword
                | SyntaxKind::Exclamation
                | SyntaxKind::Tilde
        );
        let signed_operand = predefined
            && matches!(self.peek_kind(1), SyntaxKind::Minus | SyntaxKind::Plus);
        if !(follows_operand || signed_operand) {
            self.restore(snapshot);
            return None;
        }
        self.advance();
        let expression = self.parse_unary_expression();
        Some(self.finish_node(NodeKind::Cast(CastData { ty, expression }), start))
    }

    fn token_starts_expression(&self, offset: usize) -> bool {
        matches!(
            self.peek_kind(offset),
            SyntaxKind::Identifier
                | SyntaxKind::IntegerLiteral
                | SyntaxKind::RealLiteral
                | SyntaxKind::StringLiteral
                | SyntaxKind::CharLiteral
                | SyntaxKind::OpenParen
                | SyntaxKind::ThisKeyword
                | SyntaxKind::BaseKeyword
                | SyntaxKind::NewKeyword
                | SyntaxKind::TypeofKeyword
        )
    }

    fn parse_postfix_expression(&mut self, mut expression: NodeIndex, start: u32) -> NodeIndex {
        loop {
            match self.kind() {
                SyntaxKind::Dot | SyntaxKind::QuestionDot => {
                    let conditional = self.at(SyntaxKind::QuestionDot);
                    self.advance();
                    let (name, name_span) = self.expect_identifier();
                    let type_args = self.try_parse_expression_type_arguments().unwrap_or_default();
                    expression = self.finish_node(
                        NodeKind::MemberAccess(MemberAccessData {
                            expression,
                            name,
                            name_span,
                            type_args,
                            conditional,
                        }),
                        start,
                    );
                }
                SyntaxKind::Question
                    if self.peek_kind(1) == SyntaxKind::OpenBracket
                        && self.is_conditional_element_access() =>
                {
                    self.advance();
                    let arguments = self.parse_bracketed_arguments();
                    expression = self.finish_node(
                        NodeKind::ElementAccess(ElementAccessData {
                            expression,
                            arguments,
                            conditional: true,
                        }),
                        start,
                    );
                }
                SyntaxKind::OpenParen => {
                    let arguments = self.parse_argument_list();
                    expression = self.finish_node(
                        NodeKind::Invocation(InvocationData {
                            expression,
                            arguments,
                        }),
                        start,
                    );
                }
                SyntaxKind::OpenBracket => {
                    let arguments = self.parse_bracketed_arguments();
                    expression = self.finish_node(
                        NodeKind::ElementAccess(ElementAccessData {
                            expression,
                            arguments,
                            conditional: false,
                        }),
                        start,
                    );
                }
                SyntaxKind::PlusPlus | SyntaxKind::MinusMinus => {
                    let op = if self.at(SyntaxKind::PlusPlus) {
                        UnaryOp::PostIncrement
                    } else {
                        UnaryOp::PostDecrement
                    };
                    self.advance();
                    expression = self.finish_node(
                        NodeKind::Unary(UnaryData {
                            op,
                            operand: expression,
                        }),
                        start,
                    );
                }
                SyntaxKind::Exclamation if !self.token_starts_expression(1) => {
                    self.advance();
                    expression = self.finish_node(
                        NodeKind::Unary(UnaryData {
                            op: UnaryOp::SuppressNull,
                            operand: expression,
                        }),
                        start,
                    );
                }
                _ => return expression,
            }
        }
    }

    /// `a?[i]` versus `a ? [x] : y` - only the former has no `:` at depth zero
    /// before the statement ends.
    fn is_conditional_element_access(&self) -> bool {
        let Some(close) = self.matching_close(self.pos + 1) else {
            return false;
        };
        self.tokens
            .get(close + 1)
            .is_none_or(|t| t.kind != SyntaxKind::Colon)
    }

    /// `(a, ref b, out var c, name: d)`
    pub(crate) fn parse_argument_list(&mut self) -> NodeList {
        self.parse_arguments(SyntaxKind::OpenParen, SyntaxKind::CloseParen)
    }

    fn parse_bracketed_arguments(&mut self) -> NodeList {
        self.parse_arguments(SyntaxKind::OpenBracket, SyntaxKind::CloseBracket)
    }

    fn parse_arguments(&mut self, open: SyntaxKind, close: SyntaxKind) -> NodeList {
        let mut arguments = Vec::new();
        if !self.expect(open) {
            return arguments;
        }
        while !self.at(close) && !self.at_eof() {
            let before = self.pos;
            // named argument
            if self.at(SyntaxKind::Identifier) && self.peek_kind(1) == SyntaxKind::Colon {
                self.advance();
                self.advance();
            }
            if matches!(
                self.kind(),
                SyntaxKind::RefKeyword | SyntaxKind::OutKeyword | SyntaxKind::InKeyword
            ) {
                self.advance();
                // `out var x` / `out int x` declares the variable in place
                if self.at(SyntaxKind::Identifier) && self.peek_kind(1) == SyntaxKind::Identifier {
                    self.advance();
                }
            }
            arguments.push(self.parse_expression());
            if self.pos == before {
                self.advance();
            }
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        if !self.expect(close) {
            self.skip_until(&[close, SyntaxKind::Semicolon]);
            self.eat(close);
        }
        arguments
    }

    fn parse_primary_expression(&mut self) -> NodeIndex {
        let start = self.token_start();
        match self.kind() {
            SyntaxKind::IntegerLiteral => self.parse_literal(LiteralKind::Integer),
            SyntaxKind::RealLiteral => self.parse_literal(LiteralKind::Real),
            SyntaxKind::CharLiteral => self.parse_literal(LiteralKind::Char),
            SyntaxKind::TrueKeyword => self.parse_literal(LiteralKind::True),
            SyntaxKind::FalseKeyword => self.parse_literal(LiteralKind::False),
            SyntaxKind::NullKeyword => self.parse_literal(LiteralKind::Null),
            SyntaxKind::StringLiteral if self.current().text.starts_with('$') => {
                self.parse_interpolated_string()
            }
            SyntaxKind::StringLiteral => self.parse_literal(LiteralKind::String),
            SyntaxKind::ThisKeyword => {
                self.advance();
                self.finish_node(NodeKind::This, start)
            }
            SyntaxKind::BaseKeyword => {
                self.advance();
                self.finish_node(NodeKind::Base, start)
            }
            SyntaxKind::OpenParen => {
                self.advance();
                let inner = self.parse_expression();
                // tuple literal: keep the first element, analyse the rest as siblings
                let mut extra = Vec::new();
                while self.eat(SyntaxKind::Comma) {
                    extra.push(self.parse_expression());
                }
                self.expect(SyntaxKind::CloseParen);
                if extra.is_empty() {
                    self.finish_node(NodeKind::Parenthesized(inner), start)
                } else {
                    extra.insert(0, inner);
                    self.finish_node(NodeKind::InitializerList(extra), start)
                }
            }
            SyntaxKind::NewKeyword => self.parse_new_expression(),
            SyntaxKind::TypeofKeyword => {
                self.advance();
                self.expect(SyntaxKind::OpenParen);
                let ty = self.parse_type();
                self.expect(SyntaxKind::CloseParen);
                self.finish_node(NodeKind::TypeOf(ty), start)
            }
            SyntaxKind::DefaultKeyword => {
                self.advance();
                let ty = if self.eat(SyntaxKind::OpenParen) {
                    let ty = self.parse_type();
                    self.expect(SyntaxKind::CloseParen);
                    Some(ty)
                } else {
                    None
                };
                self.finish_node(NodeKind::Default(ty), start)
            }
            SyntaxKind::CheckedKeyword | SyntaxKind::UncheckedKeyword => {
                let checked = self.at(SyntaxKind::CheckedKeyword);
                self.advance();
                self.expect(SyntaxKind::OpenParen);
                let inner = self.parse_expression();
                self.expect(SyntaxKind::CloseParen);
                self.finish_node(
                    NodeKind::CheckedExpression(CheckedData { inner, checked }),
                    start,
                )
            }
            SyntaxKind::OpenBrace => self.parse_initializer_list(),
            SyntaxKind::Identifier if self.at_contextual("nameof") && self.peek_kind(1) == SyntaxKind::OpenParen => {
                self.advance();
                self.skip_balanced();
                let text = self.arena_text(start, self.prev_end());
                self.finish_node(
                    NodeKind::Literal(LiteralData {
                        kind: LiteralKind::String,
                        text,
                    }),
                    start,
                )
            }
            SyntaxKind::Identifier => {
                let name = self.current().text.clone();
                self.advance();
                let type_args = self.try_parse_expression_type_arguments().unwrap_or_default();
                self.finish_node(NodeKind::Identifier(IdentifierData { name, type_args }), start)
            }
            _ => {
                let found = self.current().text.clone();
                self.error_at_current(format!("expression expected, found '{found}'"));
                self.missing_node()
            }
        }
    }

    fn arena_text(&self, start: u32, end: u32) -> String {
        self.arena
            .file(self.file)
            .and_then(|f| f.text.get(start as usize..end as usize))
            .unwrap_or("")
            .to_string()
    }

    fn parse_literal(&mut self, kind: LiteralKind) -> NodeIndex {
        let start = self.token_start();
        let text = self.current().text.clone();
        self.advance();
        self.finish_node(NodeKind::Literal(LiteralData { kind, text }), start)
    }

    /// `$"a {x} b {y:N2}"` - each hole is parsed as an expression.
    fn parse_interpolated_string(&mut self) -> NodeIndex {
        let start = self.token_start();
        let token = self.current().clone();
        self.advance();
        let mut holes = Vec::new();
        for (offset, hole) in interpolation_holes(&token.text) {
            let base = token.span.start + offset as u32;
            holes.push(self.parse_embedded_expression(hole, base));
        }
        self.finish_node(NodeKind::InterpolatedString(holes), start)
    }

    /// Parse `text` (located at `base` in the file) as a standalone expression.
    fn parse_embedded_expression(&mut self, text: &str, base: u32) -> NodeIndex {
        let mut tokens = ScannerState::new(text).scan_all().tokens;
        for token in &mut tokens {
            token.span = Span::new(token.span.start + base, token.span.end + base);
        }
        let saved_tokens = std::mem::replace(&mut self.tokens, tokens);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let expression = self.parse_expression();
        self.tokens = saved_tokens;
        self.pos = saved_pos;
        expression
    }

    fn parse_new_expression(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();

        // `new[] { ... }`
        if self.at(SyntaxKind::OpenBracket) {
            self.skip_balanced();
            let initializer = self.parse_initializer_items();
            return self.finish_node(
                NodeKind::ArrayCreation(ArrayCreationData {
                    element_type: None,
                    sizes: Vec::new(),
                    initializer,
                }),
                start,
            );
        }
        // target-typed `new(...)` or anonymous `new { ... }`
        if self.at(SyntaxKind::OpenParen) || self.at(SyntaxKind::OpenBrace) {
            let arguments = if self.at(SyntaxKind::OpenParen) {
                self.parse_argument_list()
            } else {
                Vec::new()
            };
            let initializer = if self.at(SyntaxKind::OpenBrace) {
                self.parse_initializer_items()
            } else {
                Vec::new()
            };
            return self.finish_node(
                NodeKind::ObjectCreation(ObjectCreationData {
                    ty: None,
                    arguments,
                    initializer,
                }),
                start,
            );
        }

        let mut ty = self.parse_type();
        if ty.array_rank > 0 || self.at(SyntaxKind::OpenBracket) {
            let mut sizes = Vec::new();
            if self.at(SyntaxKind::OpenBracket) {
                sizes = self.parse_bracketed_arguments();
                // trailing rank specifiers of jagged arrays
                while self.at(SyntaxKind::OpenBracket) {
                    self.skip_balanced();
                }
            } else {
                ty.array_rank -= 1;
            }
            let initializer = if self.at(SyntaxKind::OpenBrace) {
                self.parse_initializer_items()
            } else {
                Vec::new()
            };
            return self.finish_node(
                NodeKind::ArrayCreation(ArrayCreationData {
                    element_type: Some(ty),
                    sizes,
                    initializer,
                }),
                start,
            );
        }

        let arguments = if self.at(SyntaxKind::OpenParen) {
            self.parse_argument_list()
        } else {
            Vec::new()
        };
        let initializer = if self.at(SyntaxKind::OpenBrace) {
            self.parse_initializer_items()
        } else {
            Vec::new()
        };
        self.finish_node(
            NodeKind::ObjectCreation(ObjectCreationData {
                ty: Some(ty),
                arguments,
                initializer,
            }),
            start,
        )
    }

    pub(crate) fn parse_initializer_list(&mut self) -> NodeIndex {
        let start = self.token_start();
        let items = self.parse_initializer_items();
        self.finish_node(NodeKind::InitializerList(items), start)
    }

    /// `{ a, B = b, [k] = v, { x, y } }`
    fn parse_initializer_items(&mut self) -> NodeList {
        let mut items = Vec::new();
        if !self.expect(SyntaxKind::OpenBrace) {
            return items;
        }
        while !self.at(SyntaxKind::CloseBrace) && !self.at_eof() {
            let before = self.pos;
            let item = if self.at(SyntaxKind::OpenBrace) {
                self.parse_initializer_list()
            } else if self.at(SyntaxKind::OpenBracket) {
                self.parse_indexed_initializer()
            } else {
                self.parse_expression()
            };
            items.push(item);
            if self.pos == before {
                self.advance();
            }
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::CloseBrace);
        items
    }

    /// `[key] = value` inside an object initializer.
    fn parse_indexed_initializer(&mut self) -> NodeIndex {
        let start = self.token_start();
        let arguments = self.parse_bracketed_arguments();
        let target = self.finish_node(
            NodeKind::ElementAccess(ElementAccessData {
                expression: NodeIndex::NONE,
                arguments,
                conditional: false,
            }),
            start,
        );
        if !self.eat(SyntaxKind::Equals) {
            return target;
        }
        let value = self.parse_variable_initializer();
        self.finish_node(
            NodeKind::Assignment(AssignmentData {
                op: AssignmentOp::Assign,
                target,
                value,
            }),
            start,
        )
    }

    // =========================================================================
    // Lambdas
    // =========================================================================

    fn is_lambda_start(&self) -> bool {
        let mut offset = 0;
        if self.peek_kind(offset) == SyntaxKind::OpenBracket {
            // attributes on a lambda: `[Throws(typeof(E))] () => ...`
            let mut index = self.pos;
            while self.tokens.get(index).is_some_and(|t| t.kind == SyntaxKind::OpenBracket) {
                match self.matching_close(index) {
                    Some(close) => index = close + 1,
                    None => return false,
                }
            }
            offset = index - self.pos;
        }
        while matches!(
            self.peek_kind(offset),
            SyntaxKind::StaticKeyword
        ) || (self.peek_kind(offset) == SyntaxKind::Identifier
            && self.peek(offset).text == "async"
            && matches!(
                self.peek_kind(offset + 1),
                SyntaxKind::Identifier | SyntaxKind::OpenParen
            ))
        {
            offset += 1;
        }
        match self.peek_kind(offset) {
            SyntaxKind::Identifier => self.peek_kind(offset + 1) == SyntaxKind::Arrow,
            SyntaxKind::OpenParen => self
                .matching_close(self.pos + offset)
                .and_then(|close| self.tokens.get(close + 1))
                .is_some_and(|t| t.kind == SyntaxKind::Arrow),
            _ => false,
        }
    }

    fn parse_lambda(&mut self) -> NodeIndex {
        let start = self.token_start();
        let attributes = self.parse_attribute_lists();
        let mut is_async = false;
        loop {
            if self.eat(SyntaxKind::StaticKeyword) {
                continue;
            }
            if self.at_contextual("async")
                && matches!(self.peek_kind(1), SyntaxKind::Identifier | SyntaxKind::OpenParen)
            {
                self.advance();
                is_async = true;
                continue;
            }
            break;
        }

        let mut params = Vec::new();
        if self.at(SyntaxKind::Identifier) {
            let param_start = self.token_start();
            let (name, _) = self.expect_identifier();
            params.push(self.finish_node(
                NodeKind::Parameter(ParameterData {
                    name,
                    ty: None,
                    default: NodeIndex::NONE,
                    modifier: ParameterModifier::None,
                    attributes: Vec::new(),
                }),
                param_start,
            ));
        } else {
            self.expect(SyntaxKind::OpenParen);
            while !self.at(SyntaxKind::CloseParen) && !self.at_eof() {
                let before = self.pos;
                params.push(self.parse_lambda_parameter());
                if self.pos == before {
                    self.advance();
                }
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.expect(SyntaxKind::CloseParen);
        }
        self.expect(SyntaxKind::Arrow);
        let body = if self.at(SyntaxKind::OpenBrace) {
            self.parse_block()
        } else {
            self.parse_expression()
        };
        self.finish_node(
            NodeKind::Lambda(LambdaData {
                params,
                body,
                attributes,
                is_async,
            }),
            start,
        )
    }

    /// `x`, `int x`, `ref int x`, `_`
    fn parse_lambda_parameter(&mut self) -> NodeIndex {
        let start = self.token_start();
        let attributes = self.parse_attribute_lists();
        let modifier = match self.kind() {
            SyntaxKind::RefKeyword => ParameterModifier::Ref,
            SyntaxKind::OutKeyword => ParameterModifier::Out,
            SyntaxKind::InKeyword => ParameterModifier::In,
            _ => ParameterModifier::None,
        };
        if modifier != ParameterModifier::None {
            self.advance();
        }
        let explicitly_typed = !(self.at(SyntaxKind::Identifier)
            && matches!(
                self.peek_kind(1),
                SyntaxKind::Comma | SyntaxKind::CloseParen
            ));
        let ty = if explicitly_typed {
            Some(self.parse_type())
        } else {
            None
        };
        let (name, _) = self.expect_identifier();
        self.finish_node(
            NodeKind::Parameter(ParameterData {
                name,
                ty,
                default: NodeIndex::NONE,
                modifier,
                attributes,
            }),
            start,
        )
    }
}

/// Byte offset (relative to the token) and text of every `{...}` hole in an
/// interpolated string literal. Alignment and format clauses are dropped.
fn interpolation_holes(text: &str) -> Vec<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut holes = Vec::new();
    let mut i = text.find('"').map_or(bytes.len(), |q| q + 1);
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => i += 2,
            b'{' => {
                let hole_start = i + 1;
                let mut depth = 0i32;
                let mut end = hole_start;
                let mut clause_start = None;
                while end < bytes.len() {
                    match bytes[end] {
                        b'(' | b'[' | b'{' => depth += 1,
                        b')' | b']' => depth -= 1,
                        b'}' if depth == 0 => break,
                        b'}' => depth -= 1,
                        b':' | b',' if depth == 0 && clause_start.is_none() => {
                            clause_start = Some(end)
                        }
                        b'"' if depth == 0 => break,
                        _ => {}
                    }
                    end += 1;
                }
                let hole_end = clause_start.unwrap_or(end);
                if let Some(hole) = text.get(hole_start..hole_end)
                    && !hole.trim().is_empty()
                {
                    holes.push((hole_start, hole));
                }
                i = end + 1;
            }
            _ => i += 1,
        }
    }
    holes
}
