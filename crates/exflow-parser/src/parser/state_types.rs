//! Parser state - type syntax.

use super::node::TypeSyntax;
use super::state::ParserState;
use crate::scanner::SyntaxKind;
use exflow_common::Span;

/// Where a type is being parsed; decides how `?` is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TypeContext {
    /// Declarations (`string? name`): `?` is always the nullable marker.
    Declaration,
    /// After `is`/`as` or inside a cast: `?` may start a conditional.
    Expression,
}

impl ParserState<'_> {
    /// Parse a type, restoring the position and returning `None` if the
    /// tokens do not form one.
    pub(crate) fn try_parse_type(&mut self, context: TypeContext) -> Option<TypeSyntax> {
        let snapshot = self.snapshot();
        match self.parse_type_inner(context) {
            Some(ty) => Some(ty),
            None => {
                self.restore(snapshot);
                None
            }
        }
    }

    /// Parse a type, reporting an error when absent.
    pub(crate) fn parse_type(&mut self) -> TypeSyntax {
        if let Some(ty) = self.try_parse_type(TypeContext::Declaration) {
            return ty;
        }
        self.error_at_current("type expected".to_string());
        TypeSyntax::simple("", Span::at(self.token_start()))
    }

    fn parse_type_inner(&mut self, context: TypeContext) -> Option<TypeSyntax> {
        let start = self.token_start();
        let mut ty = if self.at(SyntaxKind::OpenParen) {
            self.parse_tuple_type()?
        } else {
            self.parse_named_type()?
        };

        if self.at(SyntaxKind::Question) && self.question_is_nullable_marker(context) {
            self.advance();
            ty.nullable = true;
        }
        while self.at(SyntaxKind::OpenBracket) {
            let mut offset = 1;
            while self.peek_kind(offset) == SyntaxKind::Comma {
                offset += 1;
            }
            if self.peek_kind(offset) != SyntaxKind::CloseBracket {
                break;
            }
            for _ in 0..=offset {
                self.advance();
            }
            ty.array_rank = ty.array_rank.saturating_add(1);
            if self.at(SyntaxKind::Question) && self.question_is_nullable_marker(context) {
                self.advance();
            }
        }
        ty.span = Span::new(start, self.prev_end());
        Some(ty)
    }

    fn parse_named_type(&mut self) -> Option<TypeSyntax> {
        if !self.at(SyntaxKind::Identifier) {
            return None;
        }
        let start = self.token_start();
        let mut name = self.current().text.clone();
        self.advance();
        // `global::System.Exception`
        if self.at(SyntaxKind::ColonColon) {
            self.advance();
            if !self.at(SyntaxKind::Identifier) {
                return None;
            }
            name = self.current().text.clone();
            self.advance();
        }
        let mut type_args = Vec::new();
        loop {
            if self.at(SyntaxKind::LessThan) {
                type_args = self.parse_type_argument_list()?;
            }
            if self.at(SyntaxKind::Dot) && self.peek_kind(1) == SyntaxKind::Identifier {
                // Generic outer types are flattened: `Outer<T>.Inner` keeps only `Outer.Inner`.
                self.advance();
                name.push('.');
                name.push_str(&self.current().text);
                self.advance();
                type_args.clear();
                continue;
            }
            break;
        }
        Some(TypeSyntax {
            name,
            type_args,
            nullable: false,
            array_rank: 0,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// `(int, string name)` is read as `ValueTuple<int, string>`.
    fn parse_tuple_type(&mut self) -> Option<TypeSyntax> {
        let start = self.token_start();
        self.advance();
        let mut elements = Vec::new();
        loop {
            let element = self.parse_type_inner(TypeContext::Declaration)?;
            elements.push(element);
            if self.at(SyntaxKind::Identifier) {
                self.advance();
            }
            if self.eat(SyntaxKind::Comma) {
                continue;
            }
            break;
        }
        if !self.eat(SyntaxKind::CloseParen) || elements.len() < 2 {
            return None;
        }
        Some(TypeSyntax {
            name: "ValueTuple".to_string(),
            type_args: elements,
            nullable: false,
            array_rank: 0,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// `<T, U>` in type position. `None` if the list is malformed.
    pub(crate) fn parse_type_argument_list(&mut self) -> Option<Vec<TypeSyntax>> {
        if !self.eat(SyntaxKind::LessThan) {
            return None;
        }
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type_inner(TypeContext::Declaration)?);
            if self.eat(SyntaxKind::Comma) {
                continue;
            }
            break;
        }
        if !self.eat(SyntaxKind::GreaterThan) {
            return None;
        }
        Some(args)
    }

    /// Speculatively parse generic arguments after a name in expression
    /// position (`Cast<int>()`, `Foo<T>.Bar`). Only accepted when the token
    /// after `>` disambiguates it from a comparison.
    pub(crate) fn try_parse_expression_type_arguments(&mut self) -> Option<Vec<TypeSyntax>> {
        if !self.at(SyntaxKind::LessThan) {
            return None;
        }
        let snapshot = self.snapshot();
        if let Some(args) = self.parse_type_argument_list()
            && matches!(
                self.kind(),
                SyntaxKind::OpenParen
                    | SyntaxKind::CloseParen
                    | SyntaxKind::Dot
                    | SyntaxKind::QuestionDot
                    | SyntaxKind::Semicolon
                    | SyntaxKind::Comma
                    | SyntaxKind::CloseBracket
                    | SyntaxKind::EqualsEquals
                    | SyntaxKind::ExclamationEquals
            )
        {
            return Some(args);
        }
        self.restore(snapshot);
        None
    }

    fn question_is_nullable_marker(&self, context: TypeContext) -> bool {
        match context {
            TypeContext::Declaration => true,
            TypeContext::Expression => matches!(
                self.peek_kind(1),
                SyntaxKind::CloseParen
                    | SyntaxKind::Comma
                    | SyntaxKind::Semicolon
                    | SyntaxKind::CloseBracket
                    | SyntaxKind::CloseBrace
                    | SyntaxKind::OpenBracket
                    | SyntaxKind::GreaterThan
            ),
        }
    }
}
