//! Parser state - type declarations, members, attributes and parameters.

use super::base::{NodeIndex, NodeList};
use super::node::{
    AccessorData, AccessorKind, AttributeData, FieldData, MethodData, Modifiers, NodeKind,
    ParameterData, ParameterModifier, PropertyData, PropertyKind, TypeDeclData, TypeDeclKind,
    TypeSyntax, VariableDeclaratorData,
};
use super::state::ParserState;
use crate::scanner::SyntaxKind;
use exflow_common::Span;

/// Attributes, modifiers and doc comment collected ahead of a declaration.
pub(crate) struct DeclarationPrefix {
    pub start: u32,
    pub doc: Option<String>,
    pub attributes: NodeList,
    pub modifiers: Modifiers,
}

impl ParserState<'_> {
    /// Parse a type or member declaration. Returns NONE for constructs that
    /// are skipped (enums, delegates, operators without bodies).
    pub(crate) fn parse_member_declaration(&mut self) -> NodeIndex {
        if !self.enter() {
            self.leave();
            self.skip_until(&[SyntaxKind::CloseBrace]);
            return NodeIndex::NONE;
        }
        let result = self.parse_member_declaration_inner();
        self.leave();
        result
    }

    fn parse_member_declaration_inner(&mut self) -> NodeIndex {
        let prefix = self.parse_declaration_prefix();

        match self.kind() {
            SyntaxKind::ClassKeyword => {
                return self.parse_type_declaration(prefix, TypeDeclKind::Class);
            }
            SyntaxKind::InterfaceKeyword => {
                return self.parse_type_declaration(prefix, TypeDeclKind::Interface);
            }
            SyntaxKind::StructKeyword => {
                return self.parse_type_declaration(prefix, TypeDeclKind::Struct);
            }
            SyntaxKind::EventKeyword => return self.parse_event(prefix),
            SyntaxKind::Tilde => return self.parse_finalizer(prefix),
            _ => {}
        }

        if self.at_contextual("record") && self.peek_kind(1) == SyntaxKind::Identifier {
            self.advance();
            self.eat(SyntaxKind::ClassKeyword);
            return self.parse_type_declaration_body(prefix, TypeDeclKind::Class);
        }
        if self.at_contextual("enum") || self.at_contextual("delegate") {
            self.skip_until(&[SyntaxKind::OpenBrace, SyntaxKind::Semicolon]);
            if self.at(SyntaxKind::OpenBrace) {
                self.skip_balanced();
            }
            self.eat(SyntaxKind::Semicolon);
            return NodeIndex::NONE;
        }

        // Constructor: `Name(`
        if self.at(SyntaxKind::Identifier)
            && self.peek_kind(1) == SyntaxKind::OpenParen
            && self.type_names.last().is_some_and(|n| *n == self.current().text)
        {
            return self.parse_constructor(prefix);
        }

        if !self.at(SyntaxKind::Identifier) && !self.at(SyntaxKind::OpenParen) {
            if prefix.start != self.token_start() {
                self.error_at_current("member declaration expected".to_string());
            }
            return NodeIndex::NONE;
        }

        let ty = self.parse_type();

        if self.at_contextual("operator") {
            return self.parse_operator(prefix, ty);
        }
        if self.at(SyntaxKind::ThisKeyword) {
            return self.parse_indexer(prefix, ty);
        }

        let (name, name_span) = self.parse_member_name();
        match self.kind() {
            SyntaxKind::OpenParen | SyntaxKind::LessThan => {
                self.parse_method_rest(prefix, ty, name, name_span, false)
            }
            SyntaxKind::OpenBrace | SyntaxKind::Arrow => {
                self.parse_property_rest(prefix, ty, name, name_span, PropertyKind::Property)
            }
            _ => self.parse_field_rest(prefix, ty, name, name_span, false),
        }
    }

    /// Doc comment, attribute lists and modifiers.
    pub(crate) fn parse_declaration_prefix(&mut self) -> DeclarationPrefix {
        let start = self.token_start();
        let doc = self.current().doc.clone();
        let attributes = self.parse_attribute_lists();
        let modifiers = self.parse_modifiers();
        DeclarationPrefix {
            start,
            doc,
            attributes,
            modifiers,
        }
    }

    pub(crate) fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::empty();
        loop {
            let flag = match self.kind() {
                SyntaxKind::PublicKeyword => Modifiers::PUBLIC,
                SyntaxKind::PrivateKeyword => Modifiers::PRIVATE,
                SyntaxKind::ProtectedKeyword => Modifiers::PROTECTED,
                SyntaxKind::InternalKeyword => Modifiers::INTERNAL,
                SyntaxKind::StaticKeyword => Modifiers::STATIC,
                SyntaxKind::AbstractKeyword => Modifiers::ABSTRACT,
                SyntaxKind::VirtualKeyword => Modifiers::VIRTUAL,
                SyntaxKind::OverrideKeyword => Modifiers::OVERRIDE,
                SyntaxKind::SealedKeyword => Modifiers::SEALED,
                SyntaxKind::ReadonlyKeyword => Modifiers::READONLY,
                SyntaxKind::ConstKeyword => Modifiers::CONST,
                SyntaxKind::ExternKeyword => Modifiers::EXTERN,
                SyntaxKind::NewKeyword if self.peek_kind(1) != SyntaxKind::OpenParen => {
                    Modifiers::NEW
                }
                SyntaxKind::Identifier
                    if matches!(self.current().text.as_str(), "async" | "partial")
                        && matches!(
                            self.peek_kind(1),
                            SyntaxKind::Identifier
                                | SyntaxKind::ClassKeyword
                                | SyntaxKind::InterfaceKeyword
                                | SyntaxKind::StructKeyword
                        ) =>
                {
                    if self.current().text == "async" {
                        Modifiers::ASYNC
                    } else {
                        Modifiers::PARTIAL
                    }
                }
                _ => return modifiers,
            };
            modifiers |= flag;
            self.advance();
        }
    }

    /// `[A, B(x)] [C]` - zero or more attribute lists.
    pub(crate) fn parse_attribute_lists(&mut self) -> NodeList {
        let mut attributes = Vec::new();
        while self.at(SyntaxKind::OpenBracket) {
            self.advance();
            // attribute target: `[return: NotNull]`
            if (self.at(SyntaxKind::Identifier) || self.at(SyntaxKind::ReturnKeyword))
                && self.peek_kind(1) == SyntaxKind::Colon
            {
                self.advance();
                self.advance();
            }
            loop {
                if !self.at(SyntaxKind::Identifier) {
                    break;
                }
                attributes.push(self.parse_attribute());
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            if !self.expect(SyntaxKind::CloseBracket) {
                self.skip_until(&[SyntaxKind::CloseBracket]);
                self.eat(SyntaxKind::CloseBracket);
            }
        }
        attributes
    }

    fn parse_attribute(&mut self) -> NodeIndex {
        let start = self.token_start();
        let mut name = self.expect_identifier().0;
        while self.at(SyntaxKind::Dot) && self.peek_kind(1) == SyntaxKind::Identifier {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_identifier().0);
        }
        let mut arguments = Vec::new();
        if self.eat(SyntaxKind::OpenParen) {
            while !self.at(SyntaxKind::CloseParen) && !self.at_eof() {
                let before = self.pos;
                arguments.push(self.parse_expression());
                if self.pos == before {
                    self.advance();
                }
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.expect(SyntaxKind::CloseParen);
        }
        self.finish_node(NodeKind::Attribute(AttributeData { name, arguments }), start)
    }

    fn parse_type_declaration(&mut self, prefix: DeclarationPrefix, kind: TypeDeclKind) -> NodeIndex {
        self.advance();
        self.parse_type_declaration_body(prefix, kind)
    }

    fn parse_type_declaration_body(
        &mut self,
        prefix: DeclarationPrefix,
        kind: TypeDeclKind,
    ) -> NodeIndex {
        let (name, _) = self.expect_identifier();
        let type_params = self.parse_type_parameter_list();
        // primary constructor parameters of records are not modelled
        if self.at(SyntaxKind::OpenParen) {
            self.skip_balanced();
        }
        let mut bases = Vec::new();
        if self.eat(SyntaxKind::Colon) {
            loop {
                bases.push(self.parse_type());
                if self.at(SyntaxKind::OpenParen) {
                    self.skip_balanced();
                }
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
        }
        self.skip_constraint_clauses();

        self.type_names.push(name.clone());
        let mut members = Vec::new();
        if self.expect(SyntaxKind::OpenBrace) {
            while !self.at(SyntaxKind::CloseBrace) && !self.at_eof() {
                let before = self.pos;
                let member = self.parse_member_declaration();
                if member.is_some() {
                    members.push(member);
                }
                if self.pos == before {
                    self.error_at_current("member declaration expected".to_string());
                    self.advance();
                }
            }
            self.expect(SyntaxKind::CloseBrace);
        } else {
            self.eat(SyntaxKind::Semicolon);
        }
        self.type_names.pop();
        self.eat(SyntaxKind::Semicolon);

        self.finish_node(
            NodeKind::TypeDecl(TypeDeclData {
                kind,
                name,
                type_params,
                bases,
                members,
                modifiers: prefix.modifiers,
                attributes: prefix.attributes,
                doc: prefix.doc,
            }),
            prefix.start,
        )
    }

    /// `<T, in U, out V>`
    pub(crate) fn parse_type_parameter_list(&mut self) -> Vec<String> {
        let mut params = Vec::new();
        if !self.eat(SyntaxKind::LessThan) {
            return params;
        }
        loop {
            self.parse_attribute_lists();
            if self.at(SyntaxKind::InKeyword) || self.at(SyntaxKind::OutKeyword) {
                self.advance();
            }
            params.push(self.expect_identifier().0);
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::GreaterThan);
        params
    }

    /// `where T : class, new()` clauses are skipped.
    pub(crate) fn skip_constraint_clauses(&mut self) {
        while self.at_contextual("where") && self.peek_kind(2) == SyntaxKind::Colon {
            self.skip_until(&[
                SyntaxKind::OpenBrace,
                SyntaxKind::Semicolon,
                SyntaxKind::Arrow,
            ]);
        }
    }

    /// Member name, dropping an explicit interface qualifier (`IFoo.Bar`).
    fn parse_member_name(&mut self) -> (String, Span) {
        let (mut name, mut span) = self.expect_identifier();
        while self.at(SyntaxKind::Dot) && self.peek_kind(1) == SyntaxKind::Identifier {
            self.advance();
            let (next, next_span) = self.expect_identifier();
            name = next;
            span = next_span;
        }
        (name, span)
    }

    fn parse_constructor(&mut self, prefix: DeclarationPrefix) -> NodeIndex {
        let (name, name_span) = self.expect_identifier();
        let params = self.parse_parameter_list();
        let mut initializer = NodeIndex::NONE;
        if self.eat(SyntaxKind::Colon) {
            let init_start = self.token_start();
            let callee = match self.kind() {
                SyntaxKind::BaseKeyword => {
                    self.advance();
                    self.finish_node(NodeKind::Base, init_start)
                }
                SyntaxKind::ThisKeyword => {
                    self.advance();
                    self.finish_node(NodeKind::This, init_start)
                }
                _ => {
                    self.error_at_current("'base' or 'this' expected".to_string());
                    self.missing_node()
                }
            };
            let arguments = self.parse_argument_list();
            initializer = self.finish_node(
                NodeKind::Invocation(super::node::InvocationData {
                    expression: callee,
                    arguments,
                }),
                init_start,
            );
        }
        let (body, expression_body) = self.parse_function_body();
        let return_type = TypeSyntax::simple(name.clone(), name_span);
        self.finish_node(
            NodeKind::Constructor(MethodData {
                name,
                name_span,
                type_params: Vec::new(),
                return_type,
                params,
                body,
                expression_body,
                initializer,
                modifiers: prefix.modifiers,
                attributes: prefix.attributes,
                doc: prefix.doc,
            }),
            prefix.start,
        )
    }

    fn parse_finalizer(&mut self, prefix: DeclarationPrefix) -> NodeIndex {
        self.advance();
        let (_, name_span) = self.expect_identifier();
        let params = self.parse_parameter_list();
        let (body, expression_body) = self.parse_function_body();
        self.finish_node(
            NodeKind::Method(MethodData {
                name: "Finalize".to_string(),
                name_span,
                type_params: Vec::new(),
                return_type: TypeSyntax::simple("void", name_span),
                params,
                body,
                expression_body,
                initializer: NodeIndex::NONE,
                modifiers: prefix.modifiers,
                attributes: prefix.attributes,
                doc: prefix.doc,
            }),
            prefix.start,
        )
    }

    /// `T operator +(...)` and conversion operators; kept as methods named `op`.
    fn parse_operator(&mut self, prefix: DeclarationPrefix, ty: TypeSyntax) -> NodeIndex {
        let name_span = self.current().span;
        self.advance();
        while !self.at(SyntaxKind::OpenParen) && !self.at_eof() {
            self.advance();
        }
        self.parse_method_rest(prefix, ty, "op".to_string(), name_span, false)
    }

    pub(crate) fn parse_method_rest(
        &mut self,
        prefix: DeclarationPrefix,
        return_type: TypeSyntax,
        name: String,
        name_span: Span,
        local: bool,
    ) -> NodeIndex {
        let type_params = self.parse_type_parameter_list();
        let params = self.parse_parameter_list();
        self.skip_constraint_clauses();
        let (body, expression_body) = self.parse_function_body();
        let data = MethodData {
            name,
            name_span,
            type_params,
            return_type,
            params,
            body,
            expression_body,
            initializer: NodeIndex::NONE,
            modifiers: prefix.modifiers,
            attributes: prefix.attributes,
            doc: prefix.doc,
        };
        let kind = if local {
            NodeKind::LocalFunction(data)
        } else {
            NodeKind::Method(data)
        };
        self.finish_node(kind, prefix.start)
    }

    /// `{ ... }`, `=> expr;` or `;`. Returns the body and whether it is an expression.
    pub(crate) fn parse_function_body(&mut self) -> (NodeIndex, bool) {
        match self.kind() {
            SyntaxKind::OpenBrace => (self.parse_block(), false),
            SyntaxKind::Arrow => {
                self.advance();
                let expr = self.parse_expression();
                self.expect(SyntaxKind::Semicolon);
                (expr, true)
            }
            _ => {
                self.expect(SyntaxKind::Semicolon);
                (NodeIndex::NONE, false)
            }
        }
    }

    pub(crate) fn parse_parameter_list(&mut self) -> NodeList {
        self.parse_parameters(SyntaxKind::OpenParen, SyntaxKind::CloseParen)
    }

    fn parse_parameters(&mut self, open: SyntaxKind, close: SyntaxKind) -> NodeList {
        let mut params = Vec::new();
        if !self.expect(open) {
            return params;
        }
        while !self.at(close) && !self.at_eof() {
            let before = self.pos;
            params.push(self.parse_parameter());
            if self.pos == before {
                self.advance();
            }
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(close);
        params
    }

    fn parse_parameter(&mut self) -> NodeIndex {
        let start = self.token_start();
        let attributes = self.parse_attribute_lists();
        let modifier = match self.kind() {
            SyntaxKind::RefKeyword => ParameterModifier::Ref,
            SyntaxKind::OutKeyword => ParameterModifier::Out,
            SyntaxKind::InKeyword => ParameterModifier::In,
            SyntaxKind::ParamsKeyword => ParameterModifier::Params,
            SyntaxKind::ThisKeyword => ParameterModifier::This,
            _ => ParameterModifier::None,
        };
        if modifier != ParameterModifier::None {
            self.advance();
        }
        let ty = self.parse_type();
        let (name, _) = self.expect_identifier();
        let default = if self.eat(SyntaxKind::Equals) {
            self.parse_expression()
        } else {
            NodeIndex::NONE
        };
        self.finish_node(
            NodeKind::Parameter(ParameterData {
                name,
                ty: Some(ty),
                default,
                modifier,
                attributes,
            }),
            start,
        )
    }

    fn parse_indexer(&mut self, prefix: DeclarationPrefix, ty: TypeSyntax) -> NodeIndex {
        let name_span = self.current().span;
        self.advance();
        let params = self.parse_parameters(SyntaxKind::OpenBracket, SyntaxKind::CloseBracket);
        let index =
            self.parse_property_rest(prefix, ty, "this".to_string(), name_span, PropertyKind::Indexer);
        if let Some(NodeKind::Property(data)) = self.arena.kind(index) {
            let mut data = data.clone();
            data.params = params;
            self.arena.set_kind(index, NodeKind::Property(data));
        }
        index
    }

    fn parse_event(&mut self, prefix: DeclarationPrefix) -> NodeIndex {
        self.advance();
        let ty = self.parse_type();
        let (name, name_span) = self.parse_member_name();
        if self.at(SyntaxKind::OpenBrace) {
            return self.parse_property_rest(prefix, ty, name, name_span, PropertyKind::Event);
        }
        self.parse_field_rest(prefix, ty, name, name_span, true)
    }

    fn parse_property_rest(
        &mut self,
        prefix: DeclarationPrefix,
        ty: TypeSyntax,
        name: String,
        name_span: Span,
        kind: PropertyKind,
    ) -> NodeIndex {
        let mut accessors = None;
        let mut expression_body = NodeIndex::NONE;
        let mut initializer = NodeIndex::NONE;
        if self.eat(SyntaxKind::Arrow) {
            expression_body = self.parse_expression();
            self.expect(SyntaxKind::Semicolon);
        } else if self.expect(SyntaxKind::OpenBrace) {
            let mut list = Vec::new();
            while !self.at(SyntaxKind::CloseBrace) && !self.at_eof() {
                let before = self.pos;
                let accessor = self.parse_accessor();
                if accessor.is_some() {
                    list.push(accessor);
                }
                if self.pos == before {
                    self.error_at_current("accessor expected".to_string());
                    self.advance();
                }
            }
            self.expect(SyntaxKind::CloseBrace);
            accessors = Some(list);
            if self.eat(SyntaxKind::Equals) {
                initializer = self.parse_variable_initializer();
                self.expect(SyntaxKind::Semicolon);
            }
        }
        self.finish_node(
            NodeKind::Property(PropertyData {
                kind,
                name,
                name_span,
                ty,
                params: Vec::new(),
                accessors,
                expression_body,
                initializer,
                modifiers: prefix.modifiers,
                attributes: prefix.attributes,
                doc: prefix.doc,
            }),
            prefix.start,
        )
    }

    fn parse_accessor(&mut self) -> NodeIndex {
        let start = self.token_start();
        let attributes = self.parse_attribute_lists();
        let modifiers = self.parse_modifiers();
        let kind = match self.current().text.as_str() {
            "get" => AccessorKind::Get,
            "set" => AccessorKind::Set,
            "init" => AccessorKind::Init,
            "add" => AccessorKind::Add,
            "remove" => AccessorKind::Remove,
            _ => return NodeIndex::NONE,
        };
        if !self.at(SyntaxKind::Identifier) {
            return NodeIndex::NONE;
        }
        self.advance();
        let (body, expression_body) = self.parse_function_body();
        self.finish_node(
            NodeKind::Accessor(AccessorData {
                kind,
                body,
                expression_body,
                modifiers,
                attributes,
            }),
            start,
        )
    }

    fn parse_field_rest(
        &mut self,
        prefix: DeclarationPrefix,
        ty: TypeSyntax,
        first_name: String,
        first_span: Span,
        is_event: bool,
    ) -> NodeIndex {
        let mut declarators = Vec::new();
        let mut name = first_name;
        let mut name_start = first_span.start;
        loop {
            let initializer = if self.eat(SyntaxKind::Equals) {
                self.parse_variable_initializer()
            } else {
                NodeIndex::NONE
            };
            declarators.push(self.finish_node(
                NodeKind::VariableDeclarator(VariableDeclaratorData { name, initializer }),
                name_start,
            ));
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
            name_start = self.token_start();
            name = self.expect_identifier().0;
        }
        self.expect(SyntaxKind::Semicolon);
        self.finish_node(
            NodeKind::Field(FieldData {
                ty,
                declarators,
                modifiers: prefix.modifiers,
                attributes: prefix.attributes,
                is_event,
            }),
            prefix.start,
        )
    }
}
