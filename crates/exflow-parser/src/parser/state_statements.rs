//! Parser state - statements.

use super::base::{NodeIndex, NodeList};
use super::node::{
    BlockData, CatchData, CheckedData, ForData, ForEachData, IfData, LocalDeclarationData,
    LockData, LoopData, Modifiers, NodeKind, SwitchData, SwitchSectionData, TryData, TypeSyntax,
    UsingData, VariableDeclaratorData,
};
use super::state::ParserState;
use super::state_declarations::DeclarationPrefix;
use super::state_types::TypeContext;
use crate::scanner::SyntaxKind;

impl ParserState<'_> {
    pub(crate) fn parse_block(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.expect(SyntaxKind::OpenBrace);
        let statements = self.parse_statements_until_close_brace();
        self.expect(SyntaxKind::CloseBrace);
        self.finish_node(NodeKind::Block(BlockData { statements }), start)
    }

    fn parse_statements_until_close_brace(&mut self) -> NodeList {
        let mut statements = Vec::new();
        while !self.at(SyntaxKind::CloseBrace) && !self.at_eof() {
            let before = self.pos;
            let statement = self.parse_statement();
            if statement.is_some() {
                statements.push(statement);
            }
            if self.pos == before {
                self.error_at_current("statement expected".to_string());
                self.advance();
            }
        }
        statements
    }

    pub(crate) fn parse_statement(&mut self) -> NodeIndex {
        if !self.enter() {
            self.leave();
            self.skip_until(&[SyntaxKind::Semicolon, SyntaxKind::CloseBrace]);
            self.eat(SyntaxKind::Semicolon);
            return NodeIndex::NONE;
        }
        let result = self.parse_statement_inner();
        self.leave();
        result
    }

    fn parse_statement_inner(&mut self) -> NodeIndex {
        let start = self.token_start();
        match self.kind() {
            SyntaxKind::OpenBrace => self.parse_block(),
            SyntaxKind::Semicolon => {
                self.advance();
                self.finish_node(NodeKind::Empty, start)
            }
            SyntaxKind::IfKeyword => self.parse_if_statement(),
            SyntaxKind::WhileKeyword => self.parse_while_statement(),
            SyntaxKind::DoKeyword => self.parse_do_statement(),
            SyntaxKind::ForKeyword => self.parse_for_statement(),
            SyntaxKind::ForeachKeyword => self.parse_foreach_statement(),
            SyntaxKind::SwitchKeyword => self.parse_switch_statement(),
            SyntaxKind::TryKeyword => self.parse_try_statement(),
            SyntaxKind::ThrowKeyword => {
                self.advance();
                let operand = if self.at(SyntaxKind::Semicolon) {
                    NodeIndex::NONE
                } else {
                    self.parse_expression()
                };
                self.expect(SyntaxKind::Semicolon);
                self.finish_node(NodeKind::Throw(operand), start)
            }
            SyntaxKind::ReturnKeyword => {
                self.advance();
                let operand = if self.at(SyntaxKind::Semicolon) {
                    NodeIndex::NONE
                } else {
                    self.parse_expression()
                };
                self.expect(SyntaxKind::Semicolon);
                self.finish_node(NodeKind::Return(operand), start)
            }
            SyntaxKind::BreakKeyword => {
                self.advance();
                self.expect(SyntaxKind::Semicolon);
                self.finish_node(NodeKind::Break, start)
            }
            SyntaxKind::ContinueKeyword => {
                self.advance();
                self.expect(SyntaxKind::Semicolon);
                self.finish_node(NodeKind::Continue, start)
            }
            SyntaxKind::LockKeyword => {
                self.advance();
                self.expect(SyntaxKind::OpenParen);
                let expression = self.parse_expression();
                self.expect(SyntaxKind::CloseParen);
                let body = self.parse_statement();
                self.finish_node(NodeKind::Lock(LockData { expression, body }), start)
            }
            SyntaxKind::UsingKeyword if self.peek_kind(1) == SyntaxKind::OpenParen => {
                self.parse_using_statement()
            }
            SyntaxKind::UsingKeyword => {
                self.advance();
                match self.try_parse_local_declaration(start, true) {
                    Some(decl) => decl,
                    None => self.parse_expression_statement(start),
                }
            }
            SyntaxKind::CheckedKeyword | SyntaxKind::UncheckedKeyword
                if self.peek_kind(1) == SyntaxKind::OpenBrace =>
            {
                let checked = self.at(SyntaxKind::CheckedKeyword);
                self.advance();
                let inner = self.parse_block();
                self.finish_node(NodeKind::CheckedStatement(CheckedData { inner, checked }), start)
            }
            SyntaxKind::ConstKeyword => {
                self.advance();
                match self.try_parse_local_declaration(start, false) {
                    Some(decl) => {
                        if let Some(NodeKind::LocalDeclaration(data)) = self.arena.kind(decl) {
                            let mut data = data.clone();
                            data.is_const = true;
                            self.arena.set_kind(decl, NodeKind::LocalDeclaration(data));
                        }
                        decl
                    }
                    None => self.parse_expression_statement(start),
                }
            }
            SyntaxKind::OpenBracket => self.parse_local_function_with_prefix(),
            SyntaxKind::StaticKeyword => self.parse_local_function_with_prefix(),
            SyntaxKind::Identifier if self.current().text == "yield" => {
                self.parse_yield_statement()
            }
            SyntaxKind::Identifier
                if self.peek_kind(1) == SyntaxKind::Colon
                    && self.peek_kind(2) != SyntaxKind::Colon =>
            {
                // labeled statement: the label itself carries no flow
                self.advance();
                self.advance();
                self.parse_statement()
            }
            SyntaxKind::Identifier if self.current().text == "goto" => {
                self.skip_until(&[SyntaxKind::Semicolon]);
                self.eat(SyntaxKind::Semicolon);
                self.finish_node(NodeKind::Break, start)
            }
            _ => {
                if self.at_contextual("async")
                    && self.peek_kind(1) == SyntaxKind::Identifier
                    && self.peek_kind(2) == SyntaxKind::Identifier
                {
                    return self.parse_local_function_with_prefix();
                }
                if let Some(decl) = self.try_parse_local_declaration(start, false) {
                    return decl;
                }
                self.parse_expression_statement(start)
            }
        }
    }

    fn parse_expression_statement(&mut self, start: u32) -> NodeIndex {
        let expression = self.parse_expression();
        self.expect(SyntaxKind::Semicolon);
        self.finish_node(NodeKind::ExpressionStatement(expression), start)
    }

    /// `yield return e;` behaves like an expression statement, `yield break;` like `return;`.
    fn parse_yield_statement(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        if self.eat(SyntaxKind::BreakKeyword) {
            self.expect(SyntaxKind::Semicolon);
            return self.finish_node(NodeKind::Return(NodeIndex::NONE), start);
        }
        self.expect(SyntaxKind::ReturnKeyword);
        self.parse_expression_statement(start)
    }

    fn parse_local_function_with_prefix(&mut self) -> NodeIndex {
        let start = self.token_start();
        let doc = self.current().doc.clone();
        let attributes = self.parse_attribute_lists();
        let modifiers = self.parse_modifiers();
        let prefix = DeclarationPrefix {
            start,
            doc,
            attributes,
            modifiers,
        };
        let return_type = self.parse_type();
        let (name, name_span) = self.expect_identifier();
        self.parse_method_rest(prefix, return_type, name, name_span, true)
    }

    /// `Type name = init, other;` or a local function `Type Name(...) { }`.
    /// Restores the position and returns `None` when the tokens are an
    /// expression statement instead.
    fn try_parse_local_declaration(&mut self, start: u32, is_using: bool) -> Option<NodeIndex> {
        let snapshot = self.snapshot();
        let ty = self.try_parse_type(TypeContext::Declaration)?;
        if !self.at(SyntaxKind::Identifier) {
            self.restore(snapshot);
            return None;
        }
        match self.peek_kind(1) {
            SyntaxKind::Equals | SyntaxKind::Semicolon | SyntaxKind::Comma => {
                let declarators = self.parse_variable_declarators();
                self.expect(SyntaxKind::Semicolon);
                Some(self.finish_node(
                    NodeKind::LocalDeclaration(LocalDeclarationData {
                        ty,
                        declarators,
                        is_const: false,
                        is_using,
                    }),
                    start,
                ))
            }
            SyntaxKind::OpenParen | SyntaxKind::LessThan if !is_using => {
                let (name, name_span) = self.expect_identifier();
                let prefix = DeclarationPrefix {
                    start,
                    doc: None,
                    attributes: Vec::new(),
                    modifiers: Modifiers::empty(),
                };
                Some(self.parse_method_rest(prefix, ty, name, name_span, true))
            }
            _ => {
                self.restore(snapshot);
                None
            }
        }
    }

    fn parse_variable_declarators(&mut self) -> NodeList {
        let mut declarators = Vec::new();
        loop {
            let start = self.token_start();
            let (name, _) = self.expect_identifier();
            let initializer = if self.eat(SyntaxKind::Equals) {
                self.parse_variable_initializer()
            } else {
                NodeIndex::NONE
            };
            declarators.push(self.finish_node(
                NodeKind::VariableDeclarator(VariableDeclaratorData { name, initializer }),
                start,
            ));
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        declarators
    }

    fn parse_parenthesized_condition(&mut self) -> NodeIndex {
        self.expect(SyntaxKind::OpenParen);
        let condition = self.parse_expression();
        self.expect(SyntaxKind::CloseParen);
        condition
    }

    fn parse_if_statement(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        let condition = self.parse_parenthesized_condition();
        let then_statement = self.parse_statement();
        let else_statement = if self.eat(SyntaxKind::ElseKeyword) {
            self.parse_statement()
        } else {
            NodeIndex::NONE
        };
        self.finish_node(
            NodeKind::If(IfData {
                condition,
                then_statement,
                else_statement,
            }),
            start,
        )
    }

    fn parse_while_statement(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        let condition = self.parse_parenthesized_condition();
        let body = self.parse_statement();
        self.finish_node(NodeKind::While(LoopData { condition, body }), start)
    }

    fn parse_do_statement(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        let body = self.parse_statement();
        self.expect(SyntaxKind::WhileKeyword);
        let condition = self.parse_parenthesized_condition();
        self.expect(SyntaxKind::Semicolon);
        self.finish_node(NodeKind::Do(LoopData { condition, body }), start)
    }

    fn parse_for_statement(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        self.expect(SyntaxKind::OpenParen);

        let mut initializers = Vec::new();
        if !self.at(SyntaxKind::Semicolon) {
            let init_start = self.token_start();
            let snapshot = self.snapshot();
            let declaration = self
                .try_parse_type(TypeContext::Declaration)
                .filter(|_| {
                    self.at(SyntaxKind::Identifier)
                        && matches!(
                            self.peek_kind(1),
                            SyntaxKind::Equals | SyntaxKind::Comma | SyntaxKind::Semicolon
                        )
                });
            match declaration {
                Some(ty) => {
                    let declarators = self.parse_variable_declarators();
                    initializers.push(self.finish_node(
                        NodeKind::LocalDeclaration(LocalDeclarationData {
                            ty,
                            declarators,
                            is_const: false,
                            is_using: false,
                        }),
                        init_start,
                    ));
                }
                None => {
                    self.restore(snapshot);
                    initializers = self.parse_expression_list(SyntaxKind::Semicolon);
                }
            }
        }
        self.expect(SyntaxKind::Semicolon);
        let condition = if self.at(SyntaxKind::Semicolon) {
            NodeIndex::NONE
        } else {
            self.parse_expression()
        };
        self.expect(SyntaxKind::Semicolon);
        let incrementors = if self.at(SyntaxKind::CloseParen) {
            Vec::new()
        } else {
            self.parse_expression_list(SyntaxKind::CloseParen)
        };
        self.expect(SyntaxKind::CloseParen);
        let body = self.parse_statement();
        self.finish_node(
            NodeKind::For(ForData {
                initializers,
                condition,
                incrementors,
                body,
            }),
            start,
        )
    }

    fn parse_expression_list(&mut self, terminator: SyntaxKind) -> NodeList {
        let mut items = Vec::new();
        while !self.at(terminator) && !self.at_eof() {
            let before = self.pos;
            items.push(self.parse_expression());
            if self.pos == before || !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        items
    }

    fn parse_foreach_statement(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        self.expect(SyntaxKind::OpenParen);
        let (ty, name) = if self.at(SyntaxKind::OpenParen)
            || (self.at_contextual("var") && self.peek_kind(1) == SyntaxKind::OpenParen)
        {
            // deconstruction: `var (a, b)` / `(var a, var b)`
            let ty_start = self.token_start();
            self.eat_contextual("var");
            self.skip_balanced();
            (
                TypeSyntax::simple("var", exflow_common::Span::new(ty_start, self.prev_end())),
                String::new(),
            )
        } else {
            let ty = self.parse_type();
            let (name, _) = self.expect_identifier();
            (ty, name)
        };
        self.expect(SyntaxKind::InKeyword);
        let expression = self.parse_expression();
        self.expect(SyntaxKind::CloseParen);
        let body = self.parse_statement();
        self.finish_node(
            NodeKind::ForEach(ForEachData {
                ty,
                name,
                expression,
                body,
            }),
            start,
        )
    }

    fn parse_switch_statement(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        let expression = self.parse_parenthesized_condition();
        self.expect(SyntaxKind::OpenBrace);
        let mut sections = Vec::new();
        while !self.at(SyntaxKind::CloseBrace) && !self.at_eof() {
            let before = self.pos;
            if self.at(SyntaxKind::CaseKeyword) || self.at(SyntaxKind::DefaultKeyword) {
                sections.push(self.parse_switch_section());
            }
            if self.pos == before {
                self.error_at_current("'case' or 'default' expected".to_string());
                self.advance();
            }
        }
        self.expect(SyntaxKind::CloseBrace);
        self.finish_node(NodeKind::Switch(SwitchData { expression, sections }), start)
    }

    fn parse_switch_section(&mut self) -> NodeIndex {
        let start = self.token_start();
        let mut labels = Vec::new();
        let mut is_default = false;
        loop {
            if self.eat(SyntaxKind::DefaultKeyword) {
                is_default = true;
                self.expect(SyntaxKind::Colon);
            } else if self.eat(SyntaxKind::CaseKeyword) {
                labels.push(self.parse_case_label());
                if self.eat_contextual("when") {
                    labels.push(self.parse_expression());
                }
                self.expect(SyntaxKind::Colon);
            } else {
                break;
            }
        }
        let mut statements = Vec::new();
        while !matches!(
            self.kind(),
            SyntaxKind::CaseKeyword | SyntaxKind::DefaultKeyword | SyntaxKind::CloseBrace
        ) && !self.at_eof()
        {
            let before = self.pos;
            let statement = self.parse_statement();
            if statement.is_some() {
                statements.push(statement);
            }
            if self.pos == before {
                self.advance();
            }
        }
        self.finish_node(
            NodeKind::SwitchSection(SwitchSectionData {
                labels,
                is_default,
                statements,
            }),
            start,
        )
    }

    /// `case 1:`, `case "a":`, `case Foo f:`, `case null:`.
    fn parse_case_label(&mut self) -> NodeIndex {
        let snapshot = self.snapshot();
        if self.try_parse_type(TypeContext::Expression).is_some()
            && (self.at(SyntaxKind::Identifier) && !self.at_contextual("when"))
        {
            // type pattern with designation; only the declaration is introduced
            let start = self.token_start();
            self.advance();
            return self.finish_node(NodeKind::Empty, start);
        }
        self.restore(snapshot);
        self.parse_conditional_expression()
    }

    fn parse_try_statement(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        let block = self.parse_block();
        let mut catches = Vec::new();
        while self.at(SyntaxKind::CatchKeyword) {
            catches.push(self.parse_catch_clause());
        }
        let finally_block = if self.eat(SyntaxKind::FinallyKeyword) {
            self.parse_block()
        } else {
            NodeIndex::NONE
        };
        if catches.is_empty() && finally_block.is_none() {
            self.error_at_current("'catch' or 'finally' expected".to_string());
        }
        self.finish_node(
            NodeKind::Try(TryData {
                block,
                catches,
                finally_block,
            }),
            start,
        )
    }

    fn parse_catch_clause(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        let mut ty = None;
        let mut name = None;
        if self.eat(SyntaxKind::OpenParen) {
            ty = Some(self.parse_type());
            if self.at(SyntaxKind::Identifier) {
                name = Some(self.expect_identifier().0);
            }
            self.expect(SyntaxKind::CloseParen);
        }
        let filter = if self.eat_contextual("when") {
            self.parse_parenthesized_condition()
        } else {
            NodeIndex::NONE
        };
        let block = self.parse_block();
        self.finish_node(
            NodeKind::Catch(CatchData {
                ty,
                name,
                filter,
                block,
            }),
            start,
        )
    }

    fn parse_using_statement(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        self.expect(SyntaxKind::OpenParen);
        let resource_start = self.token_start();
        let snapshot = self.snapshot();
        let resource = match self.try_parse_type(TypeContext::Declaration) {
            Some(ty)
                if self.at(SyntaxKind::Identifier)
                    && self.peek_kind(1) == SyntaxKind::Equals =>
            {
                let declarators = self.parse_variable_declarators();
                self.finish_node(
                    NodeKind::LocalDeclaration(LocalDeclarationData {
                        ty,
                        declarators,
                        is_const: false,
                        is_using: true,
                    }),
                    resource_start,
                )
            }
            _ => {
                self.restore(snapshot);
                self.parse_expression()
            }
        };
        self.expect(SyntaxKind::CloseParen);
        let body = self.parse_statement();
        self.finish_node(NodeKind::Using(UsingData { resource, body }), start)
    }
}
