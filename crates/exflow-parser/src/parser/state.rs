//! Parser state and token-stream helpers.
//!
//! The parser is a hand-written recursive-descent parser over the token
//! vector produced by [`ScannerState`]. Speculative parses (casts, generic
//! argument lists, local declarations) save the token position and restore
//! it on failure.

use super::base::NodeIndex;
use super::node::{NodeArena, NodeKind, SourceFileData};
use crate::scanner::{ScannerState, SyntaxKind, Token};
use exflow_common::limits::MAX_PARSER_DEPTH;
use exflow_common::{FileId, Span};
use std::sync::Arc;
use tracing::{debug, trace};

/// A syntax error. Parsing always continues past it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub file: FileId,
    pub span: Span,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct ParseResult {
    pub file: FileId,
    pub root: NodeIndex,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Parse `text` into `arena` as a new file.
pub fn parse_source_file(
    arena: &mut NodeArena,
    file_name: &str,
    text: impl Into<Arc<str>>,
    is_library: bool,
) -> ParseResult {
    let text: Arc<str> = text.into();
    let file = arena.add_file(file_name, Arc::clone(&text), is_library);
    let scan = ScannerState::new(&text).scan_all();
    let mut diagnostics: Vec<ParseDiagnostic> = scan
        .diagnostics
        .into_iter()
        .map(|d| ParseDiagnostic {
            file,
            span: d.span,
            message: d.message,
        })
        .collect();

    let mut state = ParserState {
        arena: &mut *arena,
        file,
        tokens: scan.tokens,
        pos: 0,
        diagnostics: Vec::new(),
        depth: 0,
        type_names: Vec::new(),
    };
    let root = state.parse_compilation_unit();
    diagnostics.append(&mut state.diagnostics);
    diagnostics.sort_by_key(|d| d.span.start);

    debug!(
        file = file_name,
        nodes = arena.len(),
        errors = diagnostics.len(),
        "parsed source file"
    );
    arena.finish_file(file, root, scan.nullable_enabled);
    ParseResult {
        file,
        root,
        diagnostics,
    }
}

pub struct ParserState<'a> {
    pub(crate) arena: &'a mut NodeArena,
    pub(crate) file: FileId,
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) diagnostics: Vec<ParseDiagnostic>,
    pub(crate) depth: u32,
    /// Names of the enclosing type declarations, innermost last.
    pub(crate) type_names: Vec<String>,
}

impl ParserState<'_> {
    // =========================================================================
    // Token helpers
    // =========================================================================

    #[inline]
    pub(crate) fn current(&self) -> &Token {
        // The token vector always ends with EndOfFile.
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    #[inline]
    pub(crate) fn kind(&self) -> SyntaxKind {
        self.current().kind
    }

    #[inline]
    pub(crate) fn peek(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    #[inline]
    pub(crate) fn peek_kind(&self, n: usize) -> SyntaxKind {
        self.peek(n).kind
    }

    #[inline]
    pub(crate) fn at(&self, kind: SyntaxKind) -> bool {
        self.kind() == kind
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.at(SyntaxKind::EndOfFile)
    }

    /// Current token is the identifier `text` (contextual keyword).
    pub(crate) fn at_contextual(&self, text: &str) -> bool {
        self.at(SyntaxKind::Identifier) && self.current().text == text
    }

    pub(crate) fn advance(&mut self) {
        if !self.at_eof() {
            self.pos += 1;
        }
    }

    pub(crate) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_contextual(&mut self, text: &str) -> bool {
        if self.at_contextual(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        let found = self.current().text.clone();
        self.error_at_current(format!("expected {kind:?}, found '{found}'"));
        false
    }

    /// Consume an identifier and return its text.
    pub(crate) fn expect_identifier(&mut self) -> (String, Span) {
        if self.at(SyntaxKind::Identifier) {
            let token = self.current();
            let result = (token.text.clone(), token.span);
            self.advance();
            return result;
        }
        self.error_at_current("identifier expected".to_string());
        (String::new(), Span::at(self.token_start()))
    }

    pub(crate) fn token_start(&self) -> u32 {
        self.current().span.start
    }

    /// End offset of the previously consumed token.
    pub(crate) fn prev_end(&self) -> u32 {
        if self.pos == 0 {
            0
        } else {
            self.tokens[(self.pos - 1).min(self.tokens.len() - 1)].span.end
        }
    }

    pub(crate) fn error_at_current(&mut self, message: String) {
        let span = self.current().span;
        trace!(pos = span.start, %message, "parse error");
        // One diagnostic per position keeps cascades readable.
        if self.diagnostics.last().is_some_and(|d| d.span.start == span.start) {
            return;
        }
        self.diagnostics.push(ParseDiagnostic {
            file: self.file,
            span,
            message,
        });
    }

    // =========================================================================
    // Node helpers
    // =========================================================================

    /// Allocate a node spanning from `start` to the end of the last consumed token.
    pub(crate) fn finish_node(&mut self, kind: NodeKind, start: u32) -> NodeIndex {
        let end = self.prev_end().max(start);
        self.arena.add_node(kind, Span::new(start, end), self.file)
    }

    pub(crate) fn missing_node(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.arena
            .add_node(NodeKind::Missing, Span::at(start), self.file)
    }

    // =========================================================================
    // Speculation and recursion guards
    // =========================================================================

    pub(crate) fn snapshot(&self) -> (usize, usize) {
        (self.pos, self.diagnostics.len())
    }

    pub(crate) fn restore(&mut self, snapshot: (usize, usize)) {
        self.pos = snapshot.0;
        self.diagnostics.truncate(snapshot.1);
    }

    /// Enter a nested construct; `false` when the depth limit is exceeded.
    pub(crate) fn enter(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            self.error_at_current("nesting too deep".to_string());
            return false;
        }
        true
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Skip tokens until one of `kinds` (or EOF), tracking brace nesting.
    pub(crate) fn skip_until(&mut self, kinds: &[SyntaxKind]) {
        let mut depth = 0u32;
        while !self.at_eof() {
            let kind = self.kind();
            if depth == 0 && kinds.contains(&kind) {
                return;
            }
            match kind {
                SyntaxKind::OpenBrace | SyntaxKind::OpenParen | SyntaxKind::OpenBracket => {
                    depth += 1
                }
                SyntaxKind::CloseBrace | SyntaxKind::CloseParen | SyntaxKind::CloseBracket => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip a balanced `(...)`, `[...]` or `{...}` group starting at the current token.
    pub(crate) fn skip_balanced(&mut self) {
        let (open, close) = match self.kind() {
            SyntaxKind::OpenParen => (SyntaxKind::OpenParen, SyntaxKind::CloseParen),
            SyntaxKind::OpenBracket => (SyntaxKind::OpenBracket, SyntaxKind::CloseBracket),
            SyntaxKind::OpenBrace => (SyntaxKind::OpenBrace, SyntaxKind::CloseBrace),
            _ => return,
        };
        let mut depth = 0u32;
        while !self.at_eof() {
            let kind = self.kind();
            self.advance();
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }
    }

    /// Index of the token matching the bracket at `from` (token index).
    pub(crate) fn matching_close(&self, from: usize) -> Option<usize> {
        let open = self.tokens.get(from)?.kind;
        let close = match open {
            SyntaxKind::OpenParen => SyntaxKind::CloseParen,
            SyntaxKind::OpenBracket => SyntaxKind::CloseBracket,
            SyntaxKind::OpenBrace => SyntaxKind::CloseBrace,
            _ => return None,
        };
        let mut depth = 0u32;
        for (i, token) in self.tokens.iter().enumerate().skip(from) {
            if token.kind == open {
                depth += 1;
            } else if token.kind == close {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            } else if token.kind == SyntaxKind::EndOfFile {
                return None;
            }
        }
        None
    }

    // =========================================================================
    // Compilation unit
    // =========================================================================

    pub(crate) fn parse_compilation_unit(&mut self) -> NodeIndex {
        let start = self.token_start();
        let mut members = Vec::new();
        self.parse_namespace_members(&mut members, true);
        let end = self.tokens.last().map_or(start, |t| t.span.end);
        self.arena.add_node(
            NodeKind::SourceFile(SourceFileData { members }),
            Span::new(0, end),
            self.file,
        )
    }

    /// Parse using directives, namespaces and type declarations until `}` or EOF.
    pub(crate) fn parse_namespace_members(&mut self, members: &mut Vec<NodeIndex>, top_level: bool) {
        loop {
            match self.kind() {
                SyntaxKind::EndOfFile => return,
                SyntaxKind::CloseBrace if !top_level => return,
                SyntaxKind::CloseBrace => {
                    self.error_at_current("unexpected '}'".to_string());
                    self.advance();
                }
                SyntaxKind::UsingKeyword => {
                    self.skip_until(&[SyntaxKind::Semicolon]);
                    self.eat(SyntaxKind::Semicolon);
                }
                SyntaxKind::NamespaceKeyword => {
                    let ns = self.parse_namespace();
                    if ns.is_some() {
                        members.push(ns);
                    }
                }
                SyntaxKind::OpenBracket if self.is_assembly_attribute() => self.skip_balanced(),
                _ => {
                    let before = self.pos;
                    let member = self.parse_member_declaration();
                    if member.is_some() {
                        members.push(member);
                    }
                    if self.pos == before {
                        self.error_at_current("declaration expected".to_string());
                        self.advance();
                    }
                }
            }
        }
    }

    fn is_assembly_attribute(&self) -> bool {
        self.peek_kind(1) == SyntaxKind::Identifier
            && matches!(self.peek(1).text.as_str(), "assembly" | "module")
            && self.peek_kind(2) == SyntaxKind::Colon
    }

    fn parse_namespace(&mut self) -> NodeIndex {
        let start = self.token_start();
        self.advance();
        let mut name = self.expect_identifier().0;
        while self.eat(SyntaxKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_identifier().0);
        }
        let mut members = Vec::new();
        if self.eat(SyntaxKind::Semicolon) {
            // file-scoped namespace: everything that follows belongs to it
            self.parse_namespace_members(&mut members, true);
        } else {
            self.expect(SyntaxKind::OpenBrace);
            self.parse_namespace_members(&mut members, false);
            self.expect(SyntaxKind::CloseBrace);
        }
        self.finish_node(
            NodeKind::Namespace(super::node::NamespaceData { name, members }),
            start,
        )
    }
}
