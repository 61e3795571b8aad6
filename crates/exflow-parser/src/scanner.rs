//! Tokenizer for the analysed language subset.
//!
//! The scanner turns the whole file into a token vector up front so the
//! parser can look ahead and backtrack freely when disambiguating casts,
//! generic arguments, lambdas and local declarations.
//!
//! Trivia handling:
//! - `///` lines are accumulated and attached to the next token as its doc
//!   comment text (without the leading slashes).
//! - `#nullable enable|disable` directives are recorded; every other
//!   preprocessor line is skipped.

use exflow_common::Span;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Identifier,
    IntegerLiteral,
    RealLiteral,
    StringLiteral,
    CharLiteral,

    // Keywords
    AbstractKeyword,
    AsKeyword,
    BaseKeyword,
    BreakKeyword,
    CaseKeyword,
    CatchKeyword,
    CheckedKeyword,
    ClassKeyword,
    ConstKeyword,
    ContinueKeyword,
    DefaultKeyword,
    DoKeyword,
    ElseKeyword,
    EventKeyword,
    ExternKeyword,
    FalseKeyword,
    FinallyKeyword,
    ForKeyword,
    ForeachKeyword,
    IfKeyword,
    InKeyword,
    InterfaceKeyword,
    InternalKeyword,
    IsKeyword,
    LockKeyword,
    NamespaceKeyword,
    NewKeyword,
    NullKeyword,
    OutKeyword,
    OverrideKeyword,
    ParamsKeyword,
    PrivateKeyword,
    ProtectedKeyword,
    PublicKeyword,
    ReadonlyKeyword,
    RefKeyword,
    ReturnKeyword,
    SealedKeyword,
    StaticKeyword,
    StructKeyword,
    SwitchKeyword,
    ThisKeyword,
    ThrowKeyword,
    TrueKeyword,
    TryKeyword,
    TypeofKeyword,
    UncheckedKeyword,
    UsingKeyword,
    VirtualKeyword,
    WhileKeyword,

    // Punctuation
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Semicolon,
    Comma,
    Dot,
    QuestionDot,
    Question,
    QuestionQuestion,
    QuestionQuestionEquals,
    Colon,
    ColonColon,
    Arrow,
    Equals,
    EqualsEquals,
    ExclamationEquals,
    LessThan,
    GreaterThan,
    LessThanEquals,
    GreaterThanEquals,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    AmpersandAmpersand,
    BarBar,
    Exclamation,
    Tilde,
    Ampersand,
    Bar,
    Caret,
    LessThanLessThan,
    PlusEquals,
    MinusEquals,
    AsteriskEquals,
    SlashEquals,
    PercentEquals,
    AmpersandEquals,
    BarEquals,
    CaretEquals,

    Unknown,
    EndOfFile,
}

impl SyntaxKind {
    pub fn keyword_from_text(text: &str) -> Option<SyntaxKind> {
        use SyntaxKind::*;
        Some(match text {
            "abstract" => AbstractKeyword,
            "as" => AsKeyword,
            "base" => BaseKeyword,
            "break" => BreakKeyword,
            "case" => CaseKeyword,
            "catch" => CatchKeyword,
            "checked" => CheckedKeyword,
            "class" => ClassKeyword,
            "const" => ConstKeyword,
            "continue" => ContinueKeyword,
            "default" => DefaultKeyword,
            "do" => DoKeyword,
            "else" => ElseKeyword,
            "event" => EventKeyword,
            "extern" => ExternKeyword,
            "false" => FalseKeyword,
            "finally" => FinallyKeyword,
            "for" => ForKeyword,
            "foreach" => ForeachKeyword,
            "if" => IfKeyword,
            "in" => InKeyword,
            "interface" => InterfaceKeyword,
            "internal" => InternalKeyword,
            "is" => IsKeyword,
            "lock" => LockKeyword,
            "namespace" => NamespaceKeyword,
            "new" => NewKeyword,
            "null" => NullKeyword,
            "out" => OutKeyword,
            "override" => OverrideKeyword,
            "params" => ParamsKeyword,
            "private" => PrivateKeyword,
            "protected" => ProtectedKeyword,
            "public" => PublicKeyword,
            "readonly" => ReadonlyKeyword,
            "ref" => RefKeyword,
            "return" => ReturnKeyword,
            "sealed" => SealedKeyword,
            "static" => StaticKeyword,
            "struct" => StructKeyword,
            "switch" => SwitchKeyword,
            "this" => ThisKeyword,
            "throw" => ThrowKeyword,
            "true" => TrueKeyword,
            "try" => TryKeyword,
            "typeof" => TypeofKeyword,
            "unchecked" => UncheckedKeyword,
            "using" => UsingKeyword,
            "virtual" => VirtualKeyword,
            "while" => WhileKeyword,
            _ => return None,
        })
    }

    /// Predefined type keywords are scanned as identifiers; this tells them apart.
    pub fn is_predefined_type_name(text: &str) -> bool {
        matches!(
            text,
            "bool"
                | "byte"
                | "sbyte"
                | "short"
                | "ushort"
                | "int"
                | "uint"
                | "long"
                | "ulong"
                | "float"
                | "double"
                | "decimal"
                | "char"
                | "string"
                | "object"
                | "void"
        )
    }

    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            SyntaxKind::PublicKeyword
                | SyntaxKind::PrivateKeyword
                | SyntaxKind::ProtectedKeyword
                | SyntaxKind::InternalKeyword
                | SyntaxKind::StaticKeyword
                | SyntaxKind::AbstractKeyword
                | SyntaxKind::VirtualKeyword
                | SyntaxKind::OverrideKeyword
                | SyntaxKind::SealedKeyword
                | SyntaxKind::ReadonlyKeyword
                | SyntaxKind::ConstKeyword
                | SyntaxKind::ExternKeyword
                | SyntaxKind::NewKeyword
        )
    }
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: SyntaxKind,
    pub span: Span,
    pub text: String,
    /// Text of the `///` comment block immediately preceding this token.
    pub doc: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ScanDiagnostic {
    pub span: Span,
    pub message: String,
}

pub struct ScanResult {
    pub tokens: Vec<Token>,
    pub nullable_enabled: bool,
    pub diagnostics: Vec<ScanDiagnostic>,
}

pub struct ScannerState<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    pending_doc: Option<String>,
    nullable_enabled: bool,
    diagnostics: Vec<ScanDiagnostic>,
}

impl<'a> ScannerState<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            pending_doc: None,
            nullable_enabled: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn scan_all(mut self) -> ScanResult {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token();
            let done = token.kind == SyntaxKind::EndOfFile;
            tokens.push(token);
            if done {
                break;
            }
        }
        ScanResult {
            tokens,
            nullable_enabled: self.nullable_enabled,
            diagnostics: self.diagnostics,
        }
    }

    fn peek_byte(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn skip_trivia(&mut self) {
        let mut at_line_start = self.pos == 0;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            match b {
                b'\n' => {
                    self.pos += 1;
                    at_line_start = true;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'/' if self.peek_byte(1) == b'/' => {
                    let line_end = self.line_end();
                    if self.peek_byte(2) == b'/' && self.peek_byte(3) != b'/' {
                        let content = &self.text[self.pos + 3..line_end];
                        let doc = self.pending_doc.get_or_insert_with(String::new);
                        if !doc.is_empty() {
                            doc.push('\n');
                        }
                        doc.push_str(content.trim_end_matches('\r'));
                    }
                    self.pos = line_end;
                }
                b'/' if self.peek_byte(1) == b'*' => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        if self.pos >= self.bytes.len() {
                            self.diagnostics.push(ScanDiagnostic {
                                span: Span::new(start as u32, self.pos as u32),
                                message: "unterminated block comment".to_string(),
                            });
                            break;
                        }
                        if self.bytes[self.pos] == b'*' && self.peek_byte(1) == b'/' {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                b'#' if at_line_start => {
                    let line_end = self.line_end();
                    let directive = self.text[self.pos + 1..line_end].trim();
                    if let Some(rest) = directive.strip_prefix("nullable") {
                        match rest.trim() {
                            "enable" => self.nullable_enabled = true,
                            "disable" => self.nullable_enabled = false,
                            _ => {}
                        }
                    }
                    self.pos = line_end;
                }
                _ => break,
            }
        }
    }

    fn line_end(&self) -> usize {
        self.text[self.pos..]
            .find('\n')
            .map_or(self.text.len(), |offset| self.pos + offset)
    }

    fn scan_token(&mut self) -> Token {
        self.skip_trivia();
        let start = self.pos;
        if self.pos >= self.bytes.len() {
            return self.make(SyntaxKind::EndOfFile, start);
        }

        let b = self.bytes[self.pos];
        if b == b'@' && self.peek_byte(1) == b'"' {
            self.pos += 1;
            return self.scan_verbatim_string(start);
        }
        if b == b'$' && (self.peek_byte(1) == b'"' || self.peek_byte(1) == b'@') {
            self.pos += 1;
            if self.peek_byte(0) == b'@' {
                self.pos += 1;
                return self.scan_verbatim_string(start);
            }
            return self.scan_string(start);
        }
        if b == b'@' && is_identifier_start(self.peek_byte(1)) {
            self.pos += 1;
            let ident_start = self.pos;
            while self.pos < self.bytes.len() && is_identifier_part(self.bytes[self.pos]) {
                self.pos += 1;
            }
            let mut token = self.make(SyntaxKind::Identifier, start);
            token.text = self.text[ident_start..self.pos].to_string();
            return token;
        }
        if is_identifier_start(b) {
            while self.pos < self.bytes.len() && is_identifier_part(self.bytes[self.pos]) {
                self.pos += 1;
            }
            let word = &self.text[start..self.pos];
            let kind = SyntaxKind::keyword_from_text(word).unwrap_or(SyntaxKind::Identifier);
            return self.make(kind, start);
        }
        if b.is_ascii_digit() || (b == b'.' && self.peek_byte(1).is_ascii_digit()) {
            return self.scan_number(start);
        }
        if b == b'"' {
            return self.scan_string(start);
        }
        if b == b'\'' {
            return self.scan_char(start);
        }

        let (kind, len) = self.scan_punctuation();
        self.pos += len;
        if kind == SyntaxKind::Unknown {
            self.diagnostics.push(ScanDiagnostic {
                span: Span::new(start as u32, self.pos as u32),
                message: format!("invalid character '{}'", self.text[start..self.pos].trim()),
            });
        }
        self.make(kind, start)
    }

    fn scan_punctuation(&self) -> (SyntaxKind, usize) {
        use SyntaxKind::*;
        let b0 = self.peek_byte(0);
        let b1 = self.peek_byte(1);
        let b2 = self.peek_byte(2);
        match (b0, b1, b2) {
            (b'?', b'?', b'=') => (QuestionQuestionEquals, 3),
            (b'?', b'?', _) => (QuestionQuestion, 2),
            (b'?', b'.', d) if !d.is_ascii_digit() => (QuestionDot, 2),
            (b'?', _, _) => (Question, 1),
            (b'=', b'>', _) => (Arrow, 2),
            (b'=', b'=', _) => (EqualsEquals, 2),
            (b'=', _, _) => (Equals, 1),
            (b'!', b'=', _) => (ExclamationEquals, 2),
            (b'!', _, _) => (Exclamation, 1),
            (b'<', b'<', _) => (LessThanLessThan, 2),
            (b'<', b'=', _) => (LessThanEquals, 2),
            (b'<', _, _) => (LessThan, 1),
            (b'>', b'=', _) => (GreaterThanEquals, 2),
            // `>>` is composed by the expression parser so generic argument
            // lists like `List<List<int>>` close cleanly.
            (b'>', _, _) => (GreaterThan, 1),
            (b'+', b'+', _) => (PlusPlus, 2),
            (b'+', b'=', _) => (PlusEquals, 2),
            (b'+', _, _) => (Plus, 1),
            (b'-', b'-', _) => (MinusMinus, 2),
            (b'-', b'=', _) => (MinusEquals, 2),
            (b'-', _, _) => (Minus, 1),
            (b'*', b'=', _) => (AsteriskEquals, 2),
            (b'*', _, _) => (Asterisk, 1),
            (b'/', b'=', _) => (SlashEquals, 2),
            (b'/', _, _) => (Slash, 1),
            (b'%', b'=', _) => (PercentEquals, 2),
            (b'%', _, _) => (Percent, 1),
            (b'&', b'&', _) => (AmpersandAmpersand, 2),
            (b'&', b'=', _) => (AmpersandEquals, 2),
            (b'&', _, _) => (Ampersand, 1),
            (b'|', b'|', _) => (BarBar, 2),
            (b'|', b'=', _) => (BarEquals, 2),
            (b'|', _, _) => (Bar, 1),
            (b'^', b'=', _) => (CaretEquals, 2),
            (b'^', _, _) => (Caret, 1),
            (b'~', _, _) => (Tilde, 1),
            (b':', b':', _) => (ColonColon, 2),
            (b':', _, _) => (Colon, 1),
            (b'{', _, _) => (OpenBrace, 1),
            (b'}', _, _) => (CloseBrace, 1),
            (b'(', _, _) => (OpenParen, 1),
            (b')', _, _) => (CloseParen, 1),
            (b'[', _, _) => (OpenBracket, 1),
            (b']', _, _) => (CloseBracket, 1),
            (b';', _, _) => (Semicolon, 1),
            (b',', _, _) => (Comma, 1),
            (b'.', _, _) => (Dot, 1),
            _ => (Unknown, self.text[self.pos..].chars().next().map_or(1, char::len_utf8)),
        }
    }

    fn scan_number(&mut self, start: usize) -> Token {
        let mut kind = SyntaxKind::IntegerLiteral;
        if self.peek_byte(0) == b'0' && matches!(self.peek_byte(1), b'x' | b'X') {
            self.pos += 2;
            while self.peek_byte(0).is_ascii_hexdigit() || self.peek_byte(0) == b'_' {
                self.pos += 1;
            }
        } else {
            while self.peek_byte(0).is_ascii_digit() || self.peek_byte(0) == b'_' {
                self.pos += 1;
            }
            if self.peek_byte(0) == b'.' && self.peek_byte(1).is_ascii_digit() {
                kind = SyntaxKind::RealLiteral;
                self.pos += 1;
                while self.peek_byte(0).is_ascii_digit() || self.peek_byte(0) == b'_' {
                    self.pos += 1;
                }
            }
            if matches!(self.peek_byte(0), b'e' | b'E') {
                kind = SyntaxKind::RealLiteral;
                self.pos += 1;
                if matches!(self.peek_byte(0), b'+' | b'-') {
                    self.pos += 1;
                }
                while self.peek_byte(0).is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }
        match self.peek_byte(0) {
            b'm' | b'M' | b'd' | b'D' | b'f' | b'F' => {
                kind = SyntaxKind::RealLiteral;
                self.pos += 1;
            }
            b'u' | b'U' | b'l' | b'L' => {
                self.pos += 1;
                if matches!(self.peek_byte(0), b'u' | b'U' | b'l' | b'L') {
                    self.pos += 1;
                }
            }
            _ => {}
        }
        self.make(kind, start)
    }

    fn scan_string(&mut self, start: usize) -> Token {
        // positioned on the opening quote
        self.pos += 1;
        loop {
            match self.peek_byte(0) {
                0 if self.pos >= self.bytes.len() => {
                    self.unterminated(start, "string literal");
                    break;
                }
                b'\n' => {
                    self.unterminated(start, "string literal");
                    break;
                }
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
        self.make(SyntaxKind::StringLiteral, start)
    }

    fn scan_verbatim_string(&mut self, start: usize) -> Token {
        // positioned on the opening quote
        self.pos += 1;
        loop {
            if self.pos >= self.bytes.len() {
                self.unterminated(start, "verbatim string literal");
                break;
            }
            if self.bytes[self.pos] == b'"' {
                if self.peek_byte(1) == b'"' {
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                break;
            }
            self.pos += 1;
        }
        self.make(SyntaxKind::StringLiteral, start)
    }

    fn scan_char(&mut self, start: usize) -> Token {
        self.pos += 1;
        loop {
            match self.peek_byte(0) {
                0 if self.pos >= self.bytes.len() => {
                    self.unterminated(start, "character literal");
                    break;
                }
                b'\n' => {
                    self.unterminated(start, "character literal");
                    break;
                }
                b'\\' => self.pos += 2,
                b'\'' => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
        self.make(SyntaxKind::CharLiteral, start)
    }

    fn unterminated(&mut self, start: usize, what: &str) {
        self.diagnostics.push(ScanDiagnostic {
            span: Span::new(start as u32, self.pos as u32),
            message: format!("unterminated {what}"),
        });
    }

    fn make(&mut self, kind: SyntaxKind, start: usize) -> Token {
        Token {
            kind,
            span: Span::new(start as u32, self.pos as u32),
            text: self.text[start..self.pos].to_string(),
            doc: self.pending_doc.take(),
        }
    }
}

fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_identifier_part(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<SyntaxKind> {
        ScannerState::new(source)
            .scan_all()
            .tokens
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_operators_and_keywords() {
        use SyntaxKind::*;
        assert_eq!(
            kinds("x ??= y?.z => throw;"),
            vec![
                Identifier,
                QuestionQuestionEquals,
                Identifier,
                QuestionDot,
                Identifier,
                Arrow,
                ThrowKeyword,
                Semicolon,
                EndOfFile
            ]
        );
    }

    #[test]
    fn attaches_doc_comments_to_next_token() {
        let result = ScannerState::new(
            "/// <summary>Parses.</summary>\n/// <exception cref=\"FormatException\"/>\npublic int Parse();",
        )
        .scan_all();
        let doc = result.tokens[0].doc.as_deref().unwrap_or_default();
        assert!(doc.contains("<summary>Parses.</summary>"));
        assert!(doc.contains("cref=\"FormatException\""));
        assert!(result.tokens[1].doc.is_none());
    }

    #[test]
    fn records_nullable_directive() {
        let result = ScannerState::new("#nullable enable\nclass C {}").scan_all();
        assert!(result.nullable_enabled);
        assert_eq!(result.tokens[0].kind, SyntaxKind::ClassKeyword);
    }

    #[test]
    fn decimal_suffix_is_real_literal() {
        assert_eq!(
            kinds("1.5m 300 0xFF 2L"),
            vec![
                SyntaxKind::RealLiteral,
                SyntaxKind::IntegerLiteral,
                SyntaxKind::IntegerLiteral,
                SyntaxKind::IntegerLiteral,
                SyntaxKind::EndOfFile
            ]
        );
    }
}
