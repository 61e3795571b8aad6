//! Front end for the exflow analyzer.
//!
//! Parses the analysed C#-like subset into a [`NodeArena`]: a single arena
//! shared by every file of an analysis, with parent links, spans and the
//! `///` documentation comment attached to each declaration.

pub mod scanner;
pub use scanner::{SyntaxKind, Token};

pub mod parser;
pub use parser::{
    NodeArena, NodeIndex, NodeKind, NodeList, ParseDiagnostic, ParseResult, TypeSyntax,
    parse_source_file,
};
