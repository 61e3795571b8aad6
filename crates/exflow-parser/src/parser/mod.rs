//! Recursive-descent parser producing the node arena.

mod base;
pub use base::{NodeIndex, NodeList};

pub mod node;
pub use node::*;

mod node_access;
pub use node_access::Ancestors;

mod node_arena;

mod state;
pub use state::{ParseDiagnostic, ParseResult, ParserState, parse_source_file};

mod state_declarations;
mod state_expressions;
mod state_statements;
mod state_types;
