//! Centralized limits and thresholds for the analyzer.
//!
//! These guard recursive walks over user-controlled structure (nesting depth,
//! inheritance chains, alias chains) so that malformed or adversarial input
//! degrades to "nothing provable" instead of overflowing the stack.

/// Maximum nesting depth the parser accepts for statements and expressions.
///
/// Deeper input is reported as a parse diagnostic and the remainder of the
/// construct is skipped.
pub const MAX_PARSER_DEPTH: u32 = 400;

/// Maximum number of base types walked when testing nominal subtyping.
///
/// Cyclic `class A : B` / `class B : A` declarations would otherwise loop
/// forever; the walk answers "not a subtype" once the limit is hit.
pub const MAX_BASE_CHAIN_DEPTH: u32 = 64;

/// Maximum depth for expression typing and escape collection.
pub const MAX_EXPR_DEPTH: u32 = 256;

/// Maximum number of local-alias hops followed when walking a deferred
/// pipeline backwards (`var a = xs.Where(..); var b = a; b.First()`).
pub const MAX_PIPELINE_ALIAS_HOPS: u32 = 16;

/// Maximum number of pipeline stages walked from one terminal operation.
pub const MAX_PIPELINE_STAGES: u32 = 128;
