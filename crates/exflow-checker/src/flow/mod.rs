//! Control-flow exception propagation.
//!
//! Statements are folded in order, tracking which exception types can
//! leave each construct and whether control can reach its end. Handlers
//! subtract what they catch; dead regions are reported as they are found.

mod flow_result;
mod statements;
mod try_catch;

pub use flow_result::{EscapeSet, FlowResult};

#[cfg(test)]
#[path = "../../tests/flow_escape_tests.rs"]
mod tests;
