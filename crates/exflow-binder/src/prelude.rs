//! Embedded library prelude, parsed once per process.

use exflow_parser::{NodeArena, ParseDiagnostic, parse_source_file};
use once_cell::sync::Lazy;
use tracing::warn;

pub const PRELUDE_FILE_NAME: &str = "<prelude>";

static PRELUDE_SOURCE: &str = include_str!("prelude.cs");

struct ParsedPrelude {
    arena: NodeArena,
    diagnostics: Vec<ParseDiagnostic>,
}

static PRELUDE: Lazy<ParsedPrelude> = Lazy::new(|| {
    let mut arena = NodeArena::new();
    let result = parse_source_file(&mut arena, PRELUDE_FILE_NAME, PRELUDE_SOURCE, true);
    for diag in &result.diagnostics {
        warn!(start = diag.span.start, message = %diag.message, "prelude parse error");
    }
    ParsedPrelude {
        arena,
        diagnostics: result.diagnostics,
    }
});

/// A fresh arena that already holds the parsed prelude as its first file.
pub(crate) fn prelude_arena() -> NodeArena {
    PRELUDE.arena.clone()
}

/// Parse errors in the embedded prelude (empty unless the prelude is broken).
pub fn prelude_diagnostics() -> &'static [ParseDiagnostic] {
    &PRELUDE.diagnostics
}
