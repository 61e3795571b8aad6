//! exflow: static exception-flow analysis for a C#-like language.
//!
//! The analyzer reports exceptions that escape a member without being
//! handled or declared (`[Throws(typeof(E))]`), declarations and catch
//! clauses that can never apply, and code made unreachable by throwing.
//!
//! The work is split over the workspace crates, re-exported here:
//! - [`common`]: spans, line maps and the diagnostic catalogue
//! - [`parser`]: scanner, node arena and parser
//! - [`binder`]: types, members, declared contracts and semantic queries
//! - [`checker`]: classification policy, exception catalogs, flow analysis
//!   and the parallel [`AnalysisSession`]

pub use exflow_binder as binder;
pub use exflow_checker as checker;
pub use exflow_common as common;
pub use exflow_parser as parser;

pub use exflow_binder::{BinderState, ProgramBuilder};
pub use exflow_checker::{
    AnalysisSession, CancellationToken, ConfigError, Settings, parse_settings,
};
pub use exflow_common::{Diagnostic, DiagnosticCategory};

// Tracing subscriber setup for the command-line driver
pub mod tracing_config;

/// Analyse in-memory sources with default settings.
///
/// Each entry is `(file name, text)`; the file names are used verbatim in
/// the returned diagnostics.
pub fn analyze_sources(files: &[(&str, &str)]) -> Vec<Diagnostic> {
    analyze_sources_with(&AnalysisSession::default(), files)
}

/// Analyse in-memory sources with an existing session, sharing its caches.
pub fn analyze_sources_with(session: &AnalysisSession, files: &[(&str, &str)]) -> Vec<Diagnostic> {
    let mut builder = ProgramBuilder::new();
    for (name, text) in files {
        builder.add_source(name, *text);
    }
    session.analyze(&builder.bind())
}

/// Analyse one source text under the given settings JSON.
pub fn analyze_source(
    file_name: &str,
    text: &str,
    settings_json: &str,
) -> Result<Vec<Diagnostic>, ConfigError> {
    let settings = parse_settings(settings_json)?;
    let session = AnalysisSession::from_settings(&settings)?;
    Ok(analyze_sources_with(&session, &[(file_name, text)]))
}
