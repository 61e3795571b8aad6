//! Exception-flow analysis core.
//!
//! This crate is organized into several modules:
//! - `config` / `policy` - settings file and the classification policy
//! - `oracle` - subtyping and classification of exception types
//! - `doc_comments` / `doc_cache` - `<exception>` metadata, inline and sidecar
//! - `catalog` - what a callable may throw
//! - `escape_collector` / `pipeline` - leaf exception discovery
//! - `flow` - statement-level propagation and reachability
//! - `matcher` / `redundancy` - handler, declaration and contract checks
//! - `session` - parallel analysis of a bound program

pub mod catalog;
pub mod config;
pub mod context;
pub mod doc_cache;
pub mod doc_comments;
mod escape_collector;
pub mod flow;
mod matcher;
pub mod oracle;
mod pipeline;
pub mod policy;
mod redundancy;
pub mod session;

pub use catalog::{ExceptionCache, ExceptionInfo};
pub use config::{
    ConfigError, SETTINGS_FILE_NAME, Settings, discover_settings, load_settings, parse_settings,
};
pub use context::{CheckerContext, Escape, EscapeOrigin};
pub use doc_cache::DocFileCache;
pub use doc_comments::{DocException, DocFile};
pub use flow::{EscapeSet, FlowResult};
pub use oracle::Oracle;
pub use pipeline::PipelineRole;
pub use policy::{AccessorDefault, AnalysisFlags, Classification, ClassificationPolicy};
pub use session::{AnalysisSession, CancellationToken, analysis_scopes};
