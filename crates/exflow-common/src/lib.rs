//! Common types and utilities for the exflow analyzer.
//!
//! This crate provides foundational types used across all exflow crates:
//! - Source spans (`Span`, `FileId`)
//! - Line/column conversion (`LineMap`, `Position`)
//! - The diagnostics model and the catalogue of diagnostic codes
//! - Analyzer limits and thresholds

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::{FileId, Span};

// Position types for line/column source locations
pub mod position;
pub use position::{LineMap, Position};

// Diagnostics produced by the analyzer
pub mod diagnostics;
pub use diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticRelatedInformation, diagnostic_codes,
    diagnostic_messages, format_message,
};

// Centralized limits and thresholds
pub mod limits;
