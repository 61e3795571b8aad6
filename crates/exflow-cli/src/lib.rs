//! Command-line driver for the exflow analyzer.

pub mod args;
pub mod driver;
pub mod reporter;
