use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the exflow binary.
#[derive(Parser, Debug)]
#[command(
    name = "exflow",
    version,
    about = "Exception-flow analysis: unhandled, undeclared and redundant exceptions"
)]
pub struct CliArgs {
    /// Settings file. Defaults to the nearest exflow.settings.json above
    /// the first input path.
    #[arg(short = 's', long)]
    pub settings: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, ignore_case = true)]
    pub format: OutputFormat,

    /// Disable colored output.
    #[arg(long = "no-color", alias = "noColor")]
    pub no_color: bool,

    /// Referenced module whose members are callable but not analysed. A
    /// documentation file with the same name and an .xml extension is read
    /// when present.
    #[arg(short = 'r', long = "reference", value_name = "MODULE")]
    pub references: Vec<PathBuf>,

    /// Print the analysed files before the diagnostics.
    #[arg(long = "list-files", alias = "listFiles")]
    pub list_files: bool,

    /// Source files or directories (searched recursively for .cs files).
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
