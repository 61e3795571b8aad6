#![allow(clippy::print_stderr)]

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;

use exflow_cli::args::{CliArgs, OutputFormat};
use exflow_cli::driver;
use exflow_cli::reporter::Reporter;

/// Exit status when any warning or error was reported.
const EXIT_WARNINGS: u8 = 1;
/// Exit status when the analysis could not run (bad settings, unreadable input).
const EXIT_FAILURE: u8 = 2;

fn main() -> ExitCode {
    // EXFLOW_LOG / RUST_LOG, EXFLOW_LOG_FORMAT=text|tree|json
    exflow::tracing_config::init_tracing();

    let args = CliArgs::parse();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(args: &CliArgs) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let result = driver::analyze(args, &cwd)?;

    let color = !args.no_color
        && args.format == OutputFormat::Text
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();
    let mut reporter = Reporter::new(color);
    for (name, text) in &result.sources {
        reporter.add_source(name, text);
    }

    if args.list_files {
        for (name, _) in &result.sources {
            println!("{name}");
        }
    }

    match args.format {
        OutputFormat::Json => {
            println!("{}", reporter.render_json(&result.diagnostics)?);
        }
        OutputFormat::Text => {
            if !result.diagnostics.is_empty() {
                println!("{}\n", reporter.render(&result.diagnostics));
            }
            println!("{}", reporter.summary(&result.diagnostics, result.sources.len()));
        }
    }

    Ok(if result.has_warnings() {
        ExitCode::from(EXIT_WARNINGS)
    } else {
        ExitCode::SUCCESS
    })
}
