use anyhow::{Context, Result, bail};
use exflow_binder::ProgramBuilder;
use exflow_checker::{AnalysisSession, Settings, discover_settings, load_settings};
use exflow_common::{Diagnostic, DiagnosticCategory};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info_span};
use walkdir::WalkDir;

use crate::args::CliArgs;

/// Output of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub diagnostics: Vec<Diagnostic>,
    /// Analysed files with their text, in the order they were added.
    pub sources: Vec<(String, String)>,
    pub settings_path: Option<PathBuf>,
}

impl AnalysisResult {
    /// Warnings or errors were produced.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_warning)
    }
}

pub fn analyze(args: &CliArgs, cwd: &Path) -> Result<AnalysisResult> {
    let started = Instant::now();
    let settings_path = resolve_settings_path(args, cwd)?;
    let settings = match &settings_path {
        Some(path) => load_settings(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    let session = AnalysisSession::from_settings(&settings).context("invalid settings")?;

    let files = discover_sources(&args.paths, cwd)?;
    if files.is_empty() {
        bail!("no .cs files found in the given paths");
    }
    let _span = info_span!("analyze_files", files = files.len()).entered();

    let mut builder = ProgramBuilder::new();
    for reference in &args.references {
        let path = cwd.join(reference);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read reference {}", path.display()))?;
        builder.add_reference(&path, text);
    }
    let mut sources = Vec::with_capacity(files.len());
    for file in &files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let name = display_name(file, cwd);
        builder.add_source(&name, text.as_str());
        sources.push((name, text));
    }
    let state = builder.bind();

    let mut diagnostics: Vec<Diagnostic> = state
        .parse_diagnostics()
        .iter()
        .map(|parse| Diagnostic {
            category: DiagnosticCategory::Error,
            code: 0,
            file: state
                .arena()
                .file(parse.file)
                .map(|f| f.file_name.to_string())
                .unwrap_or_default(),
            start: parse.span.start,
            length: parse.span.len(),
            message_text: parse.message.clone(),
            exception_type: None,
            related_information: Vec::new(),
        })
        .collect();
    diagnostics.extend(session.analyze(&state));

    debug!(
        files = sources.len(),
        diagnostics = diagnostics.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analysis complete"
    );
    Ok(AnalysisResult {
        diagnostics,
        sources,
        settings_path,
    })
}

/// `--settings` when given, otherwise the nearest settings file above the
/// first input path.
pub fn resolve_settings_path(args: &CliArgs, cwd: &Path) -> Result<Option<PathBuf>> {
    if let Some(explicit) = &args.settings {
        let path = cwd.join(explicit);
        if !path.is_file() {
            bail!("settings file {} does not exist", path.display());
        }
        return Ok(Some(path));
    }
    let start = args
        .paths
        .first()
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| cwd.to_path_buf());
    let dir = if start.is_dir() {
        start
    } else {
        start.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf())
    };
    Ok(discover_settings(&dir))
}

/// `.cs` files named directly or found under the given directories, sorted
/// and deduplicated. Hidden directories and `bin`/`obj` output folders are
/// skipped.
pub fn discover_sources(paths: &[PathBuf], cwd: &Path) -> Result<Vec<PathBuf>> {
    let mut seen = FxHashSet::default();
    let mut files = Vec::new();
    for path in paths {
        let path = cwd.join(path);
        if path.is_file() {
            if seen.insert(path.clone()) {
                files.push(path);
            }
            continue;
        }
        if !path.is_dir() {
            bail!("path {} does not exist", path.display());
        }
        for entry in WalkDir::new(&path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let file = entry.path();
            if entry.file_type().is_file()
                && file.extension().is_some_and(|ext| ext == "cs")
                && seen.insert(file.to_path_buf())
            {
                files.push(file.to_path_buf());
            }
        }
    }
    files.sort();
    Ok(files)
}

fn is_skipped_dir(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') || name == "bin" || name == "obj")
}

/// Path relative to `cwd` when possible, with forward slashes.
fn display_name(path: &Path, cwd: &Path) -> String {
    path.strip_prefix(cwd)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
