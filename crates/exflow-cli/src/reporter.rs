use colored::Colorize;
use exflow_common::{Diagnostic, DiagnosticCategory, LineMap};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Renders diagnostics as text (`file:line:col - warning THROW001: ...`
/// followed by the source line and an underline) or as JSON.
pub struct Reporter {
    color: bool,
    sources: FxHashMap<String, (String, LineMap)>,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter {
            color,
            sources: FxHashMap::default(),
        }
    }

    /// Register the text of `file` so locations and snippets can be shown.
    pub fn add_source(&mut self, file: &str, text: &str) {
        let map = LineMap::build(text);
        self.sources.insert(file.to_string(), (text.to_string(), map));
    }

    pub fn render(&self, diagnostics: &[Diagnostic]) -> String {
        let mut out = String::new();
        for (index, diagnostic) in diagnostics.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&self.format_diagnostic(diagnostic));
        }
        out
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let mut output = match self.position_for(&diagnostic.file, diagnostic.start) {
            Some((line, column)) => format!("{}:{}:{}", diagnostic.file, line, column),
            None if !diagnostic.file.is_empty() => diagnostic.file.clone(),
            None => "<unknown>".to_string(),
        };

        output.push_str(" - ");
        output.push_str(&self.format_category(diagnostic.category));
        if diagnostic.code != 0 {
            output.push(' ');
            output.push_str(&self.format_code(diagnostic));
        }
        output.push_str(": ");
        output.push_str(&diagnostic.message_text);

        if let Some(snippet) =
            self.format_snippet(&diagnostic.file, diagnostic.start, diagnostic.length)
        {
            output.push_str(&snippet);
        }
        for related in &diagnostic.related_information {
            let location = self
                .position_for(&related.file, related.start)
                .map(|(line, column)| format!("{}:{}:{}", related.file, line, column))
                .unwrap_or_else(|| related.file.clone());
            let prefix = if self.color {
                "  Related".dimmed().to_string()
            } else {
                "  Related".to_string()
            };
            output.push('\n');
            output.push_str(&format!("{prefix}: {location} - {}", related.message_text));
        }
        output
    }

    /// One-line totals, e.g. `Found 2 warnings and 1 message in 3 files.`
    pub fn summary(&self, diagnostics: &[Diagnostic], files: usize) -> String {
        let warnings = diagnostics.iter().filter(|d| d.is_warning()).count();
        let others = diagnostics.len() - warnings;
        let plural = |n: usize, word: &str| {
            if n == 1 {
                format!("{n} {word}")
            } else {
                format!("{n} {word}s")
            }
        };
        let text = format!(
            "Found {} and {} in {}.",
            plural(warnings, "warning"),
            plural(others, "message"),
            plural(files, "file")
        );
        if self.color && warnings > 0 {
            text.yellow().bold().to_string()
        } else {
            text
        }
    }

    /// Source line with the span underlined:
    ///
    /// ```text
    ///     5       void M() { throw new InvalidOperationException(); }
    ///                        ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// ```
    fn format_snippet(&self, file: &str, start: u32, length: u32) -> Option<String> {
        if length == 0 {
            return None;
        }
        let (line_num, column) = self.position_for(file, start)?;
        let (source, _) = self.sources.get(file)?;
        let line_text = source.lines().nth((line_num - 1) as usize)?;

        let first = (column - 1) as usize;
        let mut underline = String::new();
        for (i, ch) in line_text.chars().enumerate() {
            let pad = if ch == '\t' { 4 } else { 1 };
            if i < first {
                underline.push_str(&" ".repeat(pad));
            } else if i < first + length as usize {
                underline.push_str(&"~".repeat(pad));
            } else {
                break;
            }
        }
        if underline.trim().is_empty() {
            underline.push('~');
        }
        let underline = if self.color {
            underline.red().to_string()
        } else {
            underline
        };
        Some(format!(
            "\n  {:>3}   {}\n        {}",
            line_num,
            line_text.replace('\t', "    "),
            underline
        ))
    }

    fn position_for(&self, file: &str, offset: u32) -> Option<(u32, u32)> {
        let (source, map) = self.sources.get(file)?;
        let position = map.offset_to_position(offset, source);
        Some((position.line + 1, position.character + 1))
    }

    fn format_category(&self, category: DiagnosticCategory) -> String {
        let label = category.name();
        if !self.color {
            return label.to_string();
        }
        match category {
            DiagnosticCategory::Error => label.red().bold().to_string(),
            DiagnosticCategory::Warning => label.yellow().bold().to_string(),
            DiagnosticCategory::Suggestion => label.cyan().to_string(),
            DiagnosticCategory::Message => label.blue().to_string(),
        }
    }

    fn format_code(&self, diagnostic: &Diagnostic) -> String {
        let label = diagnostic.code_label();
        if self.color {
            label.dimmed().to_string()
        } else {
            label
        }
    }

    // =========================================================================
    // JSON
    // =========================================================================

    pub fn render_json(&self, diagnostics: &[Diagnostic]) -> serde_json::Result<String> {
        let entries: Vec<JsonDiagnostic<'_>> = diagnostics
            .iter()
            .map(|diagnostic| {
                let (line, column) = self
                    .position_for(&diagnostic.file, diagnostic.start)
                    .unwrap_or((0, 0));
                JsonDiagnostic {
                    code_label: diagnostic.code_label(),
                    line,
                    column,
                    diagnostic,
                }
            })
            .collect();
        serde_json::to_string_pretty(&entries)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonDiagnostic<'a> {
    code_label: String,
    line: u32,
    column: u32,
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
}
