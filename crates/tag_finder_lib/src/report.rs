//! Rendering an extraction result as a report.
use snafu::prelude::*;
use std::path::Path;

use crate::{
    model::{ExtractionResult, TaggedCode},
    JsonSnafu, OutputSnafu, Result,
};

/// Width of the rules in plain text reports.
const RULE_WIDTH: usize = 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Plain,
    Json,
}

/// The code of a match paired with source line numbers.
///
/// Numbering starts at [`TaggedCode::first_line`], so decorators and
/// comments above the keyword line are numbered before it.
///
/// ```rust
/// use tag_finder_lib::{model::{DeclKind, TaggedCode}, report::numbered_lines};
///
/// let tagged = TaggedCode::new(
///     "a.py",
///     "f",
///     5,
///     "@cache\ndef f():\n    pass  # TODO:",
///     DeclKind::Function,
/// )
/// .and_then(|tagged| tagged.with_first_line(4))
/// .unwrap();
/// let numbers = numbered_lines(&tagged).map(|(n, _)| n).collect::<Vec<_>>();
/// assert_eq!(numbers, vec![4, 5, 6]);
/// ```
pub fn numbered_lines(tagged: &TaggedCode) -> impl Iterator<Item = (usize, &str)> {
    tagged
        .code()
        .lines()
        .zip(tagged.first_line()..)
        .map(|(line, n)| (n, line))
}

fn mode(result: &ExtractionResult) -> &'static str {
    if result.config.is_single_file() {
        "single file"
    } else {
        "recursive directory"
    }
}

pub fn as_markdown(result: &ExtractionResult) -> String {
    let config = &result.config;
    let mut lines = vec![];

    lines.push("# Tagged code report".to_string());
    lines.push("".into());
    lines.push(format!("**Tag**: `{}`  ", config.tag()));
    lines.push(format!("**Mode**: {}  ", mode(result)));
    if config.is_single_file() {
        lines.push(format!("**File**: `{}`  ", config.root().display()));
    } else {
        lines.push(format!("**Directory**: `{}`  ", config.root().display()));
        lines.push(format!("**Processed files**: {}  ", result.processed_files));
    }
    lines.push(format!("**Matches**: {}  ", result.total_matches()));
    lines.push("".into());

    if !result.skipped_files.is_empty() {
        lines.push(format!("**Skipped files**: {}  ", result.skipped_files.len()));
        lines.push("".into());
    }

    if result.total_matches() == 0 {
        lines.push("No matches found.".into());
        if !result.skipped_files.is_empty() {
            lines.push("".into());
            lines.push("### Skipped files".into());
            for skipped in result.skipped_files.iter() {
                lines.push(format!("- {skipped}"));
            }
        }
        return lines.join("\n");
    }

    lines.push("---\n".into());
    for (path, matches) in result.group_by_file_and_line() {
        lines.push(format!("## `./{}`\n", path.display()));
        for tagged in matches {
            lines.push(format!(
                "### `{}` ({}, line {})\n",
                tagged.name(),
                tagged.kind(),
                tagged.line()
            ));
            lines.push("```python".into());
            lines.push(tagged.code().to_string());
            lines.push("```\n".into());
        }
    }

    lines.join("\n")
}

pub fn as_plain(result: &ExtractionResult) -> String {
    let config = &result.config;
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![];

    lines.push(format!("Tag: {}", config.tag()));
    lines.push(format!("Mode: {}", mode(result)));
    if config.is_single_file() {
        lines.push(format!("File: {}", config.root().display()));
    } else {
        lines.push(format!("Directory: {}", config.root().display()));
        lines.push(format!("Processed files: {}", result.processed_files));
    }
    lines.push(format!("Matches: {}", result.total_matches()));
    lines.push("".into());

    if result.total_matches() == 0 {
        lines.push("No matches found.".into());
        return lines.join("\n");
    }

    for (path, matches) in result.group_by_file_and_line() {
        lines.push(rule.clone());
        lines.push(format!("./{}", path.display()));
        lines.push(rule.clone());
        for tagged in matches {
            lines.push(format!(
                "\n[{}] {} (line {})",
                tagged.kind().as_str().to_uppercase(),
                tagged.name(),
                tagged.line()
            ));
            lines.push("-".repeat(RULE_WIDTH));
            for (n, line) in numbered_lines(tagged) {
                lines.push(format!("{n:4}    {line}"));
            }
            lines.push("".into());
        }
    }

    lines.join("\n")
}

pub fn as_json(result: &ExtractionResult) -> Result<String> {
    serde_json::to_string_pretty(result).context(JsonSnafu)
}

pub fn render(result: &ExtractionResult, format: ReportFormat) -> Result<String> {
    Ok(match format {
        ReportFormat::Markdown => as_markdown(result),
        ReportFormat::Plain => as_plain(result),
        ReportFormat::Json => as_json(result)?,
    })
}

/// Render the report and write it to `path`, creating parent directories as
/// needed.
pub fn save_to_file(
    result: &ExtractionResult,
    path: impl AsRef<Path>,
    format: ReportFormat,
) -> Result<()> {
    let path = path.as_ref();
    let contents = render(result, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context(OutputSnafu { path })?;
    }
    std::fs::write(path, contents).context(OutputSnafu { path })?;
    log::debug!("wrote {format:?} report to {}", path.display());
    Ok(())
}
