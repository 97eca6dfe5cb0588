//! Human-readable rendering of query results.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

use riffrag_core::types::ScoredChunk;
use riffrag_core::Error;

const TRUNCATED: &str = "\n... (truncated)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Numbered file list, then every body under a `##` heading.
    #[default]
    Plain,
    /// Markdown with fenced bodies and relevance as a percentage.
    Claude,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "claude" | "markdown" => Ok(Self::Claude),
            other => Err(Error::InvalidConfig(format!("unknown output format {other:?} (expected plain or claude)"))),
        }
    }
}

/// Cut `content` to at most `max` characters, marking the cut.
pub fn truncate_content(content: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if content.chars().count() > max => {
            let mut out: String = content.chars().take(max).collect();
            out.push_str(TRUNCATED);
            out
        }
        _ => content.to_string(),
    }
}

pub fn format_results(results: &[ScoredChunk], format: OutputFormat, max_content_length: Option<usize>) -> String {
    if results.is_empty() { return "No results found.".to_string(); }
    match format {
        OutputFormat::Plain => format_plain(results, max_content_length),
        OutputFormat::Claude => format_claude(results, max_content_length),
    }
}

fn format_plain(results: &[ScoredChunk], max: Option<usize>) -> String {
    let rule = |c: char| c.to_string().repeat(60);
    let mut out = format!("Found {} relevant files:\n\n", results.len());
    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(out, "{}. {} (lines {}-{})", i + 1, r.file_path, r.start_line, r.end_line);
        let _ = writeln!(out, "   Similarity: {:.3} | Size: {} bytes", r.similarity, r.size_bytes);
    }
    let _ = writeln!(out, "\n{}\n", rule('='));
    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(out, "## {}. {}\n", i + 1, r.file_path);
        let _ = writeln!(out, "{}", truncate_content(&r.content, max));
        let _ = writeln!(out, "\n{}\n", rule('-'));
    }
    out
}

fn format_claude(results: &[ScoredChunk], max: Option<usize>) -> String {
    let mut out = format!("Found {} relevant files:\n", results.len());
    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(out, "\n## {}. {} (lines {}-{})", i + 1, r.file_path, r.start_line, r.end_line);
        let ext = if r.extension.is_empty() { "none" } else { r.extension.as_str() };
        let _ = writeln!(out, "**Relevance:** {:.2}% | **Type:** {ext}", r.similarity * 100.0);
        let body = truncate_content(&r.content, max);
        let _ = writeln!(out, "\n```{}\n{}\n```", fence_lang(&r.language), body.trim_end_matches('\n'));
    }
    out
}

fn fence_lang(language: &str) -> &str { if language == "unknown" { "" } else { language } }
