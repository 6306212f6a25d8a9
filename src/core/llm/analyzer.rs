use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::differ::DiffRecord;
use crate::error::Result;

/// Marker slug for a batch-level analysis covering a whole run.
pub const BATCH_MARKER: &str = "__batch__";

/// Result of LLM analysis on a diff (or on a whole batch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Page slug, or `BATCH_MARKER` for a run-wide narrative
    pub page_slug: String,

    /// Markdown-formatted analysis text
    pub analysis: String,

    /// Model reasoning/thinking, when the endpoint exposes it
    #[serde(default)]
    pub reasoning: String,
}

/// Trait for providers that can summarize documentation diffs.
#[async_trait]
pub trait DiffAnalyzer: Send + Sync {
    /// Summarize a single page's change.
    async fn analyze_diff(&self, diff: &DiffRecord) -> Result<AnalysisResult>;

    /// Summarize a whole run's changes as one narrative. Returns None when
    /// there is nothing changed to analyze.
    async fn analyze_batch(&self, diffs: &[DiffRecord]) -> Result<Option<AnalysisResult>>;

    /// Model name being used, for logs.
    fn model_name(&self) -> &str;
}

/// Prompt for a single-page analysis.
pub(super) fn build_diff_prompt(diff: &DiffRecord) -> String {
    format!(
        "You are a world-class programmer with deep expertise in developer tools and \
         documentation. Analyze this documentation change and explain what changed and why \
         it matters to developers.\n\n\
         Page: {slug}.md\n\
         Lines added: {added} | Lines removed: {removed}\n\n\
         Diff:\n```\n{diff}\n```\n\n\
         Provide a concise analysis in markdown format:\n\
         1. **Summary**: 1-2 sentences on what changed\n\
         2. **Key Changes**: Bullet points of specific changes (max 5)\n\
         3. **Impact**: Is this low (typos), medium (improved docs), high (new features), or breaking?\n\n\
         Focus on implications for developers. Be concise and insightful.",
        slug = diff.page_slug,
        added = diff.added_count,
        removed = diff.removed_count,
        diff = diff.unified_diff,
    )
}

/// Prompt for a run-wide batch analysis. Caps the page list and per-page
/// diff text so the prompt stays inside model context limits.
pub(super) fn build_batch_prompt(diffs: &[&DiffRecord]) -> String {
    const MAX_PAGES: usize = 25;
    const MAX_DIFF_CHARS: usize = 8000;

    let mut lines = vec![
        "You are a world-class programmer with deep expertise in developer tools and documentation.".to_string(),
        "Analyze the following documentation changes as a single batch and summarize what changed and why it matters to developers.".to_string(),
        String::new(),
        format!("Total changed pages: {}", diffs.len()),
        String::new(),
    ];

    for diff in diffs.iter().take(MAX_PAGES) {
        lines.push(format!(
            "Page: {}.md | +{} / -{}",
            diff.page_slug, diff.added_count, diff.removed_count
        ));
        let truncated: String = diff.unified_diff.chars().take(MAX_DIFF_CHARS).collect();
        lines.push(format!("Diff:\n```\n{}\n```\n", truncated));
    }

    lines.push(
        "Provide a concise batch analysis in markdown format:\n\
         1. Overall Summary (1-2 sentences)\n\
         2. Key Themes across pages (bullets)\n\
         3. Impact level (Low/Medium/High/Breaking) with reasoning\n\
         4. Action items for developers (bullets, max 5)"
            .to_string(),
    );

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(slug: &str, unified: &str) -> DiffRecord {
        DiffRecord {
            source_id: "docs".to_string(),
            source_name: "Docs".to_string(),
            page_slug: slug.to_string(),
            has_changes: true,
            old_text: String::new(),
            new_text: String::new(),
            unified_diff: unified.to_string(),
            inline_diff: String::new(),
            added_count: 2,
            removed_count: 1,
            summary: "+2 lines, -1 lines".to_string(),
        }
    }

    #[test]
    fn diff_prompt_names_page_and_counts() {
        let prompt = build_diff_prompt(&diff("overview", "+new line"));
        assert!(prompt.contains("Page: overview.md"));
        assert!(prompt.contains("Lines added: 2 | Lines removed: 1"));
        assert!(prompt.contains("+new line"));
    }

    #[test]
    fn batch_prompt_caps_page_list() {
        let diffs: Vec<DiffRecord> = (0..30).map(|i| diff(&format!("page-{}", i), "d")).collect();
        let refs: Vec<&DiffRecord> = diffs.iter().collect();
        let prompt = build_batch_prompt(&refs);
        assert!(prompt.contains("Total changed pages: 30"));
        assert!(prompt.contains("page-24.md"));
        assert!(!prompt.contains("page-25.md"));
    }

    #[test]
    fn batch_prompt_truncates_long_diffs() {
        let long_diff = "x".repeat(20_000);
        let big = diff("big", &long_diff);
        let prompt = build_batch_prompt(&[&big]);
        assert!(prompt.len() < 12_000);
    }
}
