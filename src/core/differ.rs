use std::collections::HashSet;

use similar::{ChangeTag, TextDiff};

/// One page's change between the stored revision and the newly fetched one.
///
/// Built once per run per page and immutable afterwards; everything the
/// renderer and notifier need is captured here, including the full snapshots.
#[derive(Debug, Clone)]
pub struct DiffRecord {
    pub source_id: String,
    pub source_name: String,
    pub page_slug: String,
    pub has_changes: bool,
    pub old_text: String,
    pub new_text: String,
    pub unified_diff: String,
    pub inline_diff: String,
    pub added_count: usize,
    pub removed_count: usize,
    pub summary: String,
}

/// Kind of an inline diff span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Equal,
    Insert,
    Delete,
}

/// A coalesced run of same-kind text in the inline diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub kind: SpanKind,
    pub text: String,
}

/// Computes diffs between two revisions of a page.
///
/// Pure and synchronous; safe to call concurrently across pages.
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compare the stored revision against the newly fetched one.
    pub fn compute(
        &self,
        source_id: &str,
        source_name: &str,
        page_slug: &str,
        old_text: &str,
        new_text: &str,
    ) -> DiffRecord {
        if old_text == new_text {
            return DiffRecord {
                source_id: source_id.to_string(),
                source_name: source_name.to_string(),
                page_slug: page_slug.to_string(),
                has_changes: false,
                old_text: old_text.to_string(),
                new_text: new_text.to_string(),
                unified_diff: String::new(),
                inline_diff: String::new(),
                added_count: 0,
                removed_count: 0,
                summary: "No changes".to_string(),
            };
        }

        let unified_diff = unified_diff(page_slug, old_text, new_text);
        let spans = inline_spans(old_text, new_text);
        let inline_diff = render_inline_html(&spans);
        let (added_count, removed_count) = line_set_counts(old_text, new_text);
        let summary = summarize(added_count, removed_count);

        DiffRecord {
            source_id: source_id.to_string(),
            source_name: source_name.to_string(),
            page_slug: page_slug.to_string(),
            has_changes: true,
            old_text: old_text.to_string(),
            new_text: new_text.to_string(),
            unified_diff,
            inline_diff,
            added_count,
            removed_count,
            summary,
        }
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Line diff in unified format, labeled with synthetic file names so the
/// rendered report reads like a normal `diff -u`.
fn unified_diff(page_slug: &str, old_text: &str, new_text: &str) -> String {
    let diff = TextDiff::from_lines(old_text, new_text);
    diff.unified_diff()
        .context_radius(3)
        .header(
            &format!("a/{}.md", page_slug),
            &format!("b/{}.md", page_slug),
        )
        .to_string()
}

/// Word-level comparison with adjacent same-kind spans coalesced, so a run of
/// inserted words renders as one highlight instead of one per token.
fn inline_spans(old_text: &str, new_text: &str) -> Vec<InlineSpan> {
    let diff = TextDiff::from_words(old_text, new_text);
    let mut spans: Vec<InlineSpan> = Vec::new();

    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => SpanKind::Equal,
            ChangeTag::Insert => SpanKind::Insert,
            ChangeTag::Delete => SpanKind::Delete,
        };
        match spans.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => spans.push(InlineSpan {
                kind,
                text: change.value().to_string(),
            }),
        }
    }

    spans
}

/// Render inline spans as HTML with insert/delete highlighting.
fn render_inline_html(spans: &[InlineSpan]) -> String {
    let mut html = String::new();
    for span in spans {
        let text = escape_inline(&span.text);
        match span.kind {
            SpanKind::Insert => {
                html.push_str("<ins style=\"background:#e6ffe6;\">");
                html.push_str(&text);
                html.push_str("</ins>");
            }
            SpanKind::Delete => {
                html.push_str("<del style=\"background:#ffe6e6;\">");
                html.push_str(&text);
                html.push_str("</del>");
            }
            SpanKind::Equal => {
                html.push_str("<span>");
                html.push_str(&text);
                html.push_str("</span>");
            }
        }
    }
    html
}

fn escape_inline(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "&para;<br>")
}

/// Added/removed counts as the size of the line-set difference.
///
/// Deliberately not LCS accounting: a line that moved position without
/// textual change is not counted, and a line whose content changed at all
/// counts as one full removal plus one full addition. Downstream summaries
/// and stored reports assume exactly these semantics.
fn line_set_counts(old_text: &str, new_text: &str) -> (usize, usize) {
    let old_lines: HashSet<&str> = old_text.lines().collect();
    let new_lines: HashSet<&str> = new_text.lines().collect();

    let added = new_lines.difference(&old_lines).count();
    let removed = old_lines.difference(&new_lines).count();

    (added, removed)
}

fn summarize(added: usize, removed: usize) -> String {
    if added == 0 && removed == 0 {
        // Whitespace or line-ending churn the line sets cannot see.
        return "No changes".to_string();
    }

    let mut parts = Vec::new();
    if added > 0 {
        parts.push(format!("+{} lines", added));
    }
    if removed > 0 {
        parts.push(format!("-{} lines", removed));
    }
    parts.join(", ")
}
