use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clock;
use super::differ::DiffRecord;
use crate::error::{DocwatchError, Result};

/// LLM narrative attached to a page row, stored as a nested object so the
/// shape can grow without breaking older readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub analysis: String,
}

/// One changed page as stored in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageChange {
    pub slug: String,
    pub source_id: String,
    pub source_name: String,
    pub summary: String,
    pub added: usize,
    pub removed: usize,
    #[serde(default)]
    pub analysis: Option<PageAnalysis>,
}

/// Changed pages for one source within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceChanges {
    pub id: String,
    pub name: String,
    pub pages: Vec<PageChange>,
}

/// One run's contribution to a calendar day, grouped by source.
///
/// Batches are append-only: once written to the day's record they are never
/// rewritten or dropped. The flat `pages` list duplicates the grouped pages
/// for totals and for readers that predate source grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunBatch {
    pub timestamp: String,
    #[serde(default)]
    pub sources: Vec<SourceChanges>,
    #[serde(default)]
    pub pages: Vec<PageChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

impl RunBatch {
    /// Build a batch from one run's diffs, grouped by source in first-seen
    /// order. Diffs without changes never enter a batch.
    pub fn from_diffs(
        diffs: &[DiffRecord],
        analyses: &HashMap<String, String>,
        run_time: DateTime<Utc>,
        batch_analysis: Option<String>,
    ) -> Self {
        let mut sources: Vec<SourceChanges> = Vec::new();

        for diff in diffs.iter().filter(|d| d.has_changes) {
            let page = PageChange {
                slug: diff.page_slug.clone(),
                source_id: diff.source_id.clone(),
                source_name: diff.source_name.clone(),
                summary: diff.summary.clone(),
                added: diff.added_count,
                removed: diff.removed_count,
                analysis: analyses.get(&diff.page_slug).map(|text| PageAnalysis {
                    analysis: text.clone(),
                }),
            };

            match sources.iter_mut().find(|s| s.id == diff.source_id) {
                Some(group) => group.pages.push(page),
                None => sources.push(SourceChanges {
                    id: diff.source_id.clone(),
                    name: diff.source_name.clone(),
                    pages: vec![page],
                }),
            }
        }

        let pages = sources.iter().flat_map(|s| s.pages.clone()).collect();

        Self {
            timestamp: clock::batch_timestamp(run_time),
            sources,
            pages,
            analysis: batch_analysis,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// The accumulated state for one calendar day. Authoritative: the rendered
/// daily index is always regenerable from this record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub batches: Vec<RunBatch>,
}

/// Read-modify-append-write boundary for one day's record.
///
/// `open` reads the existing `meta.json` (or starts empty), `append` pushes a
/// batch and recomputes the derived total across *all* batches, and `commit`
/// consumes the guard and flushes. Dropping the guard without committing
/// writes nothing, so a failed run never leaves a half-updated record.
///
/// Accumulation must be serialized per day within a process; concurrent
/// processes appending to the same day require external locking or a
/// single-writer scheduler.
pub struct DayRecordTxn {
    meta_path: PathBuf,
    record: DailyRecord,
}

impl DayRecordTxn {
    /// Open the record for a date directory, creating the directory if this
    /// is the first change-bearing run of the day.
    pub fn open(date_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(date_dir).map_err(|e| DocwatchError::Persistence {
            path: date_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let meta_path = date_dir.join("meta.json");
        let record = if meta_path.exists() {
            let content =
                std::fs::read_to_string(&meta_path).map_err(|e| DocwatchError::Persistence {
                    path: meta_path.display().to_string(),
                    reason: e.to_string(),
                })?;
            serde_json::from_str(&content)?
        } else {
            DailyRecord::default()
        };

        Ok(Self { meta_path, record })
    }

    /// Append a batch; the record's total and display timestamp are derived
    /// from the full batch list, not just the new batch.
    pub fn append(&mut self, batch: RunBatch, run_time: DateTime<Utc>) {
        self.record.batches.push(batch);
        self.record.count = self.record.batches.iter().map(RunBatch::page_count).sum();
        self.record.timestamp = clock::meta_timestamp(run_time);
    }

    /// The record as it would be committed.
    pub fn record(&self) -> &DailyRecord {
        &self.record
    }

    /// Flush `meta.json` and hand back the committed record.
    pub fn commit(self) -> Result<DailyRecord> {
        let json = serde_json::to_string(&self.record)?;
        std::fs::write(&self.meta_path, json).map_err(|e| DocwatchError::Persistence {
            path: self.meta_path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn run_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 3, 14, 30, 0).unwrap()
    }

    fn diff(source_id: &str, slug: &str) -> DiffRecord {
        DiffRecord {
            source_id: source_id.to_string(),
            source_name: format!("{} docs", source_id),
            page_slug: slug.to_string(),
            has_changes: true,
            old_text: "old".to_string(),
            new_text: "new".to_string(),
            unified_diff: "diff".to_string(),
            inline_diff: "html".to_string(),
            added_count: 1,
            removed_count: 1,
            summary: "+1 lines, -1 lines".to_string(),
        }
    }

    fn unchanged(source_id: &str, slug: &str) -> DiffRecord {
        DiffRecord {
            has_changes: false,
            unified_diff: String::new(),
            inline_diff: String::new(),
            added_count: 0,
            removed_count: 0,
            summary: "No changes".to_string(),
            ..diff(source_id, slug)
        }
    }

    #[test]
    fn batch_groups_by_source_in_first_seen_order() {
        let diffs = vec![
            diff("claude", "overview"),
            diff("api", "api/messages"),
            diff("claude", "settings"),
        ];
        let batch = RunBatch::from_diffs(&diffs, &HashMap::new(), run_time(), None);

        assert_eq!(batch.sources.len(), 2);
        assert_eq!(batch.sources[0].id, "claude");
        assert_eq!(batch.sources[0].pages.len(), 2);
        assert_eq!(batch.sources[1].id, "api");
        assert_eq!(batch.page_count(), 3);
        assert_eq!(batch.timestamp, "09:30 EST");
    }

    #[test]
    fn unchanged_diffs_never_enter_a_batch() {
        let diffs = vec![diff("claude", "overview"), unchanged("claude", "quickstart")];
        let batch = RunBatch::from_diffs(&diffs, &HashMap::new(), run_time(), None);

        assert_eq!(batch.page_count(), 1);
        assert_eq!(batch.pages[0].slug, "overview");
    }

    #[test]
    fn batch_carries_page_analyses() {
        let mut analyses = HashMap::new();
        analyses.insert("overview".to_string(), "New auth flow.".to_string());

        let diffs = vec![diff("claude", "overview"), diff("claude", "settings")];
        let batch = RunBatch::from_diffs(&diffs, &analyses, run_time(), None);

        assert_eq!(
            batch.pages[0].analysis,
            Some(PageAnalysis {
                analysis: "New auth flow.".to_string()
            })
        );
        assert_eq!(batch.pages[1].analysis, None);
    }

    #[test]
    fn batch_analysis_key_is_omitted_when_absent() {
        let batch = RunBatch::from_diffs(&[diff("claude", "overview")], &HashMap::new(), run_time(), None);
        let json = serde_json::to_string(&batch).unwrap();
        // The batch-level key must be absent entirely; the page-level key
        // serializes as null.
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("analysis").is_none());
        assert!(value["pages"][0].get("analysis").unwrap().is_null());
    }

    #[test]
    fn accumulation_is_append_only() {
        let dir = tempfile::tempdir().unwrap();

        // First run of the day: 2 pages.
        let mut txn = DayRecordTxn::open(dir.path()).unwrap();
        let first = RunBatch::from_diffs(
            &[diff("claude", "overview"), diff("claude", "settings")],
            &HashMap::new(),
            run_time(),
            None,
        );
        txn.append(first.clone(), run_time());
        txn.commit().unwrap();

        // Second run, same day: 3 more pages.
        let later = Utc.with_ymd_and_hms(2026, 1, 3, 20, 0, 0).unwrap();
        let mut txn = DayRecordTxn::open(dir.path()).unwrap();
        let second = RunBatch::from_diffs(
            &[
                diff("claude", "hooks"),
                diff("api", "api/messages"),
                diff("api", "api/models"),
            ],
            &HashMap::new(),
            later,
            None,
        );
        txn.append(second, later);
        let record = txn.commit().unwrap();

        assert_eq!(record.batches.len(), 2);
        assert_eq!(record.count, 5);
        // The original batch is stored untouched.
        assert_eq!(record.batches[0], first);
        // Oldest first; consumers reverse for display.
        assert_eq!(record.batches[0].timestamp, "09:30 EST");
        assert_eq!(record.batches[1].timestamp, "15:00 EST");
    }

    #[test]
    fn dropping_txn_without_commit_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();

        let mut txn = DayRecordTxn::open(dir.path()).unwrap();
        txn.append(
            RunBatch::from_diffs(&[diff("claude", "overview")], &HashMap::new(), run_time(), None),
            run_time(),
        );
        drop(txn);

        assert!(!dir.path().join("meta.json").exists());
    }

    #[test]
    fn tolerates_records_predating_source_grouping() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("meta.json"),
            r#"{"timestamp":"Jan 02, 2026 09:00 EST","count":1,"batches":[{"timestamp":"09:00 EST","pages":[{"slug":"overview","source_id":"claude","source_name":"Claude Docs","summary":"+1 lines","added":1,"removed":0,"analysis":null}]}]}"#,
        )
        .unwrap();

        let txn = DayRecordTxn::open(dir.path()).unwrap();
        let record = txn.record();
        assert_eq!(record.count, 1);
        assert_eq!(record.batches.len(), 1);
        assert!(record.batches[0].sources.is_empty());
        assert_eq!(record.batches[0].pages[0].slug, "overview");
    }

    #[test]
    fn batch_narrative_roundtrips() {
        let dir = tempfile::tempdir().unwrap();

        let mut txn = DayRecordTxn::open(dir.path()).unwrap();
        txn.append(
            RunBatch::from_diffs(
                &[diff("claude", "overview")],
                &HashMap::new(),
                run_time(),
                Some("Mostly auth changes.".to_string()),
            ),
            run_time(),
        );
        txn.commit().unwrap();

        let txn = DayRecordTxn::open(dir.path()).unwrap();
        assert_eq!(
            txn.record().batches[0].analysis.as_deref(),
            Some("Mostly auth changes.")
        );
    }
}
