use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tera::{Context, Tera};

use super::accumulator::DailyRecord;
use super::clock;
use super::differ::DiffRecord;
use super::indexer::MasterIndexEntry;
use crate::error::{DocwatchError, Result};

const PAGE_DIFF_TEMPLATE: &str = include_str!("../../templates/page_diff.html");
const DAILY_INDEX_TEMPLATE: &str = include_str!("../../templates/daily_index.html");
const MAIN_INDEX_TEMPLATE: &str = include_str!("../../templates/main_index.html");

/// Renders report artifacts under the date-directory layout:
/// `reports/YYYY/MM/DD/<source_id>/<slug>.html` per changed page, one
/// `index.html` per day, and the master `index.html` at the root.
pub struct ReportGenerator {
    reports_dir: PathBuf,
    base_url: String,
    tera: Tera,
}

impl ReportGenerator {
    pub fn new<P: Into<PathBuf>>(reports_dir: P, base_url: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template("page_diff.html", PAGE_DIFF_TEMPLATE)?;
        tera.add_raw_template("daily_index.html", DAILY_INDEX_TEMPLATE)?;
        tera.add_raw_template("main_index.html", MAIN_INDEX_TEMPLATE)?;

        Ok(Self {
            reports_dir: reports_dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tera,
        })
    }

    /// Directory for a run's calendar day, e.g. `reports/2026/01/03`.
    pub fn date_dir(&self, run_time: DateTime<Utc>) -> PathBuf {
        let (year, month, day) = clock::date_parts(run_time);
        self.reports_dir.join(year).join(month).join(day)
    }

    /// Render the standalone artifact for one changed page.
    ///
    /// Independent of accumulation state; pages within a run can be rendered
    /// in any order.
    pub fn generate_page_diff(
        &self,
        diff: &DiffRecord,
        run_time: DateTime<Utc>,
        analysis: Option<&str>,
    ) -> Result<PathBuf> {
        let date_dir = self.date_dir(run_time);

        // Relative link back to the daily index, one level per path segment
        // plus one for the source directory.
        let depth = diff.page_slug.matches('/').count() + 1;
        let back_to_index = format!("{}index.html", "../".repeat(depth));

        let mut context = Context::new();
        context.insert("page_slug", &diff.page_slug);
        context.insert("source_id", &diff.source_id);
        context.insert("source_name", &diff.source_name);
        context.insert("summary", &diff.summary);
        context.insert("inline_diff", &diff.inline_diff);
        context.insert("unified_diff", &diff.unified_diff);
        context.insert("added_count", &diff.added_count);
        context.insert("removed_count", &diff.removed_count);
        context.insert("date", &clock::date_string(run_time));
        context.insert("timestamp", &clock::page_timestamp(run_time));
        context.insert("analysis", &analysis);
        context.insert("back_to_index", &back_to_index);

        let html = self.tera.render("page_diff.html", &context)?;

        let output_path = date_dir
            .join(&diff.source_id)
            .join(format!("{}.html", diff.page_slug));
        write_artifact(&output_path, &html)?;
        Ok(output_path)
    }

    /// Render the daily index from the accumulated record. Batches are
    /// stored oldest-first; display wants most recent first.
    pub fn render_daily_index(
        &self,
        record: &DailyRecord,
        run_time: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let date_dir = self.date_dir(run_time);

        let mut batches = record.batches.clone();
        batches.reverse();

        let mut context = Context::new();
        context.insert("date", &clock::date_string(run_time));
        context.insert("batches", &batches);
        context.insert("total_changes", &record.count);

        let html = self.tera.render("daily_index.html", &context)?;

        let output_path = date_dir.join("index.html");
        write_artifact(&output_path, &html)?;
        Ok(output_path)
    }

    /// Render the master listing at the report root.
    pub fn render_main_index(&self, entries: &[MasterIndexEntry]) -> Result<PathBuf> {
        let mut context = Context::new();
        context.insert("reports", entries);

        let html = self.tera.render("main_index.html", &context)?;

        let output_path = self.reports_dir.join("index.html");
        write_artifact(&output_path, &html)?;
        Ok(output_path)
    }

    /// Public URL for a run's daily report.
    pub fn report_url(&self, run_time: DateTime<Utc>) -> String {
        let (year, month, day) = clock::date_parts(run_time);
        let date_path = format!("{}/{}/{}/", year, month, day);
        if self.base_url.is_empty() {
            date_path
        } else {
            format!("{}/{}", self.base_url, date_path)
        }
    }
}

fn write_artifact(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DocwatchError::Persistence {
            path: parent.display().to_string(),
            reason: e.to_string(),
        })?;
    }
    std::fs::write(path, html).map_err(|e| DocwatchError::Persistence {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
