use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{load_pages, Config, SourceConfig, SourceKind};
use super::accumulator::{DayRecordTxn, RunBatch};
use super::clock;
use super::differ::{DiffEngine, DiffRecord};
use super::fetcher::DocumentFetcher;
use super::indexer::IndexBuilder;
use super::llm::{create_analyzer, AnalysisResult, DiffAnalyzer, BATCH_MARKER};
use super::normalizer::ContentNormalizer;
use super::notifier::TelegramNotifier;
use super::reporter::ReportGenerator;
use super::storage::SnapshotStore;

/// Totals and artifacts from one monitoring run.
///
/// A run always completes and reports these counts even when individual
/// pages fail; reports cover whatever successfully diffed.
#[derive(Debug, Default)]
pub struct RunReport {
    pub total_pages: usize,
    pub changed_pages: usize,
    pub failed_pages: usize,
    pub diffs: Vec<DiffRecord>,
    pub analyses: Vec<AnalysisResult>,
    pub errors: Vec<String>,
}

/// Main orchestration engine for docwatch.
pub struct Engine {
    config: Config,
    normalizer: ContentNormalizer,
    differ: DiffEngine,
    analyzer: Option<Box<dyn DiffAnalyzer>>,
}

impl Engine {
    /// Create a new engine instance from a config file path.
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        debug!("Loaded configuration: {:?}", config);
        Ok(Self::from_config(config))
    }

    /// Create an engine from an already-built configuration.
    pub fn from_config(config: Config) -> Self {
        // Initialize the LLM analyzer if configured
        let analyzer = if config.analyzer.is_configured() {
            match create_analyzer(&config.analyzer) {
                Ok(analyzer) => {
                    info!("✅ LLM analysis enabled: {}", analyzer.model_name());
                    Some(analyzer)
                }
                Err(e) => {
                    warn!("⚠️ Failed to initialize analyzer: {}", e);
                    warn!("Continuing without analysis");
                    None
                }
            }
        } else {
            debug!("LLM analysis disabled");
            None
        };

        Self {
            config,
            normalizer: ContentNormalizer::new(),
            differ: DiffEngine::new(),
            analyzer,
        }
    }

    /// Run the full monitoring pass: fetch every source, diff against the
    /// stored snapshots, then publish reports and the notification.
    pub async fn run(&mut self, no_reports: bool, no_notify: bool) -> Result<RunReport> {
        let run_time = Utc::now();
        let mut report = RunReport::default();

        info!(
            "🔍 Monitoring {} source{}...",
            self.config.sources.len(),
            if self.config.sources.len() == 1 { "" } else { "s" }
        );

        for source in &self.config.sources {
            self.check_source(source, &mut report).await?;
        }

        let mut batch_narrative = None;
        if !report.diffs.is_empty() {
            if let Some(analyzer) = self.analyzer.as_deref() {
                info!("🧠 Analyzing {} changed pages...", report.diffs.len());
                run_analyses(analyzer, &mut report, &mut batch_narrative).await;
            }
        }

        let generator = ReportGenerator::new(
            &self.config.reports.base_dir,
            &self.config.reports.github_pages_url,
        )?;

        if !no_reports && !report.diffs.is_empty() {
            let analyses = page_analyses(&report.analyses);
            match self.generate_reports(
                &generator,
                &report.diffs,
                &analyses,
                batch_narrative,
                run_time,
            ) {
                Ok(()) => info!(
                    "✅ Reports generated under {}",
                    self.config.reports.base_dir.display()
                ),
                Err(e) => {
                    warn!("Report generation failed: {}", e);
                    report.errors.push(format!("report generation: {}", e));
                }
            }
        }

        if !no_notify && self.config.telegram.is_configured() {
            if !report.diffs.is_empty() {
                self.send_notification(&generator, &report, run_time).await;
            }
            if !report.errors.is_empty() {
                self.send_error_alert(&report.errors).await;
            }
        }

        info!(
            "📊 Run complete: {} total, {} changed, {} failed",
            report.total_pages, report.changed_pages, report.failed_pages
        );
        for error in &report.errors {
            warn!("  - {}", error);
        }

        Ok(report)
    }

    /// Fetch and diff one source's pages, collecting results into the report.
    async fn check_source(&self, source: &SourceConfig, report: &mut RunReport) -> Result<()> {
        info!("📡 Checking source: {} ({})", source.name, source.id);

        let pages = match load_pages(&source.pages_file) {
            Ok(pages) => pages,
            Err(e) => {
                warn!("Skipping source {}: {}", source.id, e);
                report.errors.push(format!("{}: {}", source.id, e));
                return Ok(());
            }
        };
        report.total_pages += pages.len();

        let fetcher = DocumentFetcher::new(source.kind.clone(), self.config.fetcher.clone())?;
        let store = SnapshotStore::new(&source.docs_dir);

        for fetch in fetcher.fetch_all(&pages).await {
            if !fetch.is_success() {
                report.failed_pages += 1;
                report.errors.push(format!(
                    "{}/{}: {}",
                    source.id,
                    fetch.page_slug,
                    fetch.error.as_deref().unwrap_or("unknown error")
                ));
                continue;
            }
            let Some(content) = fetch.content.as_deref() else {
                continue;
            };

            let normalized = self.normalizer.normalize(content);

            let old_content = match store.load(&fetch.page_slug) {
                Ok(stored) => stored.unwrap_or_default(),
                Err(e) => {
                    report.failed_pages += 1;
                    report
                        .errors
                        .push(format!("{}/{}: {}", source.id, fetch.page_slug, e));
                    continue;
                }
            };

            let diff = self.differ.compute(
                &source.id,
                &source.name,
                &fetch.page_slug,
                &old_content,
                &normalized,
            );
            if !diff.has_changes {
                continue;
            }

            info!("  📝 {}: {}", diff.page_slug, diff.summary);
            report.changed_pages += 1;

            // The snapshot keeps the normalized form so fetch noise never
            // accumulates as phantom diffs.
            if let Err(e) = store.save(&fetch.page_slug, &normalized) {
                report
                    .errors
                    .push(format!("{}/{}: {}", source.id, fetch.page_slug, e));
            }
            report.diffs.push(diff);
        }

        Ok(())
    }

    /// Render page artifacts, fold the run into the day's record, and
    /// rebuild the indexes. Page artifacts depend only on the diff list;
    /// the day record is the single read-modify-append-write step.
    fn generate_reports(
        &self,
        generator: &ReportGenerator,
        diffs: &[DiffRecord],
        analyses: &HashMap<String, String>,
        batch_narrative: Option<String>,
        run_time: DateTime<Utc>,
    ) -> crate::error::Result<()> {
        for diff in diffs {
            generator.generate_page_diff(
                diff,
                run_time,
                analyses.get(&diff.page_slug).map(String::as_str),
            )?;
        }

        let mut txn = DayRecordTxn::open(&generator.date_dir(run_time))?;
        txn.append(
            RunBatch::from_diffs(diffs, analyses, run_time, batch_narrative),
            run_time,
        );
        let record = txn.commit()?;
        generator.render_daily_index(&record, run_time)?;

        let entries = IndexBuilder::new(&self.config.reports.base_dir).rebuild()?;
        generator.render_main_index(&entries)?;

        Ok(())
    }

    async fn send_notification(
        &self,
        generator: &ReportGenerator,
        report: &RunReport,
        run_time: DateTime<Utc>,
    ) {
        let (Some(bot_token), Some(chat_id)) = (
            self.config.telegram.bot_token.as_deref(),
            self.config.telegram.chat_id.as_deref(),
        ) else {
            return;
        };

        info!("📨 Sending Telegram notification...");
        let notifier = TelegramNotifier::new(bot_token, chat_id);
        let sent = notifier
            .send_notification(
                &report.diffs,
                &clock::date_string(run_time),
                &generator.report_url(run_time),
                &page_analyses(&report.analyses),
            )
            .await;

        if sent {
            info!("✅ Notification sent");
        } else {
            warn!("Failed to send Telegram notification");
        }
    }

    async fn send_error_alert(&self, errors: &[String]) {
        let (Some(bot_token), Some(chat_id)) = (
            self.config.telegram.bot_token.as_deref(),
            self.config.telegram.chat_id.as_deref(),
        ) else {
            return;
        };

        let notifier = TelegramNotifier::new(bot_token, chat_id);
        if !notifier.send_error_notification(&errors.join("\n")).await {
            warn!("Failed to send Telegram error notification");
        }
    }

    /// Rebuild the master listing from the stored daily records.
    pub async fn rebuild_index(&self) -> Result<()> {
        let generator = ReportGenerator::new(
            &self.config.reports.base_dir,
            &self.config.reports.github_pages_url,
        )?;
        let entries = IndexBuilder::new(&self.config.reports.base_dir).rebuild()?;
        let path = generator.render_main_index(&entries)?;
        info!(
            "✅ Master index rebuilt: {} ({} date{})",
            path.display(),
            entries.len(),
            if entries.len() == 1 { "" } else { "s" }
        );
        Ok(())
    }

    /// Write a starter configuration file.
    pub async fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let target = path.unwrap_or_else(|| PathBuf::from("docwatch.toml"));
        if target.exists() {
            anyhow::bail!("Refusing to overwrite existing config: {}", target.display());
        }

        let mut config = Config::default();
        config.sources.push(SourceConfig {
            id: "claude-docs".to_string(),
            name: "Claude Docs".to_string(),
            docs_dir: PathBuf::from("docs/claude-docs"),
            pages_file: PathBuf::from("config/pages/claude-docs.toml"),
            kind: SourceKind::Docs {
                base_url: "https://code.claude.com/docs".to_string(),
                language: "en".to_string(),
            },
        });
        config.save(&target)?;

        info!("✅ Wrote starter configuration to {}", target.display());
        Ok(())
    }
}

/// Run per-diff analyses plus the batch narrative, degrading every failure
/// to an explicit placeholder so reporting is never blocked.
async fn run_analyses(
    analyzer: &dyn DiffAnalyzer,
    report: &mut RunReport,
    batch_narrative: &mut Option<String>,
) {
    for diff in &report.diffs {
        match analyzer.analyze_diff(diff).await {
            Ok(analysis) => report.analyses.push(analysis),
            Err(e) => {
                warn!("Analysis failed for {}: {}", diff.page_slug, e);
                report.analyses.push(AnalysisResult {
                    page_slug: diff.page_slug.clone(),
                    analysis: format!("Analysis error: {}", truncate_error(&e.to_string())),
                    reasoning: String::new(),
                });
            }
        }
    }

    match analyzer.analyze_batch(&report.diffs).await {
        Ok(Some(analysis)) => *batch_narrative = Some(analysis.analysis),
        Ok(None) => {}
        Err(e) => {
            warn!("Batch analysis failed: {}", e);
            *batch_narrative = Some(format!(
                "Analysis error: {}",
                truncate_error(&e.to_string())
            ));
        }
    }
}

fn page_analyses(analyses: &[AnalysisResult]) -> HashMap<String, String> {
    analyses
        .iter()
        .filter(|a| a.page_slug != BATCH_MARKER)
        .map(|a| (a.page_slug.clone(), a.analysis.clone()))
        .collect()
}

fn truncate_error(message: &str) -> String {
    message.chars().take(100).collect()
}
