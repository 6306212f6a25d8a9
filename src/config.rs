use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DocwatchError, Result};

/// One monitored documentation origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Stable identifier, used for storage paths and report grouping
    pub id: String,

    /// Human-readable display name
    pub name: String,

    /// Directory holding the current snapshot of each page
    pub docs_dir: PathBuf,

    /// TOML file listing the page slugs to monitor
    pub pages_file: PathBuf,

    /// How page URLs are constructed for this source
    pub kind: SourceKind,
}

/// URL-construction strategy for a source.
///
/// A closed set of variants dispatched by `page_url` - new source shapes
/// get a new variant, not a trait object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    /// Documentation site exposing markdown at `<base_url>/<language>/<slug>.md`
    Docs { base_url: String, language: String },

    /// Raw files served from a GitHub repository at a fixed branch
    Github {
        owner: String,
        repo: String,
        branch: String,
    },
}

impl SourceKind {
    /// Build the fetch URL for a page slug.
    pub fn page_url(&self, slug: &str) -> String {
        match self {
            SourceKind::Docs { base_url, language } => {
                format!("{}/{}/{}.md", base_url.trim_end_matches('/'), language, slug)
            }
            SourceKind::Github {
                owner,
                repo,
                branch,
            } => {
                format!(
                    "https://raw.githubusercontent.com/{}/{}/{}/{}",
                    owner, repo, branch, slug
                )
            }
        }
    }
}

/// HTTP fetcher tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Maximum in-flight requests
    pub concurrency: usize,

    /// Delay between requests, in milliseconds
    pub delay_ms: u64,

    /// Per-request timeout, in seconds
    pub timeout_secs: u64,

    /// Retry attempts for transient failures
    pub retry_count: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            delay_ms: 500,
            timeout_secs: 30,
            retry_count: 3,
        }
    }
}

/// Telegram notification settings.
///
/// Credentials are never read from the config file - only from the
/// TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,

    #[serde(skip)]
    pub bot_token: Option<String>,

    #[serde(skip)]
    pub chat_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: None,
            chat_id: None,
        }
    }
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        self.enabled && self.bot_token.is_some() && self.chat_id.is_some()
    }
}

/// LLM diff analysis settings.
///
/// The API key comes from the OPENROUTER_API_KEY environment variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub enabled: bool,

    /// Model name as understood by the endpoint (e.g. "openai/gpt-4o-mini")
    pub model: String,

    /// Chat-completions base URL
    pub base_url: String,

    #[serde(skip)]
    pub api_key: Option<String>,

    /// Maximum tokens for analysis responses
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 to 1.0)
    pub temperature: Option<f32>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "openai/gpt-4o-mini".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: None,
            max_tokens: Some(2000),
            temperature: Some(0.3),
        }
    }
}

impl AnalyzerConfig {
    pub fn is_configured(&self) -> bool {
        self.enabled && self.api_key.as_deref().map_or(false, |k| !k.is_empty())
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Root directory for rendered reports
    pub base_dir: PathBuf,

    /// Public URL the reports are served from (e.g. GitHub Pages), if any
    pub github_pages_url: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("reports"),
            github_pages_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Monitored sources
    pub sources: Vec<SourceConfig>,

    /// HTTP fetcher tuning
    pub fetcher: FetcherConfig,

    /// Telegram notification settings
    pub telegram: TelegramConfig,

    /// LLM diff analysis settings
    pub analyzer: AnalyzerConfig,

    /// Report output settings
    pub reports: ReportsConfig,
}

impl Config {
    /// Load configuration from file, then overlay credentials from the
    /// environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocwatchError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Config =
            toml::from_str(&content).map_err(|e| DocwatchError::Config(e.to_string()))?;
        config.apply_env();
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| DocwatchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                // Try common config file locations
                let candidates = ["Docwatch.toml", "docwatch.toml", ".docwatch.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                let mut config = Self::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    fn apply_env(&mut self) {
        self.telegram.bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok();
        self.telegram.chat_id = std::env::var("TELEGRAM_CHAT_ID").ok();
        self.analyzer.api_key = std::env::var("OPENROUTER_API_KEY").ok();
    }
}

/// Load page slugs from a source's pages file.
pub fn load_pages<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DocwatchError::Config(format!(
            "Pages file not found: {}",
            path.display()
        )));
    }

    #[derive(Deserialize)]
    struct PagesFile {
        #[serde(default)]
        pages: Vec<String>,
    }

    let content = std::fs::read_to_string(path)?;
    let parsed: PagesFile =
        toml::from_str(&content).map_err(|e| DocwatchError::Config(e.to_string()))?;
    Ok(parsed.pages)
}
