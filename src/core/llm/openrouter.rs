use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use super::analyzer::{build_batch_prompt, build_diff_prompt, AnalysisResult, DiffAnalyzer, BATCH_MARKER};
use crate::config::AnalyzerConfig;
use crate::core::differ::DiffRecord;
use crate::error::{DocwatchError, Result};

const SYSTEM_PROMPT: &str = "You are a world-class programmer analyzing documentation changes. \
     Provide concise, insightful analysis in markdown format. \
     Focus on what matters to developers.";

const MAX_ATTEMPTS: u32 = 3;

/// OpenRouter-compatible chat-completions provider.
pub struct OpenRouterAnalyzer {
    config: AnalyzerConfig,
    client: reqwest::Client,
}

impl OpenRouterAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(DocwatchError::Config(
                "OpenRouter API key not set".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| DocwatchError::Analysis(e.to_string()))?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    /// Call the chat-completions endpoint with retries.
    ///
    /// Returns (content, reasoning). Some models answer through a separate
    /// `reasoning` field with an empty `content`; in that case the reasoning
    /// is promoted to content.
    async fn call_api(&self, prompt: &str) -> Result<(String, String)> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| DocwatchError::Config("OpenRouter API key not set".to_string()))?;

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": self.config.temperature.unwrap_or(0.3),
            "max_tokens": self.config.max_tokens.unwrap_or(2000)
        });

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.call_once(&url, api_key, &payload).await {
                Ok(pair) => return Ok(pair),
                Err(e) => {
                    warn!(
                        "Analysis request error on attempt {}/{}: {}",
                        attempt, MAX_ATTEMPTS, e
                    );
                    last_error = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| DocwatchError::Analysis("Max retries exceeded".to_string())))
    }

    async fn call_once(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<(String, String)> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            // Attribution headers recommended by OpenRouter
            .header("HTTP-Referer", "https://github.com/neural-chilli/docwatch")
            .header("X-Title", "Docwatch Diff Analysis")
            .json(payload)
            .send()
            .await
            .map_err(|e| DocwatchError::Analysis(format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DocwatchError::Analysis(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DocwatchError::Analysis(format!("Failed to parse response: {}", e)))?;

        let message = &data["choices"][0]["message"];
        let mut content = message["content"].as_str().unwrap_or("").to_string();
        let mut reasoning = message["reasoning"].as_str().unwrap_or("").to_string();

        if content.is_empty() && !reasoning.is_empty() {
            debug!("Using reasoning field as content was empty");
            content = std::mem::take(&mut reasoning);
        }

        Ok((content, reasoning))
    }
}

#[async_trait]
impl DiffAnalyzer for OpenRouterAnalyzer {
    async fn analyze_diff(&self, diff: &DiffRecord) -> Result<AnalysisResult> {
        let prompt = build_diff_prompt(diff);
        let (content, reasoning) = self.call_api(&prompt).await?;

        if content.is_empty() {
            warn!("Empty analysis for {}", diff.page_slug);
            return Ok(AnalysisResult {
                page_slug: diff.page_slug.clone(),
                analysis: "Analysis returned empty response.".to_string(),
                reasoning: String::new(),
            });
        }

        Ok(AnalysisResult {
            page_slug: diff.page_slug.clone(),
            analysis: content.trim().to_string(),
            reasoning: reasoning.trim().to_string(),
        })
    }

    async fn analyze_batch(&self, diffs: &[DiffRecord]) -> Result<Option<AnalysisResult>> {
        let changed: Vec<&DiffRecord> = diffs.iter().filter(|d| d.has_changes).collect();
        if changed.is_empty() {
            return Ok(None);
        }

        let prompt = build_batch_prompt(&changed);
        let (content, reasoning) = self.call_api(&prompt).await?;

        if content.is_empty() {
            warn!("Empty batch analysis response");
            return Ok(Some(AnalysisResult {
                page_slug: BATCH_MARKER.to_string(),
                analysis: "Analysis returned empty response.".to_string(),
                reasoning: String::new(),
            }));
        }

        Ok(Some(AnalysisResult {
            page_slug: BATCH_MARKER.to_string(),
            analysis: content.trim().to_string(),
            reasoning: reasoning.trim().to_string(),
        }))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
