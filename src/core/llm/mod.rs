//! LLM integration for summarizing documentation diffs
//!
//! A trait-based provider architecture: the engine talks to the
//! `DiffAnalyzer` trait and a factory picks the concrete provider from
//! configuration. Analysis is purely additive decoration - every failure
//! path degrades to a placeholder string and never blocks reporting.

mod analyzer;
mod openrouter;

pub use analyzer::{AnalysisResult, DiffAnalyzer, BATCH_MARKER};
pub use openrouter::OpenRouterAnalyzer;

use crate::config::AnalyzerConfig;
use crate::error::{DocwatchError, Result};

/// Factory function to create the analyzer described by the config.
pub fn create_analyzer(config: &AnalyzerConfig) -> Result<Box<dyn DiffAnalyzer>> {
    if !config.enabled {
        return Err(DocwatchError::Config(
            "LLM analysis is disabled".to_string(),
        ));
    }
    if config.api_key.as_deref().map_or(true, str::is_empty) {
        return Err(DocwatchError::Config(
            "API key required for LLM analysis".to_string(),
        ));
    }

    Ok(Box::new(OpenRouterAnalyzer::new(config)?))
}
