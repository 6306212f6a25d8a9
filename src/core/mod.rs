mod accumulator;
mod clock;
mod differ;
mod engine;
mod fetcher;
mod indexer;
mod normalizer;
mod notifier;
mod reporter;
mod storage;

// LLM diff analysis
mod llm;

pub use accumulator::{
    DailyRecord, DayRecordTxn, PageAnalysis, PageChange, RunBatch, SourceChanges,
};
pub use differ::{DiffEngine, DiffRecord, InlineSpan, SpanKind};
pub use fetcher::{DocumentFetcher, FetchResult};
pub use indexer::{IndexBuilder, MasterIndexEntry};
pub use llm::{create_analyzer, AnalysisResult, DiffAnalyzer, OpenRouterAnalyzer, BATCH_MARKER};
pub use normalizer::ContentNormalizer;
pub use notifier::TelegramNotifier;
pub use reporter::ReportGenerator;
pub use storage::SnapshotStore;

// Export the main engine
pub use engine::{Engine, RunReport};
