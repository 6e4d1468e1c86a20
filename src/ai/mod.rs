//! AI analysis of sessions and projects
//!
//! The installed Claude CLI is spawned as a subprocess with the prompt on
//! stdin. When it is missing, disabled or fails, a statistics-only analysis
//! is returned instead. Results are stored as JSON next to the reports.

pub mod analysis;
pub mod cli;
pub mod prompt;
pub mod queue;

pub use analysis::{
    fallback_analysis, load_stored, parse_response, store, AiAnalysis, AiAnalysisResult,
    AiAnalyzer, Complexity, Sentiment,
};
pub use cli::{detect_cli, DetectedCli};
pub use queue::AiTaskQueue;
