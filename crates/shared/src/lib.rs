// Public modules
pub mod config;
pub mod dedup;
pub mod digest;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod ranking;
pub mod summarizer;
pub mod template;

// Re-export commonly used types
pub use config::{DigestConfig, LlmSettings};
pub use dedup::{are_similar, group_articles};
pub use digest::{DigestGenerator, RenderOptions};
pub use io::{load_articles, save_digest, write_marker_files, DigestFiles};
pub use models::{split_streams, ArticleGroup, ArticleRecord, SummaryResult};
pub use pipeline::{Digest, DigestPipeline, DigestStats};
pub use ranking::rank;
pub use summarizer::{LlmClient, StreamPrompts, SummarizeOutcome, Summarizer};
