//! Document ingestion: PDF loading, splitting and indexing

pub mod chunker;
pub mod loader;
pub mod pipeline;

pub use chunker::{TextSpan, TextSplitter};
pub use loader::PdfLoader;
pub use pipeline::{IngestPipeline, IngestProgress, IngestReport, ProgressFn};
