pub mod config;
pub mod error;
pub mod history;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod resolver;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod testing;

pub use config::Settings;
pub use error::{ConfigError, KbError, ServiceError};
pub use history::{History, HistoryEntry};
pub use ingest::{discover_pdf_files, ingest_folder};
pub use models::{
    Answer, Citation, Document, DocumentMetadata, DocumentUpload, IngestOptions,
    IngestionSummary, QueryRequest, SourceType, StoreReference, UploadedDocument,
};
pub use orchestrator::KnowledgeBase;
pub use query::{
    ask, parse_suggestions, suggest_questions, tutor_prompt, DEFAULT_SUGGESTION_COUNT,
    EXAMPLE_QUESTIONS,
};
pub use resolver::{resolve_store, ResolvedStore};
pub use stores::GeminiFileSearch;
pub use traits::StoreService;
