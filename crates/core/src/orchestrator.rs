use crate::ingest::ingest_folder;
use crate::query::{ask, suggest_questions};
use crate::resolver::{resolve_store, ResolvedStore};
use crate::traits::StoreService;
use crate::{Answer, IngestOptions, IngestionSummary, KbError, SourceType, StoreReference};
use std::path::Path;

/// Ties store resolution, ingestion and querying to one remote service.
pub struct KnowledgeBase<S>
where
    S: StoreService,
{
    service: S,
    verify_existing_store: bool,
}

impl<S> KnowledgeBase<S>
where
    S: StoreService + Send + Sync,
{
    pub fn new(service: S) -> Self {
        Self {
            service,
            verify_existing_store: true,
        }
    }

    /// Skip the existence lookup when a store name is supplied.
    pub fn trust_existing_store(mut self) -> Self {
        self.verify_existing_store = false;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn resolve(&self, store: &str, display_name: &str) -> Result<ResolvedStore, KbError> {
        resolve_store(&self.service, store, display_name, self.verify_existing_store).await
    }

    pub async fn ingest(
        &self,
        folder: &Path,
        store: &StoreReference,
        source_type: SourceType,
        options: &IngestOptions,
    ) -> Result<IngestionSummary, KbError> {
        ingest_folder(&self.service, folder, store, source_type, options).await
    }

    pub async fn ask(
        &self,
        question: &str,
        store: &StoreReference,
        source_filter: Option<SourceType>,
    ) -> Result<Answer, KbError> {
        ask(&self.service, question, store, source_filter).await
    }

    pub async fn suggest_questions(
        &self,
        store: &StoreReference,
        source_filter: Option<SourceType>,
        count: usize,
    ) -> Result<Vec<String>, KbError> {
        suggest_questions(&self.service, store, source_filter, count).await
    }
}
