use crate::{Answer, DocumentUpload, QueryRequest, ServiceError, StoreReference, UploadedDocument};
use async_trait::async_trait;

/// The hosted store that owns indexing, retrieval and generation.
#[async_trait]
pub trait StoreService {
    async fn create_store(&self, display_name: &str) -> Result<StoreReference, ServiceError>;

    /// Looks up an existing store; `ServiceError::StoreNotFound` when it is gone.
    async fn get_store(&self, store: &StoreReference) -> Result<StoreReference, ServiceError>;

    async fn upload_document(
        &self,
        store: &StoreReference,
        upload: DocumentUpload,
    ) -> Result<UploadedDocument, ServiceError>;

    async fn generate(&self, request: &QueryRequest) -> Result<Answer, ServiceError>;
}
