use crate::traits::StoreService;
use crate::{
    Answer, DocumentMetadata, DocumentUpload, QueryRequest, ServiceError, StoreReference,
    UploadedDocument,
};
use async_trait::async_trait;
use std::sync::Mutex;

/// In-memory store service that records every call it receives.
#[derive(Default)]
pub(crate) struct RecordingService {
    pub answer: Option<Answer>,
    pub missing_stores: Vec<String>,
    pub rejected_uploads: Vec<String>,
    pub fail_queries: bool,
    pub created: Mutex<Vec<String>>,
    pub looked_up: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<(String, DocumentMetadata)>>,
    pub queries: Mutex<Vec<QueryRequest>>,
}

impl RecordingService {
    pub fn answering(answer: Answer) -> Self {
        Self {
            answer: Some(answer),
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().expect("lock").clone()
    }

    pub fn looked_up(&self) -> Vec<String> {
        self.looked_up.lock().expect("lock").clone()
    }

    pub fn uploads(&self) -> Vec<(String, DocumentMetadata)> {
        self.uploads.lock().expect("lock").clone()
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().expect("lock").clone()
    }
}

#[async_trait]
impl StoreService for RecordingService {
    async fn create_store(&self, display_name: &str) -> Result<StoreReference, ServiceError> {
        let mut created = self.created.lock().expect("lock");
        created.push(display_name.to_string());
        StoreReference::parse(format!("fileSearchStores/created-{}", created.len()))
            .map_err(|error| ServiceError::MalformedResponse(error.to_string()))
    }

    async fn get_store(&self, store: &StoreReference) -> Result<StoreReference, ServiceError> {
        self.looked_up.lock().expect("lock").push(store.to_string());
        if self.missing_stores.iter().any(|name| name == store.as_str()) {
            return Err(ServiceError::StoreNotFound(store.to_string()));
        }
        Ok(store.clone())
    }

    async fn upload_document(
        &self,
        _store: &StoreReference,
        upload: DocumentUpload,
    ) -> Result<UploadedDocument, ServiceError> {
        if self.rejected_uploads.contains(&upload.name) {
            return Err(ServiceError::BackendResponse {
                backend: "fake".to_string(),
                status: 400,
                details: format!("cannot index {}", upload.name),
            });
        }
        self.uploads
            .lock()
            .expect("lock")
            .push((upload.name.clone(), upload.metadata.clone()));
        Ok(UploadedDocument {
            remote_file: format!("files/{}", upload.display_name.to_lowercase()),
            name: upload.name,
        })
    }

    async fn generate(&self, request: &QueryRequest) -> Result<Answer, ServiceError> {
        self.queries.lock().expect("lock").push(request.clone());
        if self.fail_queries {
            return Err(ServiceError::BackendResponse {
                backend: "fake".to_string(),
                status: 503,
                details: "unavailable".to_string(),
            });
        }
        Ok(self.answer.clone().unwrap_or(Answer {
            text: String::new(),
            citations: Vec::new(),
        }))
    }
}
