use crate::traits::StoreService;
use crate::{
    Answer, Citation, DocumentMetadata, DocumentUpload, QueryRequest, ServiceError, Settings,
    StoreReference, UploadedDocument,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use url::Url;
use uuid::Uuid;

const BACKEND: &str = "gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";
const PDF_MIME: &str = "application/pdf";
const MAX_RESOURCE_ID_CHARS: usize = 40;
const RESOURCE_SUFFIX_CHARS: usize = 8;
const UNKNOWN_SOURCE: &str = "Unknown Source";

/// Gemini File Search over the public REST API.
pub struct GeminiFileSearch {
    base: Url,
    api_key: String,
    model: String,
    client: Client,
    poll_interval: Duration,
    operation_timeout: Duration,
}

impl GeminiFileSearch {
    pub fn new(base: Url, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base,
            api_key: api_key.into(),
            model: model.into(),
            client: Client::new(),
            poll_interval: Duration::from_secs(crate::config::DEFAULT_POLL_INTERVAL_SECS),
            operation_timeout: Duration::from_secs(crate::config::DEFAULT_OPERATION_TIMEOUT_SECS),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.api_base.clone(), &settings.api_key, &settings.model)
            .with_polling(settings.poll_interval, settings.operation_timeout)
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.operation_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        Ok(self.base.join(path)?)
    }

    async fn checked(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let details = response.text().await.unwrap_or_default();
        Err(ServiceError::BackendResponse {
            backend: BACKEND.to_string(),
            status: status.as_u16(),
            details,
        })
    }

    /// Registers the bytes with the Files API and returns the `files/...` name.
    async fn upload_file(&self, upload: &DocumentUpload) -> Result<String, ServiceError> {
        let size = upload.bytes.len();
        let start = self
            .client
            .post(self.endpoint("upload/v1beta/files")?)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size)
            .header("X-Goog-Upload-Header-Content-Type", PDF_MIME)
            .json(&json!({
                "file": {
                    "name": format!("files/{}", file_resource_id(&upload.display_name)),
                    "displayName": upload.display_name,
                }
            }))
            .send()
            .await?;
        let start = Self::checked(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::MalformedResponse("upload start returned no x-goog-upload-url".to_string())
            })?;

        let finished = self
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(upload.bytes.clone())
            .send()
            .await?;
        let envelope: FileEnvelope = Self::checked(finished).await?.json().await?;

        Ok(envelope.file.name)
    }

    async fn import_file(
        &self,
        store: &StoreReference,
        file_name: &str,
        metadata: &DocumentMetadata,
    ) -> Result<Operation, ServiceError> {
        let response = self
            .client
            .post(self.endpoint(&format!("v1beta/{}:importFile", store))?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({
                "fileName": file_name,
                "customMetadata": [
                    { "key": "source_type", "stringValue": metadata.source_type.as_str() },
                    { "key": "book_title", "stringValue": metadata.title },
                ],
            }))
            .send()
            .await?;

        Ok(Self::checked(response).await?.json().await?)
    }

    async fn wait_for_operation(&self, mut operation: Operation) -> Result<(), ServiceError> {
        let deadline = Instant::now() + self.operation_timeout;

        while !operation.done {
            if Instant::now() >= deadline {
                return Err(ServiceError::OperationTimeout {
                    name: operation.name,
                    seconds: self.operation_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;

            debug!(operation = %operation.name, "polling import operation");
            let response = self
                .client
                .get(self.endpoint(&format!("v1beta/{}", operation.name))?)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await?;
            operation = Self::checked(response).await?.json().await?;
        }

        match operation.error {
            Some(status) => Err(ServiceError::OperationFailed {
                name: operation.name,
                details: format!("{} (code {})", status.message, status.code),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StoreService for GeminiFileSearch {
    async fn create_store(&self, display_name: &str) -> Result<StoreReference, ServiceError> {
        let response = self
            .client
            .post(self.endpoint("v1beta/fileSearchStores")?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "displayName": display_name }))
            .send()
            .await?;

        let created: StoreResource = Self::checked(response).await?.json().await?;
        store_from_resource(created)
    }

    async fn get_store(&self, store: &StoreReference) -> Result<StoreReference, ServiceError> {
        let response = self
            .client
            .get(self.endpoint(&format!("v1beta/{}", store))?)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        // An unknown store id can also come back as 403 for another project's store.
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::FORBIDDEN) {
            return Err(ServiceError::StoreNotFound(store.to_string()));
        }

        let found: StoreResource = Self::checked(response).await?.json().await?;
        store_from_resource(found)
    }

    async fn upload_document(
        &self,
        store: &StoreReference,
        upload: DocumentUpload,
    ) -> Result<UploadedDocument, ServiceError> {
        let remote_file = self.upload_file(&upload).await?;
        debug!(file = %upload.name, remote_file = %remote_file, "file uploaded, importing");

        let operation = self.import_file(store, &remote_file, &upload.metadata).await?;
        self.wait_for_operation(operation).await?;

        Ok(UploadedDocument {
            name: upload.name,
            remote_file,
        })
    }

    async fn generate(&self, request: &QueryRequest) -> Result<Answer, ServiceError> {
        let response = self
            .client
            .post(self.endpoint(&format!("v1beta/models/{}:generateContent", self.model))?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&generate_body(request))
            .send()
            .await?;

        let parsed: GenerateResponse = Self::checked(response).await?.json().await?;
        answer_from_response(parsed)
    }
}

/// `files/` resource id: a lowercase slug of `title` plus a random suffix, at most 40 chars.
pub fn file_resource_id(title: &str) -> String {
    let slug: String = title
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');

    let max_base = MAX_RESOURCE_ID_CHARS - RESOURCE_SUFFIX_CHARS - 1;
    let base: String = slug.chars().take(max_base).collect();
    let base = match base.trim_end_matches('-') {
        "" => "file",
        trimmed => trimmed,
    };

    let suffix = Uuid::new_v4().simple().to_string();
    format!("{base}-{}", &suffix[..RESOURCE_SUFFIX_CHARS])
}

fn generate_body(request: &QueryRequest) -> Value {
    let mut file_search = json!({ "fileSearchStoreNames": [request.store.as_str()] });
    if let Some(source) = request.source_filter {
        file_search["metadataFilter"] = json!(source.metadata_filter());
    }

    json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        "tools": [{ "fileSearch": file_search }],
    })
}

fn store_from_resource(resource: StoreResource) -> Result<StoreReference, ServiceError> {
    StoreReference::parse(&resource.name)
        .map_err(|_| ServiceError::MalformedResponse("store resource had no name".to_string()))
}

fn answer_from_response(response: GenerateResponse) -> Result<Answer, ServiceError> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        ServiceError::MalformedResponse(format!("response had no answer: {reason}"))
    })?;

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let citations = candidate
        .grounding_metadata
        .map(|metadata| metadata.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.retrieved_context)
        .map(|context| Citation {
            title: context
                .title
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
            text: context.text.unwrap_or_default(),
        })
        .collect();

    Ok(Answer { text, citations })
}

#[derive(Debug, Deserialize)]
struct StoreResource {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: StoreResource,
}

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationStatus>,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingChunk {
    #[serde(default)]
    retrieved_context: Option<RetrievedContext>,
}

#[derive(Debug, Deserialize)]
struct RetrievedContext {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}
