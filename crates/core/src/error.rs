use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} env var is not set")]
    MissingCredential { key: &'static str },

    #[error("invalid value for {key}: {details}")]
    InvalidValue { key: &'static str, details: String },
}

/// Failures raised while talking to the remote file-search service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid response from {backend} (status {status}): {details}")]
    BackendResponse {
        backend: String,
        status: u16,
        details: String,
    },

    #[error("store not found: {0}")]
    StoreNotFound(String),

    #[error("operation {name} failed: {details}")]
    OperationFailed { name: String, details: String },

    #[error("operation {name} did not finish within {seconds}s")]
    OperationTimeout { name: String, seconds: u64 },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum KbError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no store selected: provide a store name or ingest documents to create one")]
    MissingStore,

    #[error("store resolution failed: {0}")]
    StoreResolution(#[source] ServiceError),

    #[error("upload failed for {file}: {reason}")]
    Upload { file: String, reason: String },

    #[error("invalid query: {0}")]
    QueryValidation(String),

    #[error("query failed: {0}")]
    QueryService(#[source] ServiceError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl KbError {
    /// True when re-issuing the same call with the same arguments may succeed.
    ///
    /// Per-file upload failures are reported inside the ingestion summary and
    /// are not retryable on their own; a local cause such as a missing `%PDF-`
    /// header would fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QueryService(_))
    }
}

pub type Result<T, E = KbError> = std::result::Result<T, E>;
