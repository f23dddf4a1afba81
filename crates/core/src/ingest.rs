use crate::traits::StoreService;
use crate::{
    Document, DocumentMetadata, DocumentUpload, IngestOptions, IngestionSummary, KbError,
    SourceType, StoreReference, UploadedDocument,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Lists PDFs directly inside `folder` (or below it when `recursive`), sorted by path.
pub fn discover_pdf_files(folder: &Path, recursive: bool) -> Result<Vec<Document>, KbError> {
    if !folder.is_dir() {
        return Err(KbError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("folder not found: {}", folder.display()),
        )));
    }

    let walker = WalkDir::new(folder).follow_links(true);
    let walker = if recursive {
        walker
    } else {
        walker.max_depth(1)
    };

    let mut files = Vec::new();
    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(error) => {
                warn!(folder = %folder.display(), error = %error, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    Ok(files
        .iter()
        .map(|path| Document::from_path(folder, path))
        .collect())
}

/// Uploads every PDF in `folder` to `store`, tagging each with `source_type`.
///
/// A failing file is recorded under its name and the batch carries on.
pub async fn ingest_folder<S>(
    service: &S,
    folder: &Path,
    store: &StoreReference,
    source_type: SourceType,
    options: &IngestOptions,
) -> Result<IngestionSummary, KbError>
where
    S: StoreService + Sync + ?Sized,
{
    let started_at = Utc::now();
    let documents = discover_pdf_files(folder, options.recursive)?;

    if documents.is_empty() {
        warn!(folder = %folder.display(), "no pdfs found");
    }

    let total = documents.len();
    let outcomes: Vec<(String, Result<UploadedDocument, KbError>)> =
        stream::iter(documents.into_iter().enumerate())
            .map(|(index, document)| async move {
                info!(index = index + 1, total, file = %document.name, "uploading");
                let outcome = upload_document(service, store, &document, source_type).await;
                (document.name, outcome)
            })
            .buffered(options.concurrency.max(1))
            .collect()
            .await;

    let mut uploaded = Vec::new();
    let mut failures = BTreeMap::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(document) => {
                info!(file = %name, remote_file = %document.remote_file, "indexed");
                uploaded.push(document);
            }
            Err(error) => {
                warn!(file = %name, error = %error, "upload failed");
                let reason = match error {
                    KbError::Upload { reason, .. } => reason,
                    other => other.to_string(),
                };
                failures.insert(name, reason);
            }
        }
    }

    info!(
        store = %store,
        succeeded = uploaded.len(),
        failed = failures.len(),
        "ingestion finished"
    );

    Ok(IngestionSummary {
        store: store.clone(),
        source_type,
        started_at,
        uploaded,
        failures,
    })
}

async fn upload_document<S>(
    service: &S,
    store: &StoreReference,
    document: &Document,
    source_type: SourceType,
) -> Result<UploadedDocument, KbError>
where
    S: StoreService + Sync + ?Sized,
{
    let failed = |reason: String| KbError::Upload {
        file: document.name.clone(),
        reason,
    };

    let bytes = tokio::fs::read(&document.path)
        .await
        .map_err(|error| failed(error.to_string()))?;

    if !bytes.starts_with(PDF_SIGNATURE) {
        return Err(failed("not a pdf document (missing %PDF- header)".to_string()));
    }

    let upload = DocumentUpload {
        name: document.name.clone(),
        display_name: document.display_name.clone(),
        bytes,
        metadata: DocumentMetadata {
            source_type,
            title: document.display_name.clone(),
        },
    };

    service
        .upload_document(store, upload)
        .await
        .map_err(|error| failed(error.to_string()))
}
