pub mod page;
pub mod session;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{Form, Router};
use pdf_kb_core::{
    IngestOptions, KbError, KnowledgeBase, Settings, SourceType, StoreReference, StoreService,
    DEFAULT_SUGGESTION_COUNT,
};
use serde::Deserialize;
use session::{Notice, UiSession};
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

pub struct AppState<S>
where
    S: StoreService,
{
    kb: KnowledgeBase<S>,
    session: Mutex<UiSession>,
}

impl<S> AppState<S>
where
    S: StoreService + Send + Sync,
{
    pub fn new(kb: KnowledgeBase<S>, settings: &Settings) -> Self {
        Self {
            kb,
            session: Mutex::new(UiSession::new(settings)),
        }
    }
}

pub fn router<S>(state: Arc<AppState<S>>) -> Router
where
    S: StoreService + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(index::<S>))
        .route("/settings", post(update_settings::<S>))
        .route("/ingest", post(ingest::<S>))
        .route("/use", post(use_question::<S>))
        .route("/suggest", post(suggest::<S>))
        .route("/suggestions/clear", post(clear_suggestions::<S>))
        .route("/ask", post(ask::<S>))
        .route("/history/clear", post(clear_history::<S>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub async fn serve<S>(addr: SocketAddr, kb: KnowledgeBase<S>, settings: &Settings) -> anyhow::Result<()>
where
    S: StoreService + Send + Sync + 'static,
{
    let state = Arc::new(AppState::new(kb, settings));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "browser ui listening");
    println!("Open http://{addr} in your browser");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SettingsForm {
    #[serde(default)]
    store_name: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct QuestionForm {
    #[serde(default)]
    question: String,
}

#[derive(Debug, Deserialize)]
struct AskForm {
    #[serde(default)]
    question: String,
    #[serde(default)]
    store_name: String,
    #[serde(default)]
    sources: String,
}

async fn index<S>(State(state): State<Arc<AppState<S>>>) -> Html<String>
where
    S: StoreService + Send + Sync + 'static,
{
    let mut session = state.session.lock().await;
    let notices = session.take_notices();
    Html(page::render(&session, &notices))
}

async fn update_settings<S>(
    State(state): State<Arc<AppState<S>>>,
    Form(form): Form<SettingsForm>,
) -> Redirect
where
    S: StoreService + Send + Sync + 'static,
{
    state
        .session
        .lock()
        .await
        .update_store_settings(&form.store_name, &form.display_name);
    Redirect::to("/")
}

async fn use_question<S>(
    State(state): State<Arc<AppState<S>>>,
    Form(form): Form<QuestionForm>,
) -> Redirect
where
    S: StoreService + Send + Sync + 'static,
{
    state.session.lock().await.use_question(&form.question);
    Redirect::to("/")
}

async fn ingest<S>(State(state): State<Arc<AppState<S>>>, multipart: Multipart) -> Redirect
where
    S: StoreService + Send + Sync + 'static,
{
    let upload_dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(error) => {
            state
                .session
                .lock()
                .await
                .apply_ingestion(Err(KbError::Io(error)));
            return Redirect::to("/");
        }
    };

    let ReceivedUploads {
        saved,
        rejected,
        source_type,
    } = match receive_uploads(multipart, upload_dir.path()).await {
        Ok(received) => received,
        Err(error) => {
            warn!(error = %error, "upload form rejected");
            let mut session = state.session.lock().await;
            session
                .notices
                .push(Notice::Error(format!("Ingestion failed: {error}")));
            return Redirect::to("/");
        }
    };

    if saved.is_empty() {
        let mut session = state.session.lock().await;
        for (name, reason) in &rejected {
            session.notices.push(Notice::Warning(format!("{name}: {reason}")));
        }
        session
            .notices
            .push(Notice::Warning("Please upload at least one PDF.".to_string()));
        return Redirect::to("/");
    }

    let (store_name, display_name) = {
        let session = state.session.lock().await;
        (session.store_name.clone(), session.display_name.clone())
    };

    info!(
        files = saved.len(),
        rejected = rejected.len(),
        source_type = %source_type,
        "ingesting uploaded pdfs"
    );
    let outcome = async {
        let resolved = state.kb.resolve(&store_name, &display_name).await?;
        let mut summary = state
            .kb
            .ingest(
                upload_dir.path(),
                resolved.reference(),
                source_type,
                &IngestOptions::default(),
            )
            .await?;
        summary.failures.extend(rejected);
        Ok::<_, KbError>((resolved, summary))
    }
    .await;

    state.session.lock().await.apply_ingestion(outcome);
    Redirect::to("/")
}

/// What one upload form delivered.
struct ReceivedUploads {
    saved: Vec<PathBuf>,
    /// File name to reason, for parts that were not written.
    rejected: BTreeMap<String, String>,
    source_type: SourceType,
}

/// Writes every uploaded PDF into `dir`, renaming repeated names so none overwrite another.
async fn receive_uploads(mut multipart: Multipart, dir: &Path) -> anyhow::Result<ReceivedUploads> {
    let mut received = ReceivedUploads {
        saved: Vec::new(),
        rejected: BTreeMap::new(),
        source_type: SourceType::Book,
    };
    let mut taken = HashSet::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("source_type") => {
                let value = field.text().await?;
                received.source_type = value.parse().map_err(|error: String| anyhow::anyhow!(error))?;
            }
            Some("files") => {
                // Only the final path component is trusted.
                let Some(file_name) = field
                    .file_name()
                    .and_then(|name| Path::new(name).file_name())
                    .map(|name| name.to_string_lossy().into_owned())
                else {
                    continue;
                };
                let bytes = field.bytes().await?;

                if !has_pdf_extension(&file_name) {
                    warn!(file = %file_name, "ignoring upload without .pdf extension");
                    received
                        .rejected
                        .insert(file_name, "not a .pdf file".to_string());
                    continue;
                }

                let target = dir.join(unique_name(&file_name, &mut taken));
                tokio::fs::write(&target, &bytes).await?;
                received.saved.push(target);
            }
            _ => {}
        }
    }

    Ok(received)
}

fn has_pdf_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// `a.pdf`, then `a (2).pdf`, `a (3).pdf`; names compare case-insensitively.
fn unique_name(file_name: &str, taken: &mut HashSet<String>) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("pdf");

    let mut candidate = file_name.to_string();
    let mut copy = 1;
    while !taken.insert(candidate.to_lowercase()) {
        copy += 1;
        candidate = format!("{stem} ({copy}).{extension}");
    }
    candidate
}

/// Shares the ask form, so the typed store wins over the session store.
async fn suggest<S>(State(state): State<Arc<AppState<S>>>, Form(form): Form<AskForm>) -> Redirect
where
    S: StoreService + Send + Sync + 'static,
{
    let filter = page::parse_sources(&form.sources);
    let store_name = {
        let mut session = state.session.lock().await;
        session.source_filter = filter;
        session.question_text = form.question.clone();
        match form.store_name.trim() {
            "" => session.store_name.clone(),
            typed => typed.to_string(),
        }
    };

    let outcome = match StoreReference::parse(&store_name) {
        Ok(store) => {
            state
                .kb
                .suggest_questions(&store, filter, DEFAULT_SUGGESTION_COUNT)
                .await
        }
        Err(error) => Err(error),
    };

    let mut session = state.session.lock().await;
    if matches!(outcome, Err(KbError::MissingStore)) {
        session.notices.push(Notice::Warning(
            "Please ingest PDFs or enter a store name first.".to_string(),
        ));
    } else {
        session.apply_suggestions(outcome);
    }
    Redirect::to("/")
}

async fn clear_suggestions<S>(State(state): State<Arc<AppState<S>>>) -> Redirect
where
    S: StoreService + Send + Sync + 'static,
{
    state.session.lock().await.suggestions.clear();
    Redirect::to("/")
}

async fn ask<S>(State(state): State<Arc<AppState<S>>>, Form(form): Form<AskForm>) -> Redirect
where
    S: StoreService + Send + Sync + 'static,
{
    let filter = page::parse_sources(&form.sources);
    state.session.lock().await.source_filter = filter;

    let outcome = match StoreReference::parse(&form.store_name) {
        Ok(store) => state.kb.ask(&form.question, &store, filter).await,
        Err(error) => Err(error),
    };

    state
        .session
        .lock()
        .await
        .apply_answer(&form.question, outcome);
    Redirect::to("/")
}

async fn clear_history<S>(State(state): State<Arc<AppState<S>>>) -> Redirect
where
    S: StoreService + Send + Sync + 'static,
{
    state.session.lock().await.history.clear();
    Redirect::to("/")
}
