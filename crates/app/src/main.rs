mod render;
mod web;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_kb_core::{
    GeminiFileSearch, IngestOptions, KnowledgeBase, Settings, SourceType, StoreReference,
    DEFAULT_SUGGESTION_COUNT,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-kb", version, about = "Ingest PDFs into a File Search store and ask grounded questions.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log at debug level when RUST_LOG is not set.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Upload every PDF in a folder to a File Search store.
    Ingest {
        /// Folder containing PDF files (e.g. ./books). Defaults to PDF_FOLDER.
        folder: Option<PathBuf>,
        /// Existing store name (fileSearchStores/...). A new store is created when empty.
        #[arg(long)]
        store_name: Option<String>,
        /// Display name used when a new store is created.
        #[arg(long)]
        store_display_name: Option<String>,
        /// Tag for every file; inferred from the folder name when omitted.
        #[arg(long)]
        source_type: Option<SourceType>,
        /// Descend into subfolders.
        #[arg(long, default_value_t = false)]
        recursive: bool,
        /// Uploads in flight at once.
        #[arg(long, default_value = "1")]
        concurrency: usize,
        /// Do not check that an existing store name is valid before uploading.
        #[arg(long, default_value_t = false)]
        skip_store_check: bool,
    },
    /// Ask a question against a File Search store.
    Ask {
        /// The question to answer.
        question: String,
        /// Store to query. Defaults to FILE_SEARCH_STORE_NAME.
        #[arg(long)]
        store_name: Option<String>,
        /// Only consult documents tagged with this source type.
        #[arg(long)]
        source_type: Option<SourceType>,
    },
    /// Generate study questions grounded in the store's documents.
    Suggest {
        /// Store to query. Defaults to FILE_SEARCH_STORE_NAME.
        #[arg(long)]
        store_name: Option<String>,
        /// Only consult documents tagged with this source type.
        #[arg(long)]
        source_type: Option<SourceType>,
        /// Number of questions to request.
        #[arg(long, default_value_t = DEFAULT_SUGGESTION_COUNT)]
        count: usize,
    },
    /// Serve the browser UI.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:8501")]
        addr: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::from_env()?;
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        model = %settings.model,
        "pdf-kb boot"
    );

    let kb = KnowledgeBase::new(GeminiFileSearch::from_settings(&settings));

    match cli.command {
        Command::Ingest {
            folder,
            store_name,
            store_display_name,
            source_type,
            recursive,
            concurrency,
            skip_store_check,
        } => {
            let folder = folder
                .or_else(|| settings.default_folder.clone())
                .context("no folder given and PDF_FOLDER is not set")?;
            let kb = if skip_store_check {
                kb.trust_existing_store()
            } else {
                kb
            };

            let resolved = kb
                .resolve(
                    &settings.effective_store(store_name.as_deref()),
                    &settings.effective_display_name(store_display_name.as_deref()),
                )
                .await?;
            print!("{}", render::store_notice(&resolved));

            let source_type = source_type.unwrap_or_else(|| SourceType::infer_from_folder(&folder));
            let options = IngestOptions {
                recursive,
                concurrency,
            };
            let summary = kb
                .ingest(&folder, resolved.reference(), source_type, &options)
                .await?;
            print!("{}", render::ingestion_summary(&summary, &folder));
        }
        Command::Ask {
            question,
            store_name,
            source_type,
        } => {
            let store = StoreReference::parse(settings.effective_store(store_name.as_deref()))?;
            let answer = kb.ask(&question, &store, source_type).await?;
            print!("{}", render::answer(&answer));
        }
        Command::Suggest {
            store_name,
            source_type,
            count,
        } => {
            let store = StoreReference::parse(settings.effective_store(store_name.as_deref()))?;
            let suggestions = kb.suggest_questions(&store, source_type, count).await?;
            print!("{}", render::suggestions(&suggestions));
        }
        Command::Serve { addr } => {
            web::serve(addr, kb, &settings).await?;
        }
    }

    Ok(())
}
