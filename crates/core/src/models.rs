use crate::error::KbError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CITATION_SNIPPET_CHARS: usize = 400;

/// Opaque name of a remote file-search store, e.g. `fileSearchStores/abc123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreReference(String);

impl StoreReference {
    pub fn parse(value: impl AsRef<str>) -> Result<Self, KbError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(KbError::MissingStore);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Book,
    Transcript,
    Notes,
}

impl SourceType {
    pub const ALL: [SourceType; 3] = [SourceType::Book, SourceType::Transcript, SourceType::Notes];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Book => "book",
            SourceType::Transcript => "transcript",
            SourceType::Notes => "notes",
        }
    }

    /// Folder naming convention: `transcripts/` and `notes/` are tagged
    /// accordingly, anything else holds books.
    pub fn infer_from_folder(folder: &Path) -> Self {
        let name = folder
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if name.contains("transcript") {
            SourceType::Transcript
        } else if name.contains("note") {
            SourceType::Notes
        } else {
            SourceType::Book
        }
    }

    /// Metadata filter expression understood by the file-search tool.
    pub fn metadata_filter(self) -> String {
        format!("source_type=\"{}\"", self.as_str())
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "book" | "books" => Ok(SourceType::Book),
            "transcript" | "transcripts" => Ok(SourceType::Transcript),
            "note" | "notes" => Ok(SourceType::Notes),
            other => Err(format!(
                "unknown source type {other:?} (expected one of: book, transcript, notes)"
            )),
        }
    }
}

/// A local PDF discovered during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    /// Path relative to the ingested folder; unique within one run.
    pub name: String,
    /// File stem, used as the remote display name and `book_title` metadata.
    pub display_name: String,
}

impl Document {
    pub fn from_path(folder: &Path, path: &Path) -> Self {
        let name = path
            .strip_prefix(folder)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();
        let display_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| name.clone());

        Self {
            path: path.to_path_buf(),
            name,
            display_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source_type: SourceType,
    pub title: String,
}

/// Everything the remote service needs to index one document.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub name: String,
    pub display_name: String,
    pub bytes: Vec<u8>,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub name: String,
    pub remote_file: String,
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub recursive: bool,
    /// Uploads in flight at once; 1 keeps the run sequential.
    pub concurrency: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionSummary {
    pub store: StoreReference,
    pub source_type: SourceType,
    pub started_at: DateTime<Utc>,
    pub uploaded: Vec<UploadedDocument>,
    /// Failure reason keyed by document name.
    pub failures: BTreeMap<String, String>,
}

impl IngestionSummary {
    pub fn succeeded(&self) -> usize {
        self.uploaded.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.failed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub prompt: String,
    pub store: StoreReference,
    pub source_filter: Option<SourceType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub text: String,
}

impl Citation {
    pub fn snippet(&self) -> String {
        ellipsize(&self.text.replace('\n', " "), CITATION_SNIPPET_CHARS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl Answer {
    /// An answer without citations was not backed by retrieved passages.
    pub fn is_grounded(&self) -> bool {
        !self.citations.is_empty()
    }
}

/// Keeps the first `max_chars` characters and appends `...` when anything was cut.
pub fn ellipsize(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_reference_rejects_blank_names() {
        assert!(matches!(StoreReference::parse("  "), Err(KbError::MissingStore)));
        let store = StoreReference::parse(" fileSearchStores/abc ").expect("valid store");
        assert_eq!(store.as_str(), "fileSearchStores/abc");
    }

    #[test]
    fn source_type_is_inferred_from_folder_name() {
        assert_eq!(SourceType::infer_from_folder(Path::new("./books")), SourceType::Book);
        assert_eq!(
            SourceType::infer_from_folder(Path::new("/data/Podcast-Transcripts")),
            SourceType::Transcript
        );
        assert_eq!(SourceType::infer_from_folder(Path::new("notes")), SourceType::Notes);
        assert_eq!(SourceType::infer_from_folder(Path::new("/")), SourceType::Book);
    }

    #[test]
    fn source_type_parses_plural_and_case_variants() {
        assert_eq!("Books".parse::<SourceType>(), Ok(SourceType::Book));
        assert_eq!("notes".parse::<SourceType>(), Ok(SourceType::Notes));
        assert!("video".parse::<SourceType>().is_err());
    }

    #[test]
    fn metadata_filter_quotes_the_tag() {
        assert_eq!(SourceType::Book.metadata_filter(), "source_type=\"book\"");
    }

    #[test]
    fn document_display_name_is_the_stem() {
        let document = Document::from_path(Path::new("/books"), Path::new("/books/sub/Man and His Symbols.pdf"));
        assert_eq!(document.display_name, "Man and His Symbols");
        assert_eq!(document.name, Path::new("sub").join("Man and His Symbols.pdf").to_string_lossy().to_string());
    }

    #[test]
    fn citation_snippet_flattens_and_truncates() {
        let long = Citation {
            title: "Book".to_string(),
            text: format!("line one\n{}", "x".repeat(500)),
        };
        let snippet = long.snippet();
        assert!(!snippet.contains('\n'));
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), CITATION_SNIPPET_CHARS + 3);

        let short = Citation {
            title: "Book".to_string(),
            text: "short\ntext".to_string(),
        };
        assert_eq!(short.snippet(), "short text");
    }

    #[test]
    fn ellipsize_counts_characters_not_bytes() {
        assert_eq!(ellipsize("ééé", 2), "éé...");
        assert_eq!(ellipsize("ééé", 3), "ééé");
    }
}
