use pdf_kb_core::{
    Answer, History, IngestionSummary, KbError, ResolvedStore, Settings, SourceType,
};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Info(String),
    Warning(String),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct LastAnswer {
    pub question: String,
    pub answer: Answer,
}

/// Browser session state. Owned by the server and handed to the page renderer.
#[derive(Debug, Clone)]
pub struct UiSession {
    pub store_name: String,
    pub display_name: String,
    default_display_name: String,
    pub question_text: String,
    pub source_filter: Option<SourceType>,
    pub history: History,
    pub suggestions: Vec<String>,
    pub last_answer: Option<LastAnswer>,
    pub notices: Vec<Notice>,
}

impl UiSession {
    pub fn new(settings: &Settings) -> Self {
        Self {
            store_name: settings.effective_store(None),
            display_name: settings.display_name.clone(),
            default_display_name: settings.display_name.clone(),
            question_text: String::new(),
            source_filter: Some(SourceType::Book),
            history: History::default(),
            suggestions: Vec::new(),
            last_answer: None,
            notices: Vec::new(),
        }
    }

    pub fn update_store_settings(&mut self, store_name: &str, display_name: &str) {
        self.store_name = store_name.trim().to_string();
        self.display_name = match display_name.trim() {
            "" => self.default_display_name.clone(),
            name => name.to_string(),
        };
    }

    pub fn use_question(&mut self, text: &str) {
        self.question_text = text.to_string();
    }

    /// Notices are shown once.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn apply_ingestion(&mut self, outcome: Result<(ResolvedStore, IngestionSummary), KbError>) {
        let (resolved, summary) = match outcome {
            Ok(done) => done,
            Err(error) => {
                warn!(error = %error, "ingestion failed");
                self.notices.push(Notice::Error(format!("Ingestion failed: {error}")));
                return;
            }
        };

        if summary.total() == 0 {
            self.notices
                .push(Notice::Warning("No PDFs were found in the upload.".to_string()));
        } else {
            self.notices.push(Notice::Success(format!(
                "Ingested {} of {} PDF(s).",
                summary.succeeded(),
                summary.total()
            )));
        }
        for (name, reason) in &summary.failures {
            self.notices.push(Notice::Warning(format!("{name}: {reason}")));
        }

        if resolved.was_created() || self.store_name != resolved.reference().as_str() {
            self.store_name = resolved.reference().to_string();
            self.history.clear();
            self.notices
                .push(Notice::Info(format!("Now using store: {}", self.store_name)));
        }
    }

    pub fn apply_suggestions(&mut self, outcome: Result<Vec<String>, KbError>) {
        match outcome {
            Ok(suggestions) => {
                if suggestions.is_empty() {
                    self.notices.push(Notice::Info(
                        "No suggestions returned. Try again after adding more PDFs.".to_string(),
                    ));
                }
                self.suggestions = suggestions;
            }
            Err(error) => self
                .notices
                .push(Notice::Error(format!("Could not generate suggestions: {error}"))),
        }
    }

    pub fn apply_answer(&mut self, question: &str, outcome: Result<Answer, KbError>) {
        self.question_text = question.to_string();
        match outcome {
            Ok(answer) => {
                if !answer.text.trim().is_empty() {
                    self.history.record(question, &answer);
                }
                self.last_answer = Some(LastAnswer {
                    question: question.trim().to_string(),
                    answer,
                });
            }
            Err(KbError::QueryValidation(_)) => self.notices.push(Notice::Warning(
                "Please enter a question (or select an example).".to_string(),
            )),
            Err(KbError::MissingStore) => self.notices.push(Notice::Warning(
                "Please provide the File Search store name.".to_string(),
            )),
            Err(error) => {
                warn!(error = %error, retryable = error.is_retryable(), "query failed");
                self.notices.push(Notice::Error(format!("Query failed: {error}")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pdf_kb_core::{Citation, ServiceError, StoreReference, UploadedDocument};
    use std::collections::BTreeMap;

    fn session() -> UiSession {
        let settings = Settings::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("secret".to_string()),
            "FILE_SEARCH_STORE_NAME" => Some("fileSearchStores/default".to_string()),
            _ => None,
        })
        .expect("valid settings");
        UiSession::new(&settings)
    }

    fn answer(text: &str) -> Answer {
        Answer {
            text: text.to_string(),
            citations: vec![Citation {
                title: "Book".to_string(),
                text: "passage".to_string(),
            }],
        }
    }

    fn summary(store: &StoreReference, uploaded: usize) -> IngestionSummary {
        IngestionSummary {
            store: store.clone(),
            source_type: SourceType::Book,
            started_at: Utc::now(),
            uploaded: (0..uploaded)
                .map(|index| UploadedDocument {
                    name: format!("{index}.pdf"),
                    remote_file: format!("files/{index}"),
                })
                .collect(),
            failures: BTreeMap::new(),
        }
    }

    #[test]
    fn defaults_come_from_settings() {
        let session = session();
        assert_eq!(session.store_name, "fileSearchStores/default");
        assert_eq!(session.display_name, "My Books Store");
        assert_eq!(session.source_filter, Some(SourceType::Book));
    }

    #[test]
    fn blank_display_name_falls_back_to_default() {
        let mut session = session();
        session.update_store_settings("  fileSearchStores/other ", "   ");
        assert_eq!(session.store_name, "fileSearchStores/other");
        assert_eq!(session.display_name, "My Books Store");
    }

    #[test]
    fn answers_are_recorded_newest_first() {
        let mut session = session();
        session.apply_answer("first?", Ok(answer("one")));
        session.apply_answer("second?", Ok(answer("two")));

        let questions: Vec<_> = session
            .history
            .entries()
            .iter()
            .map(|entry| entry.question.as_str())
            .collect();
        assert_eq!(questions, vec!["second?", "first?"]);
        assert_eq!(
            session.last_answer.as_ref().map(|last| last.question.as_str()),
            Some("second?")
        );
    }

    #[test]
    fn failures_are_reported_inline_without_touching_history() {
        let mut session = session();
        session.apply_answer("", Err(KbError::QueryValidation("question is empty".to_string())));
        session.apply_answer(
            "why?",
            Err(KbError::QueryService(ServiceError::MalformedResponse("boom".to_string()))),
        );

        assert!(session.history.is_empty());
        let notices = session.take_notices();
        assert!(matches!(notices[0], Notice::Warning(_)));
        assert!(matches!(&notices[1], Notice::Error(message) if message.contains("boom")));
        assert!(session.take_notices().is_empty());
    }

    #[test]
    fn new_store_replaces_active_store_and_clears_history() {
        let mut session = session();
        session.apply_answer("old question", Ok(answer("old")));

        let created = StoreReference::parse("fileSearchStores/fresh").expect("valid store");
        session.apply_ingestion(Ok((ResolvedStore::Created(created.clone()), summary(&created, 2))));

        assert_eq!(session.store_name, "fileSearchStores/fresh");
        assert!(session.history.is_empty());
        let notices = session.take_notices();
        assert!(notices.contains(&Notice::Success("Ingested 2 of 2 PDF(s).".to_string())));
        assert!(notices.contains(&Notice::Info("Now using store: fileSearchStores/fresh".to_string())));
    }

    #[test]
    fn existing_store_keeps_history() {
        let mut session = session();
        session.apply_answer("kept", Ok(answer("kept")));

        let existing = StoreReference::parse("fileSearchStores/default").expect("valid store");
        session.apply_ingestion(Ok((ResolvedStore::Existing(existing.clone()), summary(&existing, 1))));

        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn empty_suggestions_leave_a_hint() {
        let mut session = session();
        session.apply_suggestions(Ok(Vec::new()));
        assert!(matches!(session.take_notices().as_slice(), [Notice::Info(_)]));
    }
}
