use crate::traits::StoreService;
use crate::{Answer, KbError, QueryRequest, SourceType, StoreReference};
use tracing::{debug, info};

pub const DEFAULT_SUGGESTION_COUNT: usize = 3;

/// Canned prompts offered as starting points in the browser UI.
pub const EXAMPLE_QUESTIONS: [&str; 3] = [
    "Summarize the main psychological themes discussed across these documents.",
    "How does the author describe the relationship between ego and unconscious?",
    "List actionable practices recommended for personal growth.",
];

const MIN_SUGGESTION_CHARS: usize = 10;

/// Sends `question` to the store's retrieval endpoint and returns the answer verbatim.
///
/// Blank questions are rejected before the service is contacted.
pub async fn ask<S>(
    service: &S,
    question: &str,
    store: &StoreReference,
    source_filter: Option<SourceType>,
) -> Result<Answer, KbError>
where
    S: StoreService + Sync + ?Sized,
{
    let question = question.trim();
    if question.is_empty() {
        return Err(KbError::QueryValidation("question is empty".to_string()));
    }

    let request = QueryRequest {
        prompt: question.to_string(),
        store: store.clone(),
        source_filter,
    };

    info!(store = %store, filter = ?source_filter, "querying store");
    let answer = service
        .generate(&request)
        .await
        .map_err(KbError::QueryService)?;
    debug!(
        citations = answer.citations.len(),
        grounded = answer.is_grounded(),
        "answer received"
    );

    Ok(answer)
}

pub fn tutor_prompt(count: usize) -> String {
    format!(
        "You are a helpful tutor. Propose {count} specific, thought-provoking questions \
         someone should explore after studying the uploaded PDFs. Each question must be \
         grounded in the documents and include enough context to understand what to look for."
    )
}

/// Asks the store for study questions, one per line of the generated answer.
pub async fn suggest_questions<S>(
    service: &S,
    store: &StoreReference,
    source_filter: Option<SourceType>,
    count: usize,
) -> Result<Vec<String>, KbError>
where
    S: StoreService + Sync + ?Sized,
{
    let answer = ask(service, &tutor_prompt(count), store, source_filter).await?;
    Ok(parse_suggestions(&answer.text, count))
}

/// Strips list markers and keeps at most `count` lines longer than ten characters.
pub fn parse_suggestions(text: &str, count: usize) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_matches(|c: char| c == '-' || c == '*' || c.is_whitespace()))
        .filter(|line| line.chars().count() > MIN_SUGGESTION_CHARS)
        .take(count)
        .map(str::to_string)
        .collect()
}
