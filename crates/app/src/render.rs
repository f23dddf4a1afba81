use pdf_kb_core::{Answer, IngestionSummary, ResolvedStore};
use std::fmt::Write;
use std::path::Path;

pub fn store_notice(resolved: &ResolvedStore) -> String {
    match resolved {
        ResolvedStore::Existing(store) => format!("[STORE] Using existing store: {store}\n"),
        ResolvedStore::Created(store) => format!(
            "[STORE] Created new store: {store}\n[STORE] Use this store name for queries: {store}\n"
        ),
    }
}

pub fn ingestion_summary(summary: &IngestionSummary, folder: &Path) -> String {
    if summary.total() == 0 {
        return format!("[WARN] No PDFs found in {}\n", folder.display());
    }

    let mut out = String::new();
    for document in &summary.uploaded {
        let _ = writeln!(out, "[PDF] Indexed: {} ({})", document.name, document.remote_file);
    }
    for (name, reason) in &summary.failures {
        let _ = writeln!(out, "[FAILED] {name}: {reason}");
    }
    let _ = writeln!(
        out,
        "{} of {} PDF(s) ingested into {} as source_type={} at {}",
        summary.succeeded(),
        summary.total(),
        summary.store,
        summary.source_type,
        summary.started_at.to_rfc3339()
    );
    out
}

pub fn answer(answer: &Answer) -> String {
    let mut out = String::from("\n=== Answer ===\n\n");
    if answer.text.trim().is_empty() {
        out.push_str("(No answer returned.)\n");
    } else {
        let _ = writeln!(out, "{}", answer.text);
    }

    if !answer.is_grounded() {
        out.push_str("\n(No citations returned.)\n");
        return out;
    }

    out.push_str("\n=== Citations ===\n");
    for (index, citation) in answer.citations.iter().enumerate() {
        let _ = write!(
            out,
            "\nCitation {}:\nSource title: {}\nText: {}\n",
            index + 1,
            citation.title,
            citation.snippet()
        );
    }
    out
}

pub fn suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return "No suggestions returned. Try again after adding more PDFs.\n".to_string();
    }

    suggestions
        .iter()
        .enumerate()
        .map(|(index, suggestion)| format!("{}. {suggestion}\n", index + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pdf_kb_core::{Citation, SourceType, StoreReference, UploadedDocument};
    use std::collections::BTreeMap;

    fn store() -> StoreReference {
        StoreReference::parse("fileSearchStores/books").expect("valid store")
    }

    #[test]
    fn created_store_tells_the_user_what_to_reuse() {
        let text = store_notice(&ResolvedStore::Created(store()));
        assert!(text.contains("Created new store: fileSearchStores/books"));
        assert!(text.contains("Use this store name for queries"));
    }

    #[test]
    fn empty_run_prints_a_warning() {
        let summary = IngestionSummary {
            store: store(),
            source_type: SourceType::Book,
            started_at: Utc::now(),
            uploaded: Vec::new(),
            failures: BTreeMap::new(),
        };
        assert_eq!(
            ingestion_summary(&summary, Path::new("./books")),
            "[WARN] No PDFs found in ./books\n"
        );
    }

    #[test]
    fn summary_lists_failures_by_name() {
        let summary = IngestionSummary {
            store: store(),
            source_type: SourceType::Book,
            started_at: Utc::now(),
            uploaded: vec![UploadedDocument {
                name: "good.pdf".to_string(),
                remote_file: "files/good-1234abcd".to_string(),
            }],
            failures: BTreeMap::from([("bad.pdf".to_string(), "not a pdf".to_string())]),
        };

        let text = ingestion_summary(&summary, Path::new("./books"));
        assert!(text.contains("[PDF] Indexed: good.pdf (files/good-1234abcd)"));
        assert!(text.contains("[FAILED] bad.pdf: not a pdf"));
        assert!(text.contains("1 of 2 PDF(s) ingested into fileSearchStores/books as source_type=book"));
    }

    #[test]
    fn ungrounded_answer_says_so() {
        let text = answer(&Answer {
            text: "Nothing relevant.".to_string(),
            citations: Vec::new(),
        });
        assert!(text.contains("=== Answer ===\n\nNothing relevant."));
        assert!(text.contains("(No citations returned.)"));
        assert!(!text.contains("=== Citations ==="));
    }

    #[test]
    fn citations_are_numbered_in_order() {
        let text = answer(&Answer {
            text: "Dreams compensate.".to_string(),
            citations: vec![
                Citation {
                    title: "First".to_string(),
                    text: "a\nb".to_string(),
                },
                Citation {
                    title: "Second".to_string(),
                    text: "c".to_string(),
                },
            ],
        });

        let first = text.find("Citation 1:\nSource title: First\nText: a b").expect("first citation");
        let second = text.find("Citation 2:\nSource title: Second").expect("second citation");
        assert!(first < second);
    }

    #[test]
    fn suggestions_are_numbered() {
        let text = suggestions(&["What is a complex?".to_string(), "Why dream?".to_string()]);
        assert_eq!(text, "1. What is a complex?\n2. Why dream?\n");
    }
}
