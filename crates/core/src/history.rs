use crate::models::ellipsize;
use crate::Answer;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_HISTORY_CAPACITY: usize = 5;
pub const HISTORY_ANSWER_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
    pub grounded: bool,
    pub asked_at: DateTime<Utc>,
}

/// Recent question/answer pairs for one session, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Records an answered question; the oldest entry falls off once full.
    pub fn record(&mut self, question: &str, answer: &Answer) {
        self.entries.insert(
            0,
            HistoryEntry {
                question: question.trim().to_string(),
                answer: ellipsize(&answer.text, HISTORY_ANSWER_CHARS),
                grounded: answer.is_grounded(),
                asked_at: Utc::now(),
            },
        );
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Citation;

    fn answer(text: &str) -> Answer {
        Answer {
            text: text.to_string(),
            citations: Vec::new(),
        }
    }

    #[test]
    fn newest_entry_comes_first_and_capacity_holds() {
        let mut history = History::default();
        for index in 0..7 {
            history.record(&format!("question {index}"), &answer("a"));
        }

        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(history.entries()[0].question, "question 6");
        assert_eq!(history.entries()[4].question, "question 2");
    }

    #[test]
    fn long_answers_are_truncated() {
        let mut history = History::default();
        history.record("q", &answer(&"y".repeat(450)));

        let stored = &history.entries()[0].answer;
        assert!(stored.ends_with("..."));
        assert_eq!(stored.chars().count(), HISTORY_ANSWER_CHARS + 3);
    }

    #[test]
    fn grounding_is_remembered() {
        let mut history = History::default();
        history.record(
            "q",
            &Answer {
                text: "cited".to_string(),
                citations: vec![Citation {
                    title: "t".to_string(),
                    text: "x".to_string(),
                }],
            },
        );
        history.record("q2", &answer("uncited"));

        assert!(!history.entries()[0].grounded);
        assert!(history.entries()[1].grounded);

        history.clear();
        assert!(history.is_empty());
    }
}
