//! Data models for exam answer keys.
//!
//! These types mirror the JSON document the extraction prompt asks the
//! model to produce, and that per-folder `data.json` files carry. The
//! extractor persists responses as raw text without validating them, so
//! the structs here serve as the canonical schema for prompt templating
//! and for typed consumers of aggregated data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The answer options every exam in the dataset uses.
pub const ANSWER_OPTIONS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Answer value for annulled, invalid, or missing questions.
#[allow(dead_code)] // Kept for typed consumers of aggregated data
pub const NO_ANSWER: &str = "N/A";

/// A single exam question's extracted data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Academic discipline the question belongs to.
    pub disciplina: String,
    /// Correct answer letter, or `"N/A"` for annulled questions.
    pub resposta: String,
}

/// The complete answer-key document for one exam.
///
/// Serializes to the exact shape the extraction prompt specifies; field
/// names are the dataset's Portuguese keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKey {
    /// Direct URL to the exam PDF.
    pub pdf_link: String,
    /// Exam date (serializes as `YYYY-MM-DD`).
    pub data: NaiveDate,
    /// Total number of questions.
    pub qtd_questoes: usize,
    /// The answer-option set, always `["A", "B", "C", "D", "E"]`.
    pub opcoes_resposta: Vec<String>,
    /// Question number (as a string key) to extracted question data.
    pub questoes: BTreeMap<String, Question>,
}

impl AnswerKey {
    /// Build the two-question example document embedded in the extraction
    /// prompt to show the model the expected output shape.
    pub fn example(pdf_link: &str) -> Self {
        let mut questoes = BTreeMap::new();
        questoes.insert(
            "1".to_string(),
            Question {
                disciplina: "Matemática".to_string(),
                resposta: "A".to_string(),
            },
        );
        questoes.insert(
            "2".to_string(),
            Question {
                disciplina: "História".to_string(),
                resposta: "B".to_string(),
            },
        );

        Self {
            pdf_link: pdf_link.to_string(),
            data: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            qtd_questoes: 2,
            opcoes_resposta: ANSWER_OPTIONS.iter().map(|s| s.to_string()).collect(),
            questoes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_shape() {
        let key = AnswerKey::example("https://example.com/prova.pdf");
        assert_eq!(key.qtd_questoes, 2);
        assert_eq!(key.opcoes_resposta, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(key.questoes.len(), 2);
        assert_eq!(key.questoes["1"].disciplina, "Matemática");
    }

    #[test]
    fn test_date_serializes_as_iso() {
        let key = AnswerKey::example("https://example.com/prova.pdf");
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["data"], "2024-01-01");
    }

    #[test]
    fn test_answer_key_round_trip() {
        let key = AnswerKey::example("https://example.com/prova.pdf");
        let json = serde_json::to_string(&key).unwrap();
        let parsed: AnswerKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_question_field_names() {
        let question = Question {
            disciplina: "Física".to_string(),
            resposta: NO_ANSWER.to_string(),
        };
        let json = serde_json::to_value(&question).unwrap();
        assert_eq!(json["disciplina"], "Física");
        assert_eq!(json["resposta"], "N/A");
    }
}
