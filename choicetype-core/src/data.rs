use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classification::Choice;

const QUESTIONS_JSON: &str = include_str!("../assets/data/questions.json");

/// Errors raised while loading the embedded catalogs.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} catalog is empty")]
    Empty(&'static str),
    #[error("answer key has {answers} entries but the catalog has {questions} questions")]
    AnswerKeyLength { questions: usize, answers: usize },
    #[error("duplicate catalog id '{0}'")]
    DuplicateId(String),
    #[error("item '{0}' must cost at least one ball")]
    ZeroCost(String),
}

/// A single quiz question with its three options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    #[serde(rename = "a")]
    pub option_a: String,
    #[serde(rename = "b")]
    pub option_b: String,
    #[serde(rename = "c")]
    pub option_c: String,
}

impl Question {
    #[must_use]
    pub fn option(&self, choice: Choice) -> &str {
        match choice {
            Choice::A => &self.option_a,
            Choice::B => &self.option_b,
            Choice::C => &self.option_c,
        }
    }
}

/// Ordered question list plus the expected option for each index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
    answer_key: Vec<Choice>,
}

impl QuestionCatalog {
    /// Build a catalog, checking that every question has an answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is empty or the answer key length differs.
    pub fn new(questions: Vec<Question>, answer_key: Vec<Choice>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::Empty("question"));
        }
        if questions.len() != answer_key.len() {
            return Err(CatalogError::AnswerKeyLength {
                questions: questions.len(),
                answers: answer_key.len(),
            });
        }
        Ok(Self {
            questions,
            answer_key,
        })
    }

    /// Load a catalog from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: Self = serde_json::from_str(json)?;
        Self::new(raw.questions, raw.answer_key)
    }

    /// The twelve-question catalog shipped with the app.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded asset is malformed.
    pub fn load_from_static() -> Result<Self, CatalogError> {
        Self::from_json(QUESTIONS_JSON)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn expected(&self, index: usize) -> Option<Choice> {
        self.answer_key.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Question, Choice)> {
        self.questions.iter().zip(self.answer_key.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_catalog_has_twelve_questions() {
        let catalog = QuestionCatalog::load_from_static().unwrap();
        assert_eq!(catalog.len(), 12);
        assert!(catalog.iter().all(|(_, answer)| answer == Choice::B));
        let first = catalog.question(0).unwrap();
        assert!(first.prompt.starts_with("Unexpected choice"));
        assert_eq!(first.option(Choice::C), "Go with the first instinct");
    }

    #[test]
    fn rejects_mismatched_answer_key() {
        let json = r#"{
            "questions": [
                { "prompt": "One", "a": "x", "b": "y", "c": "z" },
                { "prompt": "Two", "a": "x", "b": "y", "c": "z" }
            ],
            "answer_key": ["A"]
        }"#;
        let err = QuestionCatalog::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::AnswerKeyLength {
                questions: 2,
                answers: 1
            }
        ));
    }

    #[test]
    fn rejects_empty_catalog() {
        let err = QuestionCatalog::new(Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, CatalogError::Empty("question")));
    }
}
