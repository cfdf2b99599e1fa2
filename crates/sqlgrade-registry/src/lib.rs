//! Practice question bank
//!
//! Questions are loaded from YAML and carry the reference SQL plus the
//! grading flags used to compare a learner's result against it.

use serde::{Deserialize, Serialize};
use sqlgrade_core::GradingPolicy;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Question not found: {0}")]
    QuestionNotFound(String),

    #[error("Duplicate question id: {0}")]
    DuplicateId(String),

    #[error("Question {id} has no reference SQL")]
    MissingReference { id: String },

    #[error("Failed to read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse question bank: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    pub reference_sql: String,
    #[serde(default)]
    pub order_sensitive: bool,
    #[serde(default)]
    pub column_name_sensitive: bool,
}

impl Question {
    pub fn policy(&self) -> GradingPolicy {
        GradingPolicy {
            row_order_sensitive: self.order_sensitive,
            column_name_sensitive: self.column_name_sensitive,
            ..GradingPolicy::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuestionFile {
    #[serde(default)]
    questions: Vec<Question>,
}

/// Questions keyed by id, listed in file order.
#[derive(Debug, Default)]
pub struct QuestionRegistry {
    questions: Vec<Question>,
    index: HashMap<String, usize>,
}

impl QuestionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let registry = Self::from_yaml_str(&content)?;
        debug!(
            path = %path.as_ref().display(),
            questions = registry.len(),
            "question bank loaded"
        );
        Ok(registry)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, RegistryError> {
        let file: QuestionFile = serde_yaml::from_str(content)?;
        let mut registry = Self::new();
        for question in file.questions {
            registry.register(question)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, question: Question) -> Result<(), RegistryError> {
        if question.reference_sql.trim().is_empty() {
            return Err(RegistryError::MissingReference { id: question.id });
        }
        if self.index.contains_key(&question.id) {
            return Err(RegistryError::DuplicateId(question.id));
        }
        self.index.insert(question.id.clone(), self.questions.len());
        self.questions.push(question);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&Question, RegistryError> {
        self.index
            .get(id)
            .map(|&i| &self.questions[i])
            .ok_or_else(|| RegistryError::QuestionNotFound(id.to_string()))
    }

    pub fn list(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = r#"
questions:
  - id: eng-names
    title: Engineers
    prompt: List the names of everyone in engineering.
    reference_sql: SELECT name FROM employees WHERE dept = 'Eng'
  - id: top-salaries
    title: Top earners
    reference_sql: SELECT name, salary FROM employees ORDER BY salary DESC
    order_sensitive: true
    column_name_sensitive: true
"#;

    #[test]
    fn test_load_from_yaml() {
        let registry = QuestionRegistry::from_yaml_str(BANK).unwrap();
        assert_eq!(registry.len(), 2);

        let ids: Vec<&str> = registry.list().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["eng-names", "top-salaries"]);

        let q = registry.get("top-salaries").unwrap();
        assert_eq!(q.prompt, "");
        assert!(q.order_sensitive);
    }

    #[test]
    fn test_policy_from_flags() {
        let registry = QuestionRegistry::from_yaml_str(BANK).unwrap();

        assert_eq!(
            registry.get("eng-names").unwrap().policy(),
            GradingPolicy::default()
        );

        let policy = registry.get("top-salaries").unwrap().policy();
        assert!(policy.row_order_sensitive);
        assert!(policy.column_name_sensitive);
    }

    #[test]
    fn test_unknown_question() {
        let registry = QuestionRegistry::from_yaml_str(BANK).unwrap();
        assert!(matches!(
            registry.get("nope"),
            Err(RegistryError::QuestionNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
questions:
  - { id: a, title: A, reference_sql: SELECT 1 }
  - { id: a, title: Again, reference_sql: SELECT 2 }
"#;
        assert!(matches!(
            QuestionRegistry::from_yaml_str(yaml),
            Err(RegistryError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_blank_reference_rejected() {
        let yaml = "questions:\n  - { id: a, title: A, reference_sql: '  ' }\n";
        assert!(matches!(
            QuestionRegistry::from_yaml_str(yaml),
            Err(RegistryError::MissingReference { .. })
        ));
    }

    #[test]
    fn test_empty_bank() {
        let registry = QuestionRegistry::from_yaml_str("questions: []").unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            QuestionRegistry::from_yaml_str("questions: [ {id: 1"),
            Err(RegistryError::Yaml(_))
        ));
    }
}
