//! Multiple-choice comprehension questions stored under
//! `articles/{id}/questions`.
//!
//! Questions arrive as a JSON import file ([`QuestionInput`]) and are stored
//! in the document shape the web UI reads ([`Question::to_fields`]). Reading
//! back is lenient: older documents store `correctAnswer` as a bare string
//! and choice text under `text`.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::document::Document;
use crate::error::{ContentError, Result};
use crate::value::{Fields, Value};

pub const QUESTIONS_SUBCOLLECTION: &str = "questions";
pub const MAX_QUESTIONS_PER_IMPORT: usize = 5;
pub const MIN_CHOICES: usize = 2;
pub const MAX_CHOICES: usize = 4;
pub const DEFAULT_POINTS: i64 = 10;
pub const MULTIPLE_CHOICE: &str = "multiple_choice";

fn choice_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]+$").expect("static regex"))
}

/// One question as written in an import file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct QuestionInput {
    pub question: String,
    pub choices: Vec<ChoiceInput>,
    pub correct_choice_id: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChoiceInput {
    pub id: String,
    pub text: String,
}

/// Parses an import file: a JSON array of questions.
pub fn parse_question_inputs(raw: &str) -> Result<Vec<QuestionInput>> {
    serde_json::from_str(raw)
        .map_err(|e| ContentError::validation(format!("questions file is not valid JSON: {e}")))
}

/// Rejects the whole batch if any question is malformed.
pub fn validate_question_inputs(inputs: &[QuestionInput]) -> Result<()> {
    if inputs.is_empty() {
        return Err(ContentError::validation("questions file contains no questions"));
    }
    if inputs.len() > MAX_QUESTIONS_PER_IMPORT {
        return Err(ContentError::validation(format!(
            "at most {MAX_QUESTIONS_PER_IMPORT} questions per article, got {}",
            inputs.len()
        )));
    }
    for (i, input) in inputs.iter().enumerate() {
        input
            .validate()
            .map_err(|e| ContentError::validation(format!("question {}: {}", i + 1, strip(e))))?;
    }
    Ok(())
}

fn strip(e: ContentError) -> String {
    match e {
        ContentError::Validation(msg) => msg,
        other => other.to_string(),
    }
}

impl QuestionInput {
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(ContentError::validation("question text must not be empty"));
        }
        if !(MIN_CHOICES..=MAX_CHOICES).contains(&self.choices.len()) {
            return Err(ContentError::validation(format!(
                "expected {MIN_CHOICES} to {MAX_CHOICES} choices, got {}",
                self.choices.len()
            )));
        }
        let mut seen: Vec<&str> = Vec::with_capacity(self.choices.len());
        for choice in &self.choices {
            if !choice_id_pattern().is_match(&choice.id) {
                return Err(ContentError::validation(format!(
                    "choice id '{}' must be uppercase letters or digits",
                    choice.id
                )));
            }
            if seen.contains(&choice.id.as_str()) {
                return Err(ContentError::validation(format!(
                    "duplicate choice id '{}'",
                    choice.id
                )));
            }
            if choice.text.trim().is_empty() {
                return Err(ContentError::validation(format!(
                    "choice '{}' has empty text",
                    choice.id
                )));
            }
            seen.push(&choice.id);
        }
        if !seen.contains(&self.correct_choice_id.as_str()) {
            return Err(ContentError::validation(format!(
                "correct_choice_id '{}' is not one of the choices",
                self.correct_choice_id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Choice {
    pub id: String,
    pub text_english: String,
    pub text_traditional_chinese: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Question {
    /// Document key, `mcq{order}` for imported questions.
    pub id: String,
    pub text_english: String,
    pub text_traditional_chinese: String,
    pub choices: Vec<Choice>,
    pub correct_choice_id: Option<String>,
    pub explanation_english: String,
    pub explanation_traditional_chinese: String,
    pub order: i64,
    pub points: i64,
}

impl Question {
    /// Builds the stored form of an (already validated) import entry.
    /// `order` is 1-based.
    pub fn from_input(input: &QuestionInput, order: i64) -> Self {
        Question {
            id: format!("mcq{order}"),
            text_english: input.question.trim().to_string(),
            text_traditional_chinese: String::new(),
            choices: input
                .choices
                .iter()
                .map(|c| Choice {
                    id: c.id.clone(),
                    text_english: c.text.trim().to_string(),
                    text_traditional_chinese: String::new(),
                })
                .collect(),
            correct_choice_id: Some(input.correct_choice_id.clone()),
            explanation_english: input.explanation.clone().unwrap_or_default(),
            explanation_traditional_chinese: String::new(),
            order,
            points: DEFAULT_POINTS,
        }
    }

    pub fn to_fields(&self) -> Fields {
        let choices = self
            .choices
            .iter()
            .map(|c| {
                let mut m = Fields::new();
                m.insert("id".into(), c.id.clone().into());
                m.insert("textEnglish".into(), c.text_english.clone().into());
                m.insert(
                    "textTraditionalChinese".into(),
                    c.text_traditional_chinese.clone().into(),
                );
                Value::Map(m)
            })
            .collect();
        let mut correct = Fields::new();
        correct.insert("choiceId".into(), self.correct_choice_id.clone().into());

        let mut fields = Fields::new();
        fields.insert("questionTextEnglish".into(), self.text_english.clone().into());
        fields.insert(
            "questionTextTraditionalChinese".into(),
            self.text_traditional_chinese.clone().into(),
        );
        fields.insert("choices".into(), Value::Array(choices));
        fields.insert("correctAnswer".into(), Value::Map(correct));
        fields.insert("explanationEnglish".into(), self.explanation_english.clone().into());
        fields.insert(
            "explanationTraditionalChinese".into(),
            self.explanation_traditional_chinese.clone().into(),
        );
        fields.insert("order".into(), self.order.into());
        fields.insert("points".into(), self.points.into());
        fields.insert("questionType".into(), MULTIPLE_CHOICE.into());
        fields
    }

    /// Lenient decode; missing fields fall back to empty values.
    pub fn from_document(doc: &Document) -> Self {
        let text = |name: &str| doc.get_str(name).unwrap_or_default().to_string();
        let int = |name: &str| doc.fields.get(name).and_then(Value::as_i64);

        let correct_choice_id = match doc.fields.get("correctAnswer") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Map(m)) => m.get("choiceId").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };

        let choices = doc
            .fields
            .get("choices")
            .and_then(Value::as_array)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_map)
            .map(|m| {
                let s = |name: &str| m.get(name).and_then(Value::as_str).map(str::to_string);
                Choice {
                    id: s("id").unwrap_or_default(),
                    text_english: s("textEnglish").or_else(|| s("text")).unwrap_or_default(),
                    text_traditional_chinese: s("textTraditionalChinese").unwrap_or_default(),
                }
            })
            .collect();

        Question {
            id: doc.id.clone(),
            text_english: text("questionTextEnglish"),
            text_traditional_chinese: text("questionTextTraditionalChinese"),
            choices,
            correct_choice_id,
            explanation_english: text("explanationEnglish"),
            explanation_traditional_chinese: text("explanationTraditionalChinese"),
            order: int("order").unwrap_or_default(),
            points: int("points").unwrap_or(DEFAULT_POINTS),
        }
    }

    pub fn is_correct(&self, choice: &Choice) -> bool {
        self.correct_choice_id.as_deref() == Some(choice.id.as_str())
    }
}
