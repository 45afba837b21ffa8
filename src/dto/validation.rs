//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

use crate::dto::round::{QuestionDto, QuestionKindDto};

/// Rejects strings that are empty once trimmed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Rejects NaN and infinite numbers.
pub fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        let mut err = ValidationError::new("not_finite");
        err.message = Some("must be a finite number".into());
        return Err(err);
    }
    Ok(())
}

/// Checks a whole question list: identifiers are non-blank and unique, point
/// values are finite and non-negative, choice questions list their correct option.
pub fn validate_questions(questions: &[QuestionDto]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(questions.len());
    for question in questions {
        let id = question.id.trim();
        if id.is_empty() {
            return Err(question_error("question_id_blank", "question ids must not be blank".into()));
        }
        if !seen.insert(id) {
            return Err(question_error(
                "question_id_duplicate",
                format!("question id `{id}` is used more than once"),
            ));
        }
        if !question.points.is_finite() || question.points < 0.0 {
            return Err(question_error(
                "question_points",
                format!("question `{id}` must be worth a finite, non-negative number of points"),
            ));
        }
        if question.kind == QuestionKindDto::Choice {
            let Some(correct) = question.correct_option.as_deref() else {
                return Err(question_error(
                    "choice_without_answer",
                    format!("choice question `{id}` needs a correctOption"),
                ));
            };
            let listed = question
                .options
                .iter()
                .any(|option| option.trim().eq_ignore_ascii_case(correct.trim()));
            if !listed {
                return Err(question_error(
                    "choice_answer_not_listed",
                    format!("choice question `{id}` must list its correctOption among options"),
                ));
            }
        }
        if question.kind == QuestionKindDto::Number {
            if let Some(target) = question.correct_option.as_deref() {
                if crate::evaluation::parse_number(target).is_none() {
                    return Err(question_error(
                        "number_target",
                        format!("number question `{id}` has a non-numeric correctOption"),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn question_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}
