//! Survey question types and answer validation.

use std::collections::HashSet;

use crate::types::DbId;

/// Survey status IDs matching `survey_statuses` seed data.
pub const SURVEY_ACTIVE: i16 = 1;
pub const SURVEY_INACTIVE: i16 = 2;

pub const QUESTION_TEXT: &str = "TEXT";
pub const QUESTION_RATING: &str = "RATING";

pub const VALID_QUESTION_TYPES: &[&str] = &[QUESTION_TEXT, QUESTION_RATING];

pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 5;

/// Longest free-text answer accepted.
pub const MAX_TEXT_ANSWER_LEN: usize = 2000;

pub fn validate_question_type(question_type: &str) -> Result<(), String> {
    if VALID_QUESTION_TYPES.contains(&question_type) {
        Ok(())
    } else {
        Err(format!(
            "Invalid question type '{question_type}'. Must be one of: {}",
            VALID_QUESTION_TYPES.join(", ")
        ))
    }
}

/// Check that an answer carries the field its question type expects.
pub fn validate_answer(
    question_type: &str,
    rating: Option<i32>,
    text: Option<&str>,
) -> Result<(), String> {
    match question_type {
        QUESTION_RATING => match rating {
            Some(r) if (RATING_MIN..=RATING_MAX).contains(&r) => Ok(()),
            Some(r) => Err(format!(
                "Rating must be between {RATING_MIN} and {RATING_MAX}, got {r}"
            )),
            None => Err("Rating questions require a rating".to_string()),
        },
        QUESTION_TEXT => match text.map(str::trim) {
            Some(t) if !t.is_empty() && t.len() <= MAX_TEXT_ANSWER_LEN => Ok(()),
            Some(t) if t.len() > MAX_TEXT_ANSWER_LEN => Err(format!(
                "Text answers must be at most {MAX_TEXT_ANSWER_LEN} characters"
            )),
            _ => Err("Text questions require a non-empty answer".to_string()),
        },
        other => validate_question_type(other),
    }
}

/// Required question ids with no answer, in the order given.
pub fn missing_required(required: &[DbId], answered: &[DbId]) -> Vec<DbId> {
    let answered: HashSet<DbId> = answered.iter().copied().collect();
    required
        .iter()
        .copied()
        .filter(|id| !answered.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_types() {
        assert!(validate_question_type("TEXT").is_ok());
        assert!(validate_question_type("RATING").is_ok());
        assert!(validate_question_type("CHOICE").is_err());
    }

    #[test]
    fn rating_answers() {
        assert!(validate_answer(QUESTION_RATING, Some(5), None).is_ok());
        assert!(validate_answer(QUESTION_RATING, Some(6), None).is_err());
        assert!(validate_answer(QUESTION_RATING, None, Some("great")).is_err());
    }

    #[test]
    fn text_answers() {
        assert!(validate_answer(QUESTION_TEXT, None, Some("fine")).is_ok());
        assert!(validate_answer(QUESTION_TEXT, None, Some("   ")).is_err());
        let long = "x".repeat(MAX_TEXT_ANSWER_LEN + 1);
        assert!(validate_answer(QUESTION_TEXT, None, Some(&long)).is_err());
    }

    #[test]
    fn missing_required_questions() {
        assert_eq!(missing_required(&[1, 2, 3], &[2]), vec![1, 3]);
        assert!(missing_required(&[1], &[1, 5]).is_empty());
    }
}
