// src/grading/review.rs

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    grading::evaluator::{as_bool, as_number, as_string_list, as_string_map},
    models::{
        attempt::Attempt,
        question::{ChoiceOption, Question, QuestionKind},
        quiz::Quiz,
    },
};

/// Per-question breakdown of a graded attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReview {
    pub attempt_id: Uuid,
    pub quiz_id: Uuid,
    pub quiz_title: String,
    pub total_score: u32,
    pub total_points: u32,
    pub passing_score: u32,
    pub passed: bool,
    pub time_spent_seconds: Option<i64>,
    pub questions: Vec<QuestionReview>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    pub question_id: Uuid,
    pub question_type: &'static str,
    pub text: String,
    pub points: u32,
    pub points_earned: u32,
    pub is_correct: bool,
    pub answered: bool,
    /// What the user answered, as display text. Empty when unanswered.
    pub submitted: String,
    /// The accepted answer, as display text.
    pub correct: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Builds the review shown after grading, one entry per quiz question.
/// Answers whose question has since been removed from the quiz are skipped.
pub fn review_attempt(attempt: &Attempt, quiz: &Quiz) -> AttemptReview {
    let questions = quiz
        .questions
        .iter()
        .map(|question| {
            let answer = attempt
                .answers
                .iter()
                .find(|a| a.question_id == question.id);
            QuestionReview {
                question_id: question.id,
                question_type: question.kind.type_name(),
                text: question.text.clone(),
                points: question.points,
                points_earned: answer.map_or(0, |a| a.points_earned),
                is_correct: answer.is_some_and(|a| a.is_correct),
                answered: answer.is_some(),
                submitted: answer
                    .map(|a| submitted_text(question, &a.user_answer))
                    .unwrap_or_default(),
                correct: correct_text(question),
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    AttemptReview {
        attempt_id: attempt.id,
        quiz_id: quiz.id,
        quiz_title: quiz.title.clone(),
        total_score: attempt.total_score,
        total_points: quiz.total_points,
        passing_score: quiz.passing_score,
        passed: attempt.passed,
        time_spent_seconds: attempt.time_spent_seconds,
        questions,
    }
}

fn label<'a>(options: &'a [ChoiceOption], id: &'a str) -> &'a str {
    options
        .iter()
        .find(|o| o.id == id)
        .map(|o| o.text.as_str())
        .unwrap_or(id)
}

fn labels<'a, I>(options: &'a [ChoiceOption], ids: I, sep: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    ids.into_iter()
        .map(|id| label(options, id))
        .collect::<Vec<_>>()
        .join(sep)
}

fn bool_text(b: bool) -> String {
    let text = if b { "True" } else { "False" };
    text.to_string()
}

/// Fallback for answers whose shape does not fit the question type.
fn raw(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pairs_text<'a, I>(left: &'a [ChoiceOption], right: &'a [ChoiceOption], pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
    // follow the author's left column order
    pairs.sort_by_key(|(l, _)| left.iter().position(|o| o.id == *l).unwrap_or(usize::MAX));
    pairs
        .into_iter()
        .map(|(l, r)| format!("{} -> {}", label(left, l), label(right, r)))
        .collect::<Vec<_>>()
        .join("; ")
}

fn submitted_text(question: &Question, value: &Value) -> String {
    match &question.kind {
        QuestionKind::SingleChoice { options, .. } | QuestionKind::ImageChoice { options, .. } => {
            match value.as_str() {
                Some(id) => label(options, id).to_string(),
                None => raw(value),
            }
        }
        QuestionKind::MultiChoice { options, .. } => match as_string_list(value) {
            Some(ids) => labels(options, ids, ", "),
            None => raw(value),
        },
        QuestionKind::TrueFalse { .. } => as_bool(value).map(bool_text).unwrap_or_else(|| raw(value)),
        QuestionKind::FillBlank { .. } | QuestionKind::ClozeTest { .. } => raw(value),
        QuestionKind::NumericInput { .. } => as_number(value)
            .map(|n| n.to_string())
            .unwrap_or_else(|| raw(value)),
        QuestionKind::Ordering { items, .. } => match as_string_list(value) {
            Some(ids) => labels(items, ids, " -> "),
            None => raw(value),
        },
        QuestionKind::Matching {
            left_items,
            right_items,
            ..
        } => match as_string_map(value) {
            Some(map) => pairs_text(left_items, right_items, map),
            None => raw(value),
        },
    }
}

fn correct_text(question: &Question) -> String {
    match &question.kind {
        QuestionKind::SingleChoice {
            options,
            correct_option_id,
        }
        | QuestionKind::ImageChoice {
            options,
            correct_option_id,
        } => label(options, correct_option_id).to_string(),
        QuestionKind::MultiChoice {
            options,
            correct_option_ids,
        } => labels(options, correct_option_ids.iter().map(String::as_str), ", "),
        QuestionKind::TrueFalse { correct_boolean } => bool_text(*correct_boolean),
        QuestionKind::FillBlank {
            correct_answers, ..
        }
        | QuestionKind::ClozeTest {
            correct_answers, ..
        } => correct_answers.join(" / "),
        QuestionKind::NumericInput {
            correct_number,
            tolerance,
        } => {
            if *tolerance > 0.0 {
                format!("{} ± {}", correct_number, tolerance)
            } else {
                correct_number.to_string()
            }
        }
        QuestionKind::Ordering {
            items,
            correct_order,
        } => labels(items, correct_order.iter().map(String::as_str), " -> "),
        QuestionKind::Matching {
            left_items,
            right_items,
            correct_pairs,
        } => pairs_text(
            left_items,
            right_items,
            correct_pairs.iter().map(|(l, r)| (l.as_str(), r.as_str())),
        ),
    }
}
