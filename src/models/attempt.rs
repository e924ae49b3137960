// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle of an attempt. The only transition is `InProgress -> Graded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Graded,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Graded => "graded",
        }
    }
}

/// One evaluated answer inside an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: Uuid,

    /// Raw submitted value; its shape depends on the question type.
    pub user_answer: Value,

    pub is_correct: bool,
    pub points_earned: u32,
}

/// One user's run through a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub status: AttemptStatus,

    /// Answers in quiz question order.
    pub answers: Vec<Answer>,

    pub total_score: u32,
    pub passed: bool,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: Option<i64>,
}

impl Attempt {
    pub fn start(user_id: Uuid, quiz_id: Uuid, now: DateTime<Utc>) -> Self {
        Attempt {
            id: Uuid::new_v4(),
            user_id,
            quiz_id,
            status: AttemptStatus::InProgress,
            answers: Vec::new(),
            total_score: 0,
            passed: false,
            started_at: now,
            submitted_at: None,
            time_spent_seconds: None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == AttemptStatus::InProgress
    }
}

/// A single `{questionId, answer}` pair from the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    #[serde(default)]
    pub answer: Value,
}

/// DTO for `POST /attempts/{id}/submit`.
#[derive(Debug, Deserialize, Default)]
pub struct SubmitAttemptRequest {
    /// May be empty when every answer was saved while the attempt was in progress.
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

/// Grading outcome returned from a submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptResponse {
    pub attempt_id: Uuid,
    pub total_score: u32,
    pub passed: bool,
    pub passing_score: u32,
    pub total_points: u32,
    pub time_spent_seconds: Option<i64>,
}

/// An answer as shown back to its owner. Correctness stays hidden until grading.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    pub question_id: Uuid,
    pub user_answer: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_earned: Option<u32>,
}

/// DTO for returning an attempt to its owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptView {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub status: AttemptStatus,
    pub answers: Vec<AnswerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: Option<i64>,
}

impl From<&Attempt> for AttemptView {
    fn from(attempt: &Attempt) -> Self {
        let graded = !attempt.is_in_progress();
        AttemptView {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            status: attempt.status,
            answers: attempt
                .answers
                .iter()
                .map(|a| AnswerView {
                    question_id: a.question_id,
                    user_answer: a.user_answer.clone(),
                    is_correct: graded.then_some(a.is_correct),
                    points_earned: graded.then_some(a.points_earned),
                })
                .collect(),
            total_score: graded.then_some(attempt.total_score),
            passed: graded.then_some(attempt.passed),
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
            time_spent_seconds: attempt.time_spent_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_progress_view_hides_correctness() {
        let mut attempt = Attempt::start(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        attempt.answers.push(Answer {
            question_id: Uuid::new_v4(),
            user_answer: json!("a"),
            is_correct: true,
            points_earned: 1,
        });

        let value = serde_json::to_value(AttemptView::from(&attempt)).unwrap();
        assert_eq!(value["status"], "in_progress");
        assert!(value["answers"][0].get("isCorrect").is_none());
        assert!(value.get("totalScore").is_none());
    }

    #[test]
    fn test_submit_request_answers_default_to_empty() {
        let req: SubmitAttemptRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.answers.is_empty());
    }
}
