// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    models::question::{PublicQuestion, Question, sanitize_question, validate_questions},
    utils::html::clean_html,
};

/// A quiz document. Questions (with their answer keys) are embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,

    /// Minimum total score for an attempt to pass.
    pub passing_score: u32,

    /// Sum of the questions' points. Recomputed whenever the questions change.
    pub total_points: u32,

    pub time_limit_minutes: Option<u32>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Whether `user_id` may edit or delete this quiz.
    pub fn is_managed_by(&self, user_id: Uuid, is_admin: bool) -> bool {
        is_admin || self.creator_id == user_id
    }

    /// Replaces the editable content with a validated request.
    pub fn apply(&mut self, req: QuizRequest, now: DateTime<Utc>) {
        let mut questions = req.questions;
        questions.iter_mut().for_each(sanitize_question);

        self.title = clean_html(&req.title);
        self.description = clean_html(&req.description);
        self.total_points = points_sum(&questions);
        self.questions = questions;
        self.passing_score = req.passing_score;
        self.time_limit_minutes = req.time_limit_minutes;
        self.is_published = req.is_published;
        self.updated_at = now;
    }

    pub fn from_request(req: QuizRequest, creator_id: Uuid, now: DateTime<Utc>) -> Self {
        let mut quiz = Quiz {
            id: Uuid::new_v4(),
            creator_id,
            title: String::new(),
            description: String::new(),
            questions: Vec::new(),
            passing_score: 0,
            total_points: 0,
            time_limit_minutes: None,
            is_published: false,
            created_at: now,
            updated_at: now,
        };
        quiz.apply(req, now);
        quiz
    }
}

/// Saturates instead of overflowing; validation bounds real quizzes far below `u32::MAX`.
pub fn points_sum(questions: &[Question]) -> u32 {
    questions
        .iter()
        .fold(0u32, |total, q| total.saturating_add(q.points))
}

/// DTO for creating or replacing a quiz.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_passing_score))]
pub struct QuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title length must be between 1 and 200 chars"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,

    #[validate(custom(function = validate_questions))]
    pub questions: Vec<Question>,

    pub passing_score: u32,

    #[validate(range(min = 1, max = 600))]
    pub time_limit_minutes: Option<u32>,

    #[serde(default)]
    pub is_published: bool,
}

fn validate_passing_score(req: &QuizRequest) -> Result<(), ValidationError> {
    if req.passing_score > points_sum(&req.questions) {
        return Err(ValidationError::new("passing_score_exceeds_total_points"));
    }
    Ok(())
}

/// Listing entry for the quiz catalogue.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub question_count: usize,
    pub total_points: u32,
    pub passing_score: u32,
    pub time_limit_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        QuizSummary {
            id: quiz.id,
            creator_id: quiz.creator_id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            question_count: quiz.questions.len(),
            total_points: quiz.total_points,
            passing_score: quiz.passing_score,
            time_limit_minutes: quiz.time_limit_minutes,
            created_at: quiz.created_at,
        }
    }
}

/// DTO for a quiz as seen by someone taking it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuiz {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub questions: Vec<PublicQuestion>,
    pub total_points: u32,
    pub passing_score: u32,
    pub time_limit_minutes: Option<u32>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        PublicQuiz {
            id: quiz.id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            questions: quiz.questions.iter().map(PublicQuestion::from).collect(),
            total_points: quiz.total_points,
            passing_score: quiz.passing_score,
            time_limit_minutes: quiz.time_limit_minutes,
        }
    }
}

/// Query parameters for the leaderboard.
#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<usize>,
}

/// One row of a quiz leaderboard, joined from attempts and users.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub total_score: i64,
    pub time_spent_seconds: Option<i64>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(passing_score: u32) -> QuizRequest {
        serde_json::from_value(json!({
            "title": "Capitals",
            "passingScore": passing_score,
            "questions": [
                {
                    "text": "Capital of France?",
                    "points": 2,
                    "type": "fill_blank",
                    "correctAnswers": ["Paris"]
                },
                {
                    "text": "Berlin is in Germany",
                    "points": 1,
                    "type": "true_false",
                    "correctBoolean": true
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_total_points_recomputed() {
        let quiz = Quiz::from_request(request(2), Uuid::new_v4(), Utc::now());
        assert_eq!(quiz.total_points, 3);
        assert_eq!(quiz.questions.len(), 2);
        assert!(!quiz.is_published);
    }

    #[test]
    fn test_passing_score_cannot_exceed_total() {
        assert!(request(3).validate().is_ok());
        assert!(request(4).validate().is_err());
    }

    #[test]
    fn test_oversized_points_fail_validation_without_overflow() {
        let mut req = request(1);
        for q in req.questions.iter_mut() {
            q.points = 4_000_000_000;
        }
        assert_eq!(points_sum(&req.questions), u32::MAX);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut req = request(1);
        req.title = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_managed_by_creator_or_admin() {
        let creator = Uuid::new_v4();
        let quiz = Quiz::from_request(request(1), creator, Utc::now());
        assert!(quiz.is_managed_by(creator, false));
        assert!(quiz.is_managed_by(Uuid::new_v4(), true));
        assert!(!quiz.is_managed_by(Uuid::new_v4(), false));
    }
}
