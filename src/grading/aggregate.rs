// src/grading/aggregate.rs

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    grading::{GradingError, evaluator::evaluate},
    models::{
        attempt::{Answer, Attempt, AttemptStatus, SubmittedAnswer},
        quiz::Quiz,
    },
};

/// Sums earned points and compares them against the passing score.
/// Returns `(total_score, passed)`.
pub fn score(answers: &[Answer], passing_score: u32) -> (u32, bool) {
    let total = answers
        .iter()
        .fold(0u32, |total, a| total.saturating_add(a.points_earned));
    (total, total >= passing_score)
}

/// Whole seconds between start and submission, never negative.
pub fn elapsed_seconds(started_at: DateTime<Utc>, submitted_at: DateTime<Utc>) -> i64 {
    (submitted_at - started_at).num_seconds().max(0)
}

/// Whether `now` is past the quiz's time limit for this attempt.
pub fn time_limit_exceeded(attempt: &Attempt, quiz: &Quiz, now: DateTime<Utc>) -> bool {
    quiz.time_limit_minutes
        .is_some_and(|minutes| now > attempt.started_at + Duration::minutes(i64::from(minutes)))
}

/// Saves one answer on an in-progress attempt, replacing any earlier answer to
/// the same question. Returns the updated attempt; the input is not modified.
pub fn record_answer(
    attempt: &Attempt,
    quiz: &Quiz,
    submission: &SubmittedAnswer,
    now: DateTime<Utc>,
) -> Result<Attempt, GradingError> {
    if !attempt.is_in_progress() {
        return Err(GradingError::AlreadySubmitted);
    }
    if time_limit_exceeded(attempt, quiz, now) {
        return Err(GradingError::TimeLimitExceeded);
    }
    ensure_known(quiz, std::slice::from_ref(submission))?;

    let mut merged = saved_answers(attempt);
    merged.insert(submission.question_id, submission.answer.clone());

    let mut updated = attempt.clone();
    updated.answers = evaluate_in_quiz_order(quiz, &merged);
    Ok(updated)
}

/// Grades an attempt: merges the final submissions over answers saved during
/// progress, re-evaluates everything against the quiz, and returns the graded
/// copy. Score and pass flag are recomputed from scratch.
///
/// Past the time limit the submissions are ignored and only saved answers
/// count. Saved answers to questions the quiz no longer has are dropped.
pub fn grade_attempt(
    attempt: &Attempt,
    quiz: &Quiz,
    submissions: &[SubmittedAnswer],
    submitted_at: DateTime<Utc>,
) -> Result<Attempt, GradingError> {
    if !attempt.is_in_progress() {
        return Err(GradingError::AlreadySubmitted);
    }
    ensure_known(quiz, submissions)?;

    let mut merged = saved_answers(attempt);
    if !time_limit_exceeded(attempt, quiz, submitted_at) {
        for submission in submissions {
            merged.insert(submission.question_id, submission.answer.clone());
        }
    }

    let answers = evaluate_in_quiz_order(quiz, &merged);
    let (total_score, passed) = score(&answers, quiz.passing_score);

    Ok(Attempt {
        status: AttemptStatus::Graded,
        answers,
        total_score,
        passed,
        submitted_at: Some(submitted_at),
        time_spent_seconds: Some(elapsed_seconds(attempt.started_at, submitted_at)),
        ..attempt.clone()
    })
}

fn saved_answers(attempt: &Attempt) -> HashMap<Uuid, Value> {
    attempt
        .answers
        .iter()
        .map(|a| (a.question_id, a.user_answer.clone()))
        .collect()
}

fn ensure_known(quiz: &Quiz, submissions: &[SubmittedAnswer]) -> Result<(), GradingError> {
    match submissions.iter().find(|s| quiz.question(s.question_id).is_none()) {
        Some(unknown) => Err(GradingError::UnknownQuestion(unknown.question_id)),
        None => Ok(()),
    }
}

/// Answers keyed by questions missing from the quiz are left out.
fn evaluate_in_quiz_order(quiz: &Quiz, answers: &HashMap<Uuid, Value>) -> Vec<Answer> {
    quiz
        .questions
        .iter()
        .filter_map(|q| {
            let user_answer = answers.get(&q.id)?;
            let evaluation = evaluate(q, user_answer);
            Some(Answer {
                question_id: q.id,
                user_answer: user_answer.clone(),
                is_correct: evaluation.is_correct,
                points_earned: evaluation.points_earned,
            })
        })
        .collect()
}
