// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptStatus},
        quiz::{LeaderboardEntry, Quiz},
        user::User,
    },
    store::{AttemptRepository, QuizRepository, UserRepository},
};

/// Process-local store used when no database is configured, and by the
/// integration tests. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    quizzes: HashMap<Uuid, Quiz>,
    attempts: HashMap<Uuid, Attempt>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.inner.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), AppError> {
        self.inner.write().await.quizzes.insert(quiz.id, quiz.clone());
        Ok(())
    }

    async fn find_quiz(&self, id: Uuid) -> Result<Option<Quiz>, AppError> {
        Ok(self.inner.read().await.quizzes.get(&id).cloned())
    }

    async fn list_published_quizzes(&self) -> Result<Vec<Quiz>, AppError> {
        let inner = self.inner.read().await;
        let mut quizzes: Vec<Quiz> = inner
            .quizzes
            .values()
            .filter(|q| q.is_published)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quizzes)
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.quizzes.get_mut(&quiz.id) {
            Some(stored) => {
                *stored = quiz.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        let removed = inner.quizzes.remove(&id).is_some();
        if removed {
            inner.attempts.retain(|_, a| a.quiz_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl AttemptRepository for MemoryStore {
    async fn insert_attempt(&self, attempt: &Attempt) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .attempts
            .insert(attempt.id, attempt.clone());
        Ok(())
    }

    async fn find_attempt(&self, id: Uuid) -> Result<Option<Attempt>, AppError> {
        Ok(self.inner.read().await.attempts.get(&id).cloned())
    }

    async fn list_attempts_for_user(&self, user_id: Uuid) -> Result<Vec<Attempt>, AppError> {
        let inner = self.inner.read().await;
        let mut attempts: Vec<Attempt> = inner
            .attempts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(attempts)
    }

    async fn save_progress(
        &self,
        previous: &Attempt,
        updated: &Attempt,
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.attempts.get_mut(&updated.id) {
            Some(stored) if stored.is_in_progress() && stored.answers == previous.answers => {
                stored.answers = updated.answers.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_attempt(&self, attempt: &Attempt) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.attempts.get_mut(&attempt.id) {
            Some(stored) if stored.status == AttemptStatus::InProgress => {
                *stored = attempt.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn leaderboard(
        &self,
        quiz_id: Uuid,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let inner = self.inner.read().await;
        let mut graded: Vec<&Attempt> = inner
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.status == AttemptStatus::Graded)
            .collect();
        graded.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| {
                    let a_time = a.time_spent_seconds.unwrap_or(i64::MAX);
                    let b_time = b.time_spent_seconds.unwrap_or(i64::MAX);
                    a_time.cmp(&b_time)
                })
                .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        });

        Ok(graded
            .into_iter()
            .filter_map(|a| {
                let user = inner.users.get(&a.user_id)?;
                Some(LeaderboardEntry {
                    username: user.username.clone(),
                    total_score: i64::from(a.total_score),
                    time_spent_seconds: a.time_spent_seconds,
                    submitted_at: a.submitted_at,
                })
            })
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::Answer;
    use chrono::{Duration, Utc};

    fn user(name: &str) -> User {
        User::new(name.to_string(), "hash".to_string(), "user")
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user(&user("alice")).await.unwrap();
        let err = store.create_user(&user("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_complete_attempt_only_once() {
        let store = MemoryStore::new();
        let attempt = Attempt::start(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        store.insert_attempt(&attempt).await.unwrap();

        let mut graded = attempt.clone();
        graded.status = AttemptStatus::Graded;
        graded.total_score = 5;
        assert!(store.complete_attempt(&graded).await.unwrap());

        let mut regraded = graded.clone();
        regraded.total_score = 0;
        assert!(!store.complete_attempt(&regraded).await.unwrap());

        let stored = store.find_attempt(attempt.id).await.unwrap().unwrap();
        assert_eq!(stored.total_score, 5);
        assert!(!store.save_progress(&attempt, &attempt).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_save_is_refused() {
        let store = MemoryStore::new();
        let attempt = Attempt::start(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        store.insert_attempt(&attempt).await.unwrap();

        let answer = |value: serde_json::Value| Answer {
            question_id: Uuid::new_v4(),
            user_answer: value,
            is_correct: false,
            points_earned: 0,
        };

        let mut first = attempt.clone();
        first.answers.push(answer(serde_json::json!("a")));
        assert!(store.save_progress(&attempt, &first).await.unwrap());

        // a writer that read before `first` landed must not overwrite it
        let mut stale = attempt.clone();
        stale.answers.push(answer(serde_json::json!("b")));
        assert!(!store.save_progress(&attempt, &stale).await.unwrap());

        let stored = store.find_attempt(attempt.id).await.unwrap().unwrap();
        assert_eq!(stored.answers, first.answers);
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_score_then_time() {
        let store = MemoryStore::new();
        let quiz_id = Uuid::new_v4();
        let now = Utc::now();
        for (name, score, secs) in [("slow", 3, 90), ("fast", 3, 30), ("low", 1, 10)] {
            let u = user(name);
            store.create_user(&u).await.unwrap();
            let mut attempt = Attempt::start(u.id, quiz_id, now);
            store.insert_attempt(&attempt).await.unwrap();
            attempt.status = AttemptStatus::Graded;
            attempt.total_score = score;
            attempt.time_spent_seconds = Some(secs);
            attempt.submitted_at = Some(now + Duration::seconds(secs));
            store.complete_attempt(&attempt).await.unwrap();
        }

        let board = store.leaderboard(quiz_id, 2).await.unwrap();
        let names: Vec<&str> = board.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["fast", "slow"]);
    }
}
