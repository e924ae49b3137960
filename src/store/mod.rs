// src/store/mod.rs

//! Persistence seams. Handlers only see these traits through `AppState`,
//! so the backing store is chosen once at startup.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::Attempt,
        quiz::{LeaderboardEntry, Quiz},
        user::User,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `AppError::Conflict` when the username is taken.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), AppError>;

    async fn find_quiz(&self, id: Uuid) -> Result<Option<Quiz>, AppError>;

    /// Published quizzes, newest first.
    async fn list_published_quizzes(&self) -> Result<Vec<Quiz>, AppError>;

    /// Replaces the stored document. Returns `false` if the quiz no longer exists.
    async fn update_quiz(&self, quiz: &Quiz) -> Result<bool, AppError>;

    /// Deletes the quiz and its attempts. Returns `false` if nothing was deleted.
    async fn delete_quiz(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn insert_attempt(&self, attempt: &Attempt) -> Result<(), AppError>;

    async fn find_attempt(&self, id: Uuid) -> Result<Option<Attempt>, AppError>;

    /// The user's attempts, newest first.
    async fn list_attempts_for_user(&self, user_id: Uuid) -> Result<Vec<Attempt>, AppError>;

    /// Stores `updated`'s saved answers, compare-and-set style: applies only
    /// while the stored attempt is still in progress and its answers are still
    /// those of `previous`. Returns `false` otherwise, so the caller can reload.
    async fn save_progress(&self, previous: &Attempt, updated: &Attempt)
    -> Result<bool, AppError>;

    /// Commits a graded attempt. The `in_progress -> graded` transition happens
    /// at most once: returns `false` if the stored attempt was already graded.
    async fn complete_attempt(&self, attempt: &Attempt) -> Result<bool, AppError>;

    /// Best graded attempts of a quiz: highest score first, faster first on ties.
    async fn leaderboard(&self, quiz_id: Uuid, limit: usize)
    -> Result<Vec<LeaderboardEntry>, AppError>;
}

/// A backend implementing every repository.
pub trait Store: UserRepository + QuizRepository + AttemptRepository {}

impl<T> Store for T where T: UserRepository + QuizRepository + AttemptRepository {}
