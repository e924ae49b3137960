// src/store/postgres.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, types::Json};
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

/// PostgreSQL backend. Quizzes and attempts are stored as JSONB documents,
/// with the columns needed for filtering and ordering kept alongside.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Logs the failing operation and turns the error into a 500.
fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("Failed to {}: {:?}", operation, e);
        AppError::InternalServerError(e.to_string())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if duplicate {
                AppError::Conflict(format!("Username '{}' already exists", user.username))
            } else {
                db_error("create user")(e)
            }
        })?;

        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("fetch user"))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("fetch user by username"))
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list users"))
    }
}

#[async_trait]
impl QuizRepository for PgStore {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO quizzes (id, creator_id, is_published, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(quiz.id)
        .bind(quiz.creator_id)
        .bind(quiz.is_published)
        .bind(Json(quiz))
        .bind(quiz.created_at)
        .bind(quiz.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("insert quiz"))?;

        Ok(())
    }

    async fn find_quiz(&self, id: Uuid) -> Result<Option<Quiz>, AppError> {
        let doc = sqlx::query_scalar::<_, Json<Quiz>>("SELECT document FROM quizzes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("fetch quiz"))?;

        Ok(doc.map(|Json(quiz)| quiz))
    }

    async fn list_published_quizzes(&self) -> Result<Vec<Quiz>, AppError> {
        let docs = sqlx::query_scalar::<_, Json<Quiz>>(
            "SELECT document FROM quizzes WHERE is_published ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list quizzes"))?;

        Ok(docs.into_iter().map(|Json(quiz)| quiz).collect())
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE quizzes
            SET is_published = $2, document = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(quiz.id)
        .bind(quiz.is_published)
        .bind(Json(quiz))
        .bind(quiz.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("update quiz"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<bool, AppError> {
        // attempts go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete quiz"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AttemptRepository for PgStore {
    async fn insert_attempt(&self, attempt: &Attempt) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO attempts
            (id, user_id, quiz_id, status, total_score, time_spent_seconds, document, started_at, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.user_id)
        .bind(attempt.quiz_id)
        .bind(attempt.status.as_str())
        .bind(i64::from(attempt.total_score))
        .bind(attempt.time_spent_seconds)
        .bind(Json(attempt))
        .bind(attempt.started_at)
        .bind(attempt.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("insert attempt"))?;

        Ok(())
    }

    async fn find_attempt(&self, id: Uuid) -> Result<Option<Attempt>, AppError> {
        let doc =
            sqlx::query_scalar::<_, Json<Attempt>>("SELECT document FROM attempts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("fetch attempt"))?;

        Ok(doc.map(|Json(attempt)| attempt))
    }

    async fn list_attempts_for_user(&self, user_id: Uuid) -> Result<Vec<Attempt>, AppError> {
        let docs = sqlx::query_scalar::<_, Json<Attempt>>(
            "SELECT document FROM attempts WHERE user_id = $1 ORDER BY started_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list attempts"))?;

        Ok(docs.into_iter().map(|Json(attempt)| attempt).collect())
    }

    async fn save_progress(
        &self,
        previous: &Attempt,
        updated: &Attempt,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attempts SET document = $2
            WHERE id = $1 AND status = $3 AND document -> 'answers' = $4
            "#,
        )
        .bind(updated.id)
        .bind(Json(updated))
        .bind(AttemptStatus::InProgress.as_str())
        .bind(Json(&previous.answers))
        .execute(&self.pool)
        .await
        .map_err(db_error("save attempt progress"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_attempt(&self, attempt: &Attempt) -> Result<bool, AppError> {
        // The status guard makes the transition single-shot even under concurrent submits.
        let result = sqlx::query(
            r#"
            UPDATE attempts
            SET status = $2, total_score = $3, time_spent_seconds = $4,
                document = $5, submitted_at = $6
            WHERE id = $1 AND status = $7
            "#,
        )
        .bind(attempt.id)
        .bind(AttemptStatus::Graded.as_str())
        .bind(i64::from(attempt.total_score))
        .bind(attempt.time_spent_seconds)
        .bind(Json(attempt))
        .bind(attempt.submitted_at.unwrap_or_else(Utc::now))
        .bind(AttemptStatus::InProgress.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("complete attempt"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn leaderboard(
        &self,
        quiz_id: Uuid,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT
                u.username,
                a.total_score,
                a.time_spent_seconds,
                a.submitted_at
            FROM attempts a
            JOIN users u ON a.user_id = u.id
            WHERE a.quiz_id = $1 AND a.status = $2
            ORDER BY a.total_score DESC, a.time_spent_seconds ASC NULLS LAST, a.submitted_at ASC
            LIMIT $3
            "#,
        )
        .bind(quiz_id)
        .bind(AttemptStatus::Graded.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch leaderboard"))
    }
}
