use async_trait::async_trait;
use residency_core::{Progress, ProgressStatus, QuizAnswer};
use residency_runtime::{ProgressFilter, ProgressRepository, StoreError};
use sqlx::Row;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{Conditions, PgStore, map_err, parse_text};

const PROGRESS_COLUMNS: &str = "id, user_id, course_id, topic_id, lesson_id, status, \
     time_spent_seconds, quiz_score, quiz_passed, quiz_attempts, answers, last_attempt_at, \
     started_at, completed_at, created_at, updated_at";

fn progress_from_row(row: &PgRow) -> Result<Progress, StoreError> {
    let status: String = row.try_get("status").map_err(map_err)?;
    let Json(answers): Json<Vec<QuizAnswer>> = row.try_get("answers").map_err(map_err)?;
    Ok(Progress {
        id: row.try_get("id").map_err(map_err)?,
        user_id: row.try_get("user_id").map_err(map_err)?,
        course_id: row.try_get("course_id").map_err(map_err)?,
        topic_id: row.try_get("topic_id").map_err(map_err)?,
        lesson_id: row.try_get("lesson_id").map_err(map_err)?,
        status: parse_text("status", &status)?,
        time_spent_seconds: row.try_get("time_spent_seconds").map_err(map_err)?,
        quiz_score: row.try_get("quiz_score").map_err(map_err)?,
        quiz_passed: row.try_get("quiz_passed").map_err(map_err)?,
        quiz_attempts: row.try_get("quiz_attempts").map_err(map_err)?,
        answers,
        last_attempt_at: row.try_get("last_attempt_at").map_err(map_err)?,
        started_at: row.try_get("started_at").map_err(map_err)?,
        completed_at: row.try_get("completed_at").map_err(map_err)?,
        created_at: row.try_get("created_at").map_err(map_err)?,
        updated_at: row.try_get("updated_at").map_err(map_err)?,
    })
}

#[async_trait]
impl ProgressRepository for PgStore {
    async fn find_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<Progress>, StoreError> {
        let sql =
            format!("SELECT {PROGRESS_COLUMNS} FROM progresses WHERE user_id = $1 AND lesson_id = $2");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(lesson_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(progress_from_row).transpose()
    }

    async fn save_progress(&self, progress: &Progress) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO progresses
                (id, user_id, course_id, topic_id, lesson_id, status, time_spent_seconds,
                 quiz_score, quiz_passed, quiz_attempts, answers, last_attempt_at, started_at,
                 completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (user_id, lesson_id) DO UPDATE SET
                course_id = EXCLUDED.course_id,
                topic_id = EXCLUDED.topic_id,
                status = EXCLUDED.status,
                time_spent_seconds = EXCLUDED.time_spent_seconds,
                quiz_score = EXCLUDED.quiz_score,
                quiz_passed = EXCLUDED.quiz_passed,
                quiz_attempts = EXCLUDED.quiz_attempts,
                answers = EXCLUDED.answers,
                last_attempt_at = EXCLUDED.last_attempt_at,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(progress.id)
        .bind(progress.user_id)
        .bind(progress.course_id)
        .bind(progress.topic_id)
        .bind(progress.lesson_id)
        .bind(progress.status.as_str())
        .bind(progress.time_spent_seconds)
        .bind(progress.quiz_score)
        .bind(progress.quiz_passed)
        .bind(progress.quiz_attempts)
        .bind(Json(&progress.answers))
        .bind(progress.last_attempt_at)
        .bind(progress.started_at)
        .bind(progress.completed_at)
        .bind(progress.created_at)
        .bind(progress.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn list_progress_for_user(
        &self,
        user_id: Uuid,
        course_id: Option<Uuid>,
    ) -> Result<Vec<Progress>, StoreError> {
        let sql = format!(
            r"
            SELECT {PROGRESS_COLUMNS} FROM progresses
            WHERE user_id = $1 AND ($2::uuid IS NULL OR course_id = $2)
            ORDER BY updated_at DESC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(course_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_err)?;
        rows.iter().map(progress_from_row).collect()
    }

    async fn count_progress(&self, filter: ProgressFilter) -> Result<u64, StoreError> {
        let mut cond = Conditions::new();
        if let Some(user_id) = filter.user_id {
            cond.push("user_id = {}", user_id)?;
        }
        if let Some(lesson_id) = filter.lesson_id {
            cond.push("lesson_id = {}", lesson_id)?;
        }
        if filter.completed_only {
            cond.push("status = {}", ProgressStatus::Completed.as_str().to_string())?;
        }
        self.count_where("progresses", cond).await
    }
}
