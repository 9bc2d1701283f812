use crate::exam::{Grade, SubmittedAnswer};
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct ExamAttempt {
    id: Uuid,
    user_id: Uuid,
    mooc_id: Uuid,
    #[serde(skip)]
    question_ids: Vec<Uuid>,
    total_questions: i32,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    time_taken: Option<i32>,
    correct_answers: Option<i32>,
    score: Option<f64>,
    passed: Option<bool>,
    #[serde(skip)]
    answers: Option<serde_json::Value>,
}

impl ResourceTyped for ExamAttempt {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::ExamAttempt
    }
}

impl ExamAttempt {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn mooc_id(&self) -> Uuid {
        self.mooc_id
    }

    pub fn question_ids(&self) -> &[Uuid] {
        &self.question_ids
    }

    pub fn total_questions(&self) -> i32 {
        self.total_questions
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    pub fn time_taken(&self) -> Option<i32> {
        self.time_taken
    }

    pub fn correct_answers(&self) -> Option<i32> {
        self.correct_answers
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn passed(&self) -> bool {
        self.passed.unwrap_or(false)
    }

    /// Answers recorded at submission; empty for unsubmitted attempts.
    pub fn answers(&self) -> DatabaseResult<Vec<SubmittedAnswer>> {
        match &self.answers {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl HasOwner for ExamAttempt {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}

impl ExamAttempt {
    pub async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        mooc_id: Uuid,
        question_ids: &[Uuid],
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO exam_attempts (id, user_id, mooc_id, question_ids, total_questions, started_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(mooc_id)
        .bind(question_ids)
        .bind(question_ids.len() as i32)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM exam_attempts WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn last_started_at(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        mooc_id: Uuid,
    ) -> DatabaseResult<Option<DateTime<Utc>>> {
        let result: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT MAX(started_at) FROM exam_attempts WHERE user_id = $1 AND mooc_id = $2",
        )
        .bind(actor.user_id())
        .bind(mooc_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }

    /// Attempts of the actor on a module, newest first.
    pub async fn history(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        mooc_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM exam_attempts WHERE user_id = $1 AND mooc_id = $2 ORDER BY started_at DESC",
        )
        .bind(actor.user_id())
        .bind(mooc_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// Stores the grade unless the attempt was already submitted. Returns
    /// `false` when another submission won the race.
    pub async fn record_submission(
        &self,
        conn: &mut PgConnection,
        grade: &Grade,
        time_taken: i32,
        answers: &[SubmittedAnswer],
    ) -> DatabaseResult<bool> {
        let answers = serde_json::to_value(answers)?;
        let result = sqlx::query(
            r#"
            UPDATE exam_attempts
            SET submitted_at = NOW(),
                time_taken = $1,
                correct_answers = $2,
                score = $3,
                passed = $4,
                answers = $5
            WHERE id = $6 AND submitted_at IS NULL
            "#,
        )
        .bind(time_taken)
        .bind(grade.correct_answers)
        .bind(grade.score)
        .bind(grade.passed)
        .bind(answers)
        .bind(self.id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Number of passing attempts on the module other than `except`.
    pub async fn count_other_passes(
        conn: &mut PgConnection,
        user_id: Uuid,
        mooc_id: Uuid,
        except: Uuid,
    ) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM exam_attempts
            WHERE user_id = $1 AND mooc_id = $2 AND passed AND id <> $3
            "#,
        )
        .bind(user_id)
        .bind(mooc_id)
        .bind(except)
        .fetch_one(conn)
        .await?;
        Ok(result)
    }

    /// Average score of the passing attempts in a course.
    pub async fn average_passing_score(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<f64>> {
        let result: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT AVG(ea.score) FROM exam_attempts ea
            JOIN moocs m ON m.id = ea.mooc_id
            WHERE ea.user_id = $1 AND m.course_id = $2 AND ea.passed
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(conn)
        .await?;
        Ok(result)
    }

    /// Number of modules of a course with at least one passing attempt.
    pub async fn count_passed_moocs(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT ea.mooc_id) FROM exam_attempts ea
            JOIN moocs m ON m.id = ea.mooc_id
            WHERE ea.user_id = $1 AND m.course_id = $2 AND ea.passed
            "#,
        )
        .bind(actor.user_id())
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }
}

/// Aggregates over the actor's attempts on one module.
#[derive(Debug, sqlx::FromRow)]
pub struct AttemptStatsRow {
    pub previous_attempts: i64,
    pub best_score: Option<f64>,
    pub last_attempt_date: Option<DateTime<Utc>>,
}

impl AttemptStatsRow {
    pub async fn fetch(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        mooc_id: Uuid,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS previous_attempts,
                MAX(score) AS best_score,
                MAX(submitted_at) AS last_attempt_date
            FROM exam_attempts
            WHERE user_id = $1 AND mooc_id = $2
            "#,
        )
        .bind(actor.user_id())
        .bind(mooc_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }
}
