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

use super::Mooc;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Enrollment {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    current_mooc_id: Option<Uuid>,
    moocs_completed: i32,
    progress: f64,
    overall_score: Option<f64>,
    enrolled_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ResourceTyped for Enrollment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Enrollment
    }
}

impl Enrollment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn current_mooc_id(&self) -> Option<Uuid> {
        self.current_mooc_id
    }

    pub fn moocs_completed(&self) -> i32 {
        self.moocs_completed
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn overall_score(&self) -> Option<f64> {
        self.overall_score
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

#[async_trait]
impl HasOwner for Enrollment {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}

impl Enrollment {
    /// Enrolls `user_id` positioned on the first module of the course. An
    /// existing enrollment is returned untouched.
    pub async fn create(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let first = Mooc::first_in_course(&mut *conn, course_id).await?;

        sqlx::query(
            r#"
            INSERT INTO enrollments (id, user_id, course_id, current_mooc_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(course_id)
        .bind(first.map(|m| m.id()))
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query_as("SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn find(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2")
                .bind(actor.user_id())
                .bind(course_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(result)
    }

    /// Row lock for the duration of the surrounding transaction.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(conn)
        .await?;
        Ok(result)
    }

    /// Moves the enrollment to `next` after a module was passed.
    pub async fn advance(
        &self,
        conn: &mut PgConnection,
        next: Uuid,
        progress: f64,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE enrollments
            SET current_mooc_id = $1, moocs_completed = moocs_completed + 1, progress = $2
            WHERE id = $3
            "#,
        )
        .bind(next)
        .bind(progress)
        .bind(self.id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Records the last module as passed.
    pub async fn finish_moocs(
        &self,
        conn: &mut PgConnection,
        overall_score: Option<f64>,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE enrollments
            SET moocs_completed = moocs_completed + 1, progress = 100, overall_score = $1
            WHERE id = $2
            "#,
        )
        .bind(overall_score)
        .bind(self.id)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn mark_completed(&self, conn: &mut PgConnection) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE enrollments
            SET completed_at = COALESCE(completed_at, NOW()), progress = 100
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .execute(conn)
        .await?;
        Ok(())
    }
}

/// Enrollment joined with its course for the learner dashboard.
#[derive(Debug, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct EnrollmentWithCourseRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub level: String,
    pub current_mooc_id: Option<Uuid>,
    pub moocs_completed: i32,
    pub progress: f64,
    pub overall_score: Option<f64>,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EnrollmentWithCourseRow {
    pub async fn fetch_all(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                e.id,
                e.course_id,
                c.title AS course_title,
                c.level,
                e.current_mooc_id,
                e.moocs_completed,
                e.progress,
                e.overall_score,
                e.enrolled_at,
                e.completed_at
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.user_id = $1
            ORDER BY e.enrolled_at DESC
            "#,
        )
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
