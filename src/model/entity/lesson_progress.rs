use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct LessonProgress {
    id: Uuid,
    user_id: Uuid,
    lesson_id: Uuid,
    completed: bool,
    last_position_sec: i32,
    updated_at: DateTime<Utc>,
}

impl ResourceTyped for LessonProgress {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::LessonProgress
    }
}

impl LessonProgress {
    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Marks `lesson_id` completed for the actor, creating the row on first
    /// visit. Completion is sticky; only the playback position moves.
    pub async fn mark_completed(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        lesson_id: Uuid,
        last_position_sec: Option<i32>,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO lesson_progress (id, user_id, lesson_id, completed, last_position_sec)
            VALUES ($1, $2, $3, TRUE, COALESCE($4, 0))
            ON CONFLICT (user_id, lesson_id) DO UPDATE
            SET completed = TRUE,
                last_position_sec = COALESCE($4, lesson_progress.last_position_sec),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(lesson_id)
        .bind(last_position_sec)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn count_completed_in_mooc(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        mooc_id: Uuid,
    ) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM lesson_progress lp
            JOIN lessons l ON l.id = lp.lesson_id
            WHERE l.mooc_id = $1 AND lp.user_id = $2 AND lp.completed
            "#,
        )
        .bind(mooc_id)
        .bind(actor.user_id())
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn count_completed_in_course(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM lesson_progress lp
            JOIN lessons l ON l.id = lp.lesson_id
            JOIN moocs m ON m.id = l.mooc_id
            WHERE m.course_id = $1 AND lp.user_id = $2 AND lp.completed
            "#,
        )
        .bind(course_id)
        .bind(actor.user_id())
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }
}
