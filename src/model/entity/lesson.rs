use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Lesson {
    id: Uuid,
    mooc_id: Uuid,
    title: String,
    content: String,
    order_index: i32,
}

impl ResourceTyped for Lesson {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Lesson
    }
}

impl Lesson {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mooc_id(&self) -> Uuid {
        self.mooc_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonCreate {
    pub mooc_id: Uuid,
    pub title: String,
    pub content: String,
    pub order_index: Option<i32>,
}

impl Lesson {
    pub async fn create(mm: &ModelManager, data: LessonCreate) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO lessons (id, mooc_id, title, content, order_index)
            VALUES (
                $1, $2, $3, $4,
                COALESCE($5, (SELECT COALESCE(MAX(order_index), 0) + 1 FROM lessons WHERE mooc_id = $2))
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.mooc_id)
        .bind(&data.title)
        .bind(&data.content)
        .bind(data.order_index)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    /// Replaces title and content; `data.mooc_id` moves the lesson to another module.
    pub async fn update(self, mm: &ModelManager, data: LessonCreate) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE lessons
            SET mooc_id = $1, title = $2, content = $3, order_index = COALESCE($4, order_index)
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(data.mooc_id)
        .bind(&data.title)
        .bind(&data.content)
        .bind(data.order_index)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn delete(self, mm: &ModelManager) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM lessons WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Lesson {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let owner: Uuid = sqlx::query_scalar(
            "SELECT c.owner_id FROM courses c JOIN moocs m ON m.course_id = c.id WHERE m.id = $1",
        )
        .bind(self.mooc_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(owner)
    }
}

impl Lesson {
    pub async fn count_by_mooc(mm: &ModelManager, mooc_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE mooc_id = $1")
            .bind(mooc_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn count_by_course(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lessons l JOIN moocs m ON m.id = l.mooc_id WHERE m.course_id = $1",
        )
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }
}

// Utils

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LessonWithStatusRow {
    pub id: Uuid,
    pub mooc_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub content: String,
    pub order_index: i32,
    pub completed: bool,
    pub last_position_sec: i32,
}

impl LessonWithStatusRow {
    pub async fn find_by_id(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        lesson_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            SELECT
                l.id,
                l.mooc_id,
                m.course_id,
                l.title,
                l.content,
                l.order_index,
                COALESCE(lp.completed, false) AS completed,
                COALESCE(lp.last_position_sec, 0) AS last_position_sec
            FROM lessons l
            JOIN moocs m ON m.id = l.mooc_id
            LEFT JOIN lesson_progress lp
                ON lp.lesson_id = l.id AND lp.user_id = $2
            WHERE l.id = $1
            "#,
        )
        .bind(lesson_id)
        .bind(actor.user_id())
        .fetch_optional(mm.executor())
        .await?;

        Ok(row)
    }
}
