use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Mooc {
    id: Uuid,
    course_id: Uuid,
    title: String,
    order_index: i32,
}

impl ResourceTyped for Mooc {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Mooc
    }
}

impl Mooc {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MoocCreate {
    pub course_id: Uuid,
    pub title: String,
    pub order_index: Option<i32>,
}

impl Mooc {
    pub async fn create(mm: &ModelManager, data: MoocCreate) -> DatabaseResult<Self> {
        // appended at the end of the course unless a position is given
        let row = sqlx::query_as(
            r#"
            INSERT INTO moocs (id, course_id, title, order_index)
            VALUES (
                $1, $2, $3,
                COALESCE($4, (SELECT COALESCE(MAX(order_index), 0) + 1 FROM moocs WHERE course_id = $2))
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(&data.title)
        .bind(data.order_index)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    /// Renames the module; the position is kept when `order_index` is `None`.
    pub async fn update(
        self,
        mm: &ModelManager,
        title: &str,
        order_index: Option<i32>,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE moocs SET title = $1, order_index = COALESCE($2, order_index)
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(order_index)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM moocs WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Mooc {
    type OwnerId = Uuid;

    /// Modules are owned by the owner of their course.
    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let owner: Uuid = sqlx::query_scalar("SELECT owner_id FROM courses WHERE id = $1")
            .bind(self.course_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(owner)
    }
}

impl Mooc {
    pub async fn first_in_course(
        conn: &mut PgConnection,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM moocs WHERE course_id = $1 ORDER BY order_index, id LIMIT 1",
        )
        .bind(course_id)
        .fetch_optional(conn)
        .await?;
        Ok(result)
    }

    /// Module following `self` in its course, if any.
    pub async fn next(&self, conn: &mut PgConnection) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT * FROM moocs
            WHERE course_id = $1 AND (order_index, id) > ($2, $3)
            ORDER BY order_index, id
            LIMIT 1
            "#,
        )
        .bind(self.course_id)
        .bind(self.order_index)
        .bind(self.id)
        .fetch_optional(conn)
        .await?;
        Ok(result)
    }

    pub async fn count_by_course(
        conn: &mut PgConnection,
        course_id: Uuid,
    ) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM moocs WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(conn)
            .await?;
        Ok(result)
    }
}

// Utils

/// Module of a course with its lessons aggregated as JSON.
#[derive(Debug, sqlx::FromRow)]
pub struct MoocWithLessonsRow {
    pub id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub lessons: serde_json::Value,
}

impl MoocWithLessonsRow {
    /// Lessons carry a `completed` flag for `user_id` (always false for
    /// anonymous callers).
    pub async fn fetch_by_course(
        mm: &ModelManager,
        course_id: Uuid,
        user_id: Option<Uuid>,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                m.id,
                m.title,
                m.order_index,
                COALESCE(
                    json_agg(
                        json_build_object(
                            'id', l.id,
                            'title', l.title,
                            'order_index', l.order_index,
                            'completed', COALESCE(lp.completed, false)
                        )
                        ORDER BY l.order_index, l.id
                    ) FILTER (WHERE l.id IS NOT NULL),
                    '[]'
                ) AS lessons
            FROM moocs m
            LEFT JOIN lessons l ON l.mooc_id = m.id
            LEFT JOIN lesson_progress lp
                ON lp.lesson_id = l.id
                AND lp.user_id = $2
            WHERE m.course_id = $1
            GROUP BY m.id
            ORDER BY m.order_index, m.id
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }
}

/// Per-module counters of a learner inside one course, in module order.
#[derive(Debug, sqlx::FromRow)]
pub struct MoocProgressRow {
    pub id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub total_lessons: i64,
    pub lessons_completed: i64,
    pub exam_passed: bool,
    pub exam_score: Option<f64>,
}

impl MoocProgressRow {
    pub async fn fetch_by_course(
        mm: &ModelManager,
        course_id: Uuid,
        user_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                m.id,
                m.title,
                m.order_index,
                (SELECT COUNT(*) FROM lessons l WHERE l.mooc_id = m.id) AS total_lessons,
                (
                    SELECT COUNT(*) FROM lessons l
                    JOIN lesson_progress lp ON lp.lesson_id = l.id
                    WHERE l.mooc_id = m.id AND lp.user_id = $2 AND lp.completed
                ) AS lessons_completed,
                EXISTS (
                    SELECT 1 FROM exam_attempts ea
                    WHERE ea.mooc_id = m.id AND ea.user_id = $2 AND ea.passed
                ) AS exam_passed,
                (
                    SELECT ea.score FROM exam_attempts ea
                    WHERE ea.mooc_id = m.id AND ea.user_id = $2 AND ea.passed
                    ORDER BY ea.submitted_at DESC
                    LIMIT 1
                ) AS exam_score
            FROM moocs m
            WHERE m.course_id = $1
            ORDER BY m.order_index, m.id
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }
}
