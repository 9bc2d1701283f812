use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_ARCHIVED: &str = "archived";

pub const LEVELS: [&str; 3] = ["Beginner", "Intermediate", "Advanced"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    description: String,
    level: String,
    price_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CourseCreate {
    pub title: String,
    pub description: String,
    pub level: String,
    pub price_cents: i64,
}

impl CourseCreate {
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && is_valid_level(&self.level) && self.price_cents >= 0
    }
}

pub fn is_valid_level(level: &str) -> bool {
    LEVELS.contains(&level)
}

impl ResourceTyped for Course {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn price_cents(&self) -> i64 {
        self.price_cents
    }

    pub fn is_free(&self) -> bool {
        self.price_cents == 0
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}

#[async_trait]
impl CrudRepository<Course, CourseCreate, Uuid> for Course {
    /// New courses belong to the actor and wait for moderation.
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO courses (id, owner_id, title, description, level, price_cents, status)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.level)
        .bind(data.price_cents)
        .bind(STATUS_PENDING)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        let status = if actor.is_admin() {
            self.status.clone()
        } else {
            STATUS_PENDING.to_string()
        };

        let row = sqlx::query_as(
            r#"
            UPDATE courses
            SET title = $1, description = $2, level = $3, price_cents = $4,
                status = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.level)
        .bind(data.price_cents)
        .bind(status)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM courses ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Course {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.owner_id)
    }
}

/// Catalog filter; `None` fields match everything.
#[derive(Debug, Default, Clone)]
pub struct CourseFilter {
    pub level: Option<String>,
    pub search: Option<String>,
}

impl CourseFilter {
    fn pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"))
    }
}

impl Course {
    pub async fn search_active(
        mm: &ModelManager,
        filter: &CourseFilter,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT * FROM courses
            WHERE status = 'active'
              AND ($1::TEXT IS NULL OR level = $1)
              AND ($2::TEXT IS NULL OR title ILIKE $2 OR description ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.level.as_deref())
        .bind(filter.pattern())
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn count_active(mm: &ModelManager, filter: &CourseFilter) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM courses
            WHERE status = 'active'
              AND ($1::TEXT IS NULL OR level = $1)
              AND ($2::TEXT IS NULL OR title ILIKE $2 OR description ILIKE $2)
            "#,
        )
        .bind(filter.level.as_deref())
        .bind(filter.pattern())
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn all_by_status(mm: &ModelManager, status: &str) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM courses WHERE status = $1 ORDER BY created_at")
            .bind(status)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn all_by_owner(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM courses WHERE owner_id = $1 ORDER BY created_at DESC")
                .bind(actor.user_id())
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn set_status(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        status: &str,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "UPDATE courses SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }
}
