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

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Payment {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    amount_cents: i64,
    status: String,
    txn_ref: Option<String>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl ResourceTyped for Payment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Payment
    }
}

impl Payment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}

#[async_trait]
impl HasOwner for Payment {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}

impl Payment {
    pub async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
        amount_cents: i64,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO payments (id, user_id, course_id, amount_cents, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(course_id)
        .bind(amount_cents)
        .bind(STATUS_PENDING)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn all_by_user(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(actor.user_id())
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    /// Marks a pending payment as paid. `None` when it was already completed.
    pub async fn complete(
        &self,
        conn: &mut PgConnection,
        txn_ref: &str,
    ) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            UPDATE payments
            SET status = $1, txn_ref = $2, paid_at = NOW()
            WHERE id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(STATUS_COMPLETED)
        .bind(txn_ref)
        .bind(self.id)
        .bind(STATUS_PENDING)
        .fetch_optional(conn)
        .await?;
        Ok(row)
    }
}
