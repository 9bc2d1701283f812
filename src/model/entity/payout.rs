use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Payout {
    id: Uuid,
    instructor_id: Uuid,
    amount_cents: i64,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for Payout {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Payout
    }
}

impl Payout {
    pub fn amount_cents(&self) -> i64 {
        self.amount_cents
    }

    pub async fn create(
        conn: &mut PgConnection,
        instructor_id: Uuid,
        amount_cents: i64,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO payouts (id, instructor_id, amount_cents)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(instructor_id)
        .bind(amount_cents)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }
}

/// Instructor share of `gross_cents`, rounded down to whole cents.
pub fn instructor_share(gross_cents: i64, share_percent: i64) -> i64 {
    gross_cents * share_percent / 100
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InstructorRevenueRow {
    pub instructor_id: Uuid,
    pub username: String,
    pub course_count: i64,
    pub student_count: i64,
    pub sales_count: i64,
    pub gross_cents: i64,
    pub paid_out_cents: i64,
}

const REVENUE_QUERY: &str = r#"
    SELECT
        u.id AS instructor_id,
        u.username,
        (SELECT COUNT(*) FROM courses c WHERE c.owner_id = u.id) AS course_count,
        (
            SELECT COUNT(DISTINCT e.user_id) FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE c.owner_id = u.id
        ) AS student_count,
        (
            SELECT COUNT(*) FROM payments p
            JOIN courses c ON c.id = p.course_id
            WHERE c.owner_id = u.id AND p.status = 'completed'
        ) AS sales_count,
        (
            SELECT COALESCE(SUM(p.amount_cents), 0)::BIGINT FROM payments p
            JOIN courses c ON c.id = p.course_id
            WHERE c.owner_id = u.id AND p.status = 'completed'
        ) AS gross_cents,
        (
            SELECT COALESCE(SUM(po.amount_cents), 0)::BIGINT FROM payouts po
            WHERE po.instructor_id = u.id
        ) AS paid_out_cents
    FROM users u
"#;

impl InstructorRevenueRow {
    pub fn outstanding_cents(&self, share_percent: i64) -> i64 {
        (instructor_share(self.gross_cents, share_percent) - self.paid_out_cents).max(0)
    }

    /// Every user owning at least one course.
    pub async fn fetch_all(mm: &ModelManager) -> DatabaseResult<Vec<Self>> {
        let query = format!(
            "{REVENUE_QUERY} WHERE EXISTS (SELECT 1 FROM courses c WHERE c.owner_id = u.id) ORDER BY u.username"
        );
        let rows = sqlx::query_as(&query).fetch_all(mm.executor()).await?;
        Ok(rows)
    }

    pub async fn fetch_one<'e, E: PgExecutor<'e>>(
        executor: E,
        instructor_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let query = format!("{REVENUE_QUERY} WHERE u.id = $1");
        let row = sqlx::query_as(&query)
            .bind(instructor_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }
}

/// Completed sales of one course.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct CourseRevenueRow {
    pub course_id: Uuid,
    pub title: String,
    pub price_cents: i64,
    pub sales_count: i64,
    pub gross_cents: i64,
}

impl CourseRevenueRow {
    /// Every course of `owner_id`, best selling first.
    pub async fn fetch_by_owner(mm: &ModelManager, owner_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                c.id AS course_id,
                c.title,
                c.price_cents,
                COUNT(p.id) AS sales_count,
                COALESCE(SUM(p.amount_cents), 0)::BIGINT AS gross_cents
            FROM courses c
            LEFT JOIN payments p ON p.course_id = c.id AND p.status = 'completed'
            WHERE c.owner_id = $1
            GROUP BY c.id
            ORDER BY sales_count DESC, c.title
            "#,
        )
        .bind(owner_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn revenue(gross_cents: i64, paid_out_cents: i64) -> InstructorRevenueRow {
        InstructorRevenueRow {
            instructor_id: Uuid::new_v4(),
            username: "mentor".into(),
            course_count: 1,
            student_count: 3,
            sales_count: 2,
            gross_cents,
            paid_out_cents,
        }
    }

    #[test]
    fn share_rounds_down() {
        assert_eq!(instructor_share(10_000, 70), 7_000);
        assert_eq!(instructor_share(999, 70), 699);
    }

    #[test]
    fn outstanding_subtracts_payouts() {
        assert_eq!(revenue(10_000, 2_000).outstanding_cents(70), 5_000);
        assert_eq!(revenue(10_000, 7_000).outstanding_cents(70), 0);
        assert_eq!(revenue(0, 500).outstanding_cents(70), 0);
    }
}
