use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Certificate {
    id: Uuid,
    code: String,
    user_id: Uuid,
    course_id: Uuid,
    issued_at: DateTime<Utc>,
}

impl ResourceTyped for Certificate {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Certificate
    }
}

/// Public verification code, e.g. `MC-3F2A9C1D7B4E`.
pub fn certificate_code(id: Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("MC-{}", &simple[..12])
}

impl Certificate {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub async fn find(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM certificates WHERE user_id = $1 AND course_id = $2")
                .bind(user_id)
                .bind(course_id)
                .fetch_optional(conn)
                .await?;
        Ok(result)
    }

    /// Issues a certificate, or returns `None` when a concurrent request
    /// issued it first.
    pub async fn issue(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let id = Uuid::new_v4();
        let row = sqlx::query_as(
            r#"
            INSERT INTO certificates (id, code, user_id, course_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, course_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(certificate_code(id))
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(conn)
        .await?;
        Ok(row)
    }
}

#[derive(Debug, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct CertificateDetailsRow {
    pub code: String,
    pub student_name: String,
    pub course_title: String,
    pub instructor_name: String,
    pub issued_at: DateTime<Utc>,
    pub grade: Option<f64>,
}

impl CertificateDetailsRow {
    pub async fn find_by_code(mm: &ModelManager, code: &str) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            SELECT
                cert.code,
                COALESCE(NULLIF(s.full_name, ''), s.username) AS student_name,
                c.title AS course_title,
                COALESCE(NULLIF(i.full_name, ''), i.username) AS instructor_name,
                cert.issued_at,
                e.overall_score AS grade
            FROM certificates cert
            JOIN users s ON s.id = cert.user_id
            JOIN courses c ON c.id = cert.course_id
            JOIN users i ON i.id = c.owner_id
            LEFT JOIN enrollments e
                ON e.user_id = cert.user_id AND e.course_id = cert.course_id
            WHERE cert.code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(mm.executor())
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn code_is_prefixed_and_uppercase() {
        let id = Uuid::parse_str("3f2a9c1d-7b4e-4a5b-8c6d-0e1f2a3b4c5d").unwrap();
        assert_eq!(certificate_code(id), "MC-3F2A9C1D7B4E");
    }
}
