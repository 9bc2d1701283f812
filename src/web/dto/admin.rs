use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{CourseRevenueRow, InstructorRevenueRow};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RejectBody {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RoleBody {
    pub role: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct InstructorPayoutResponse {
    pub instructor_id: Uuid,
    pub username: String,
    pub course_count: i64,
    pub student_count: i64,
    pub sales_count: i64,
    pub gross_cents: i64,
    pub instructor_share_cents: i64,
    pub paid_out_cents: i64,
    pub outstanding_cents: i64,
}

impl InstructorPayoutResponse {
    pub fn new(row: InstructorRevenueRow, share_percent: i64) -> Self {
        Self {
            instructor_share_cents: crate::model::entity::instructor_share(
                row.gross_cents,
                share_percent,
            ),
            outstanding_cents: row.outstanding_cents(share_percent),
            instructor_id: row.instructor_id,
            username: row.username,
            course_count: row.course_count,
            student_count: row.student_count,
            sales_count: row.sales_count,
            gross_cents: row.gross_cents,
            paid_out_cents: row.paid_out_cents,
        }
    }
}

/// Revenue of the calling instructor, overall and per course.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct InstructorRevenueResponse {
    #[serde(flatten)]
    pub summary: InstructorPayoutResponse,
    pub courses: Vec<CourseRevenueRow>,
}
