use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exam::{ExamStatus, MoocStatus};
use crate::model::entity::{Certificate, LessonWithStatusRow};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonResponse {
    pub id: Uuid,
    pub mooc_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub content: String,
    pub order_index: i32,
    pub completed: bool,
    pub last_position_sec: i32,
}

impl From<LessonWithStatusRow> for LessonResponse {
    fn from(row: LessonWithStatusRow) -> Self {
        Self {
            id: row.id,
            mooc_id: row.mooc_id,
            course_id: row.course_id,
            title: row.title,
            content: row.content,
            order_index: row.order_index,
            completed: row.completed,
            last_position_sec: row.last_position_sec,
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct CompleteLessonBody {
    pub last_position_sec: Option<i32>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MoocProgressResponse {
    pub mooc_id: Uuid,
    pub name: String,
    pub order_index: i32,
    pub status: MoocStatus,
    pub lessons_completed: i64,
    pub total_lessons: i64,
    pub exam_passed: bool,
    pub exam_score: Option<f64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CurrentMoocResponse {
    pub mooc_id: Uuid,
    pub name: String,
    pub lessons_completed: i64,
    pub total_lessons: i64,
    pub exam_status: ExamStatus,
}

impl From<&MoocProgressResponse> for CurrentMoocResponse {
    fn from(mooc: &MoocProgressResponse) -> Self {
        Self {
            mooc_id: mooc.mooc_id,
            name: mooc.name.clone(),
            lessons_completed: mooc.lessons_completed,
            total_lessons: mooc.total_lessons,
            exam_status: mooc.status.exam_status(mooc.exam_passed),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseProgressResponse {
    pub course_id: Uuid,
    pub enrollment_id: Uuid,
    pub current_mooc: Option<CurrentMoocResponse>,
    pub all_moocs: Vec<MoocProgressResponse>,
    pub overall_progress: i64,
    pub moocs_completed: i32,
    pub overall_score: Option<f64>,
    pub certificate_available: bool,
}

impl CourseProgressResponse {
    /// First module in progress or waiting for its exam, else the first one.
    pub fn pick_current(moocs: &[MoocProgressResponse]) -> Option<CurrentMoocResponse> {
        moocs
            .iter()
            .find(|m| m.status.is_current())
            .or_else(|| moocs.first())
            .map(CurrentMoocResponse::from)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CertificateRequirements {
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub total_moocs: i64,
    pub passed_moocs: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CertificateCheckResponse {
    pub completed: bool,
    pub newly_awarded: bool,
    pub certificate: Option<Certificate>,
    pub requirements: CertificateRequirements,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CertificateVerifyResponse {
    pub valid: bool,
    pub code: String,
    pub student_name: String,
    pub course_title: String,
    pub instructor_name: String,
    pub issued_at: DateTime<Utc>,
    pub grade: Option<f64>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn mooc(order_index: i32, status: MoocStatus, exam_passed: bool) -> MoocProgressResponse {
        MoocProgressResponse {
            mooc_id: Uuid::new_v4(),
            name: format!("Module {order_index}"),
            order_index,
            status,
            lessons_completed: 0,
            total_lessons: 2,
            exam_passed,
            exam_score: None,
        }
    }

    #[test]
    fn current_module_is_first_unfinished() {
        let moocs = vec![
            mooc(1, MoocStatus::Completed, true),
            mooc(2, MoocStatus::ExamAvailable, false),
            mooc(3, MoocStatus::Locked, false),
        ];

        let current = CourseProgressResponse::pick_current(&moocs).unwrap();
        assert_eq!(current.name, "Module 2");
        assert_eq!(current.exam_status, ExamStatus::Available);
    }

    #[test]
    fn finished_course_points_at_first_module() {
        let moocs = vec![
            mooc(1, MoocStatus::Completed, true),
            mooc(2, MoocStatus::Completed, true),
        ];

        let current = CourseProgressResponse::pick_current(&moocs).unwrap();
        assert_eq!(current.name, "Module 1");
        assert_eq!(current.exam_status, ExamStatus::Passed);
        assert!(CourseProgressResponse::pick_current(&[]).is_none());
    }
}
