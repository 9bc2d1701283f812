use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Course, MoocWithLessonsRow, Question, QuestionOption};

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct CourseListQuery {
    pub level: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonSummary {
    pub id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub completed: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MoocResponse {
    pub id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub lessons: Vec<LessonSummary>,
}

impl TryFrom<MoocWithLessonsRow> for MoocResponse {
    type Error = serde_json::Error;

    fn try_from(row: MoocWithLessonsRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            order_index: row.order_index,
            lessons: serde_json::from_value(row.lessons)?,
        })
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseDetailsResponse {
    #[serde(flatten)]
    pub course: Course,
    pub is_enrolled: bool,
    pub moocs: Vec<MoocResponse>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MoocBody {
    pub title: String,
    pub order_index: Option<i32>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LessonBody {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub order_index: Option<i32>,
}

/// Missing `content` keeps the current text; `mooc_id` moves the lesson.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LessonUpdateBody {
    pub mooc_id: Option<Uuid>,
    pub title: String,
    pub content: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuestionResponse {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn aggregated_lessons_are_decoded() {
        let lesson = Uuid::new_v4();
        let row = MoocWithLessonsRow {
            id: Uuid::new_v4(),
            title: "Ownership".into(),
            order_index: 1,
            lessons: json!([
                { "id": lesson, "title": "Moves", "order_index": 1, "completed": true }
            ]),
        };

        let mooc = MoocResponse::try_from(row).unwrap();
        assert_eq!(mooc.lessons.len(), 1);
        assert_eq!(mooc.lessons[0].id, lesson);
        assert!(mooc.lessons[0].completed);
    }
}
