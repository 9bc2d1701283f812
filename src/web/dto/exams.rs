use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exam::SubmittedAnswer;
use crate::model::entity::{ExamAttempt, QuestionOption};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExamInfoResponse {
    /// Exams are addressed by their module id
    pub exam_id: Uuid,
    pub mooc_id: Uuid,
    pub mooc_name: String,
    pub course_id: Uuid,
    pub total_questions: i64,
    pub duration_minutes: i64,
    pub passing_score: f64,
    pub can_take_exam: bool,
    pub lessons_completed: i64,
    pub total_lessons: i64,
    pub previous_attempts: i64,
    pub best_score: Option<f64>,
    pub last_attempt_date: Option<DateTime<Utc>>,
}

/// Option as shown to the learner, without its correctness flag.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExamOption {
    pub label: String,
    pub content: String,
}

impl From<QuestionOption> for ExamOption {
    fn from(option: QuestionOption) -> Self {
        Self {
            label: option.label().to_string(),
            content: option.content().to_string(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExamQuestion {
    pub question_id: Uuid,
    pub stem: String,
    pub qtype: String,
    pub difficulty: String,
    pub options: Vec<ExamOption>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StartExamResponse {
    pub attempt_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub total_questions: i32,
    pub questions: Vec<ExamQuestion>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitExamBody {
    pub attempt_id: Uuid,
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmitExamResponse {
    pub attempt_id: Uuid,
    pub score: f64,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub passed: bool,
    pub time_taken: i32,
    pub next_mooc_unlocked: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResultOption {
    pub label: String,
    pub content: String,
    pub is_correct: bool,
}

impl From<&QuestionOption> for ResultOption {
    fn from(option: &QuestionOption) -> Self {
        Self {
            label: option.label().to_string(),
            content: option.content().to_string(),
            is_correct: option.is_correct(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DetailedResult {
    pub question_id: Uuid,
    pub stem: String,
    pub difficulty: String,
    pub selected_option: String,
    pub correct_option: String,
    pub is_correct: bool,
    pub options: Vec<ResultOption>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExamResultResponse {
    pub attempt_id: Uuid,
    pub mooc_id: Uuid,
    pub mooc_name: String,
    pub score: Option<f64>,
    pub correct_answers: Option<i32>,
    pub total_questions: i32,
    pub passed: bool,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub time_taken: Option<i32>,
    pub detailed_results: Vec<DetailedResult>,
}

impl ExamResultResponse {
    pub fn new(attempt: &ExamAttempt, mooc_name: String, detailed_results: Vec<DetailedResult>) -> Self {
        Self {
            attempt_id: attempt.id(),
            mooc_id: attempt.mooc_id(),
            mooc_name,
            score: attempt.score(),
            correct_answers: attempt.correct_answers(),
            total_questions: attempt.total_questions(),
            passed: attempt.passed(),
            started_at: attempt.started_at(),
            submitted_at: attempt.submitted_at(),
            time_taken: attempt.time_taken(),
            detailed_results,
        }
    }
}
