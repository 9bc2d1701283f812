//! Exam rules that do not touch the database: scoring, timing windows and
//! the per-module learning status shown on the course progress page.

mod rules;
pub use rules::{ExamRules, Grade, SubmittedAnswer, round_score};

mod status;
pub use status::{ExamStatus, MoocStatus, course_completed, mooc_status};
