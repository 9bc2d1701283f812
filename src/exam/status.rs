use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MoocStatus {
    Locked,
    InProgress,
    ExamAvailable,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Passed,
    Available,
    NotAvailable,
}

impl MoocStatus {
    pub fn is_current(self) -> bool {
        matches!(self, Self::InProgress | Self::ExamAvailable)
    }

    pub fn exam_status(self, exam_passed: bool) -> ExamStatus {
        if exam_passed {
            ExamStatus::Passed
        } else if self == Self::ExamAvailable {
            ExamStatus::Available
        } else {
            ExamStatus::NotAvailable
        }
    }
}

/// `position` is the 1-based rank of the module inside its course.
pub fn mooc_status(
    position: i64,
    moocs_completed: i64,
    exam_passed: bool,
    lessons_completed: i64,
    total_lessons: i64,
) -> MoocStatus {
    let unlocked = position == 1 || moocs_completed >= position - 1;
    if !unlocked {
        return MoocStatus::Locked;
    }

    if exam_passed {
        MoocStatus::Completed
    } else if total_lessons > 0 && lessons_completed >= total_lessons {
        MoocStatus::ExamAvailable
    } else {
        MoocStatus::InProgress
    }
}

pub fn course_completed(
    total_lessons: i64,
    completed_lessons: i64,
    total_moocs: i64,
    passed_moocs: i64,
) -> bool {
    let lessons_done = total_lessons > 0 && completed_lessons >= total_lessons;
    let exams_done = total_moocs > 0 && passed_moocs >= total_moocs;
    lessons_done && exams_done
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_module_is_never_locked() {
        assert_eq!(mooc_status(1, 0, false, 0, 3), MoocStatus::InProgress);
    }

    #[test]
    fn later_modules_unlock_with_progress() {
        assert_eq!(mooc_status(2, 0, false, 0, 3), MoocStatus::Locked);
        assert_eq!(mooc_status(2, 1, false, 0, 3), MoocStatus::InProgress);
        assert_eq!(mooc_status(3, 1, false, 3, 3), MoocStatus::Locked);
    }

    #[test]
    fn lessons_done_make_exam_available() {
        assert_eq!(mooc_status(1, 0, false, 3, 3), MoocStatus::ExamAvailable);
        assert_eq!(mooc_status(1, 0, false, 0, 0), MoocStatus::InProgress);
    }

    #[test]
    fn passed_exam_completes_module() {
        assert_eq!(mooc_status(1, 1, true, 3, 3), MoocStatus::Completed);
    }

    #[test]
    fn exam_status_of_current_module() {
        assert_eq!(MoocStatus::Completed.exam_status(true), ExamStatus::Passed);
        assert_eq!(MoocStatus::ExamAvailable.exam_status(false), ExamStatus::Available);
        assert_eq!(MoocStatus::InProgress.exam_status(false), ExamStatus::NotAvailable);
        assert!(MoocStatus::ExamAvailable.is_current());
        assert!(!MoocStatus::Locked.is_current());
    }

    #[test]
    fn course_completion_needs_lessons_and_exams() {
        assert!(course_completed(5, 5, 2, 2));
        assert!(!course_completed(5, 4, 2, 2));
        assert!(!course_completed(5, 5, 2, 1));
        assert!(!course_completed(0, 0, 0, 0));
    }
}
