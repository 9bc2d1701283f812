pub mod user;
pub use user::{UserEntity, UserEntityCreateUpdate};

pub mod course;
pub use course::{Course, CourseCreate, CourseFilter};

mod mooc;
pub use mooc::{Mooc, MoocCreate, MoocProgressRow, MoocWithLessonsRow};

mod lesson;
pub use lesson::{Lesson, LessonCreate, LessonWithStatusRow};

mod lesson_progress;
pub use lesson_progress::LessonProgress;

mod question;
pub use question::{
    Question, QuestionCreate, QuestionOption, QuestionOptionCreate, QuestionValidationError,
    group_options,
};

mod exam_attempt;
pub use exam_attempt::{AttemptStatsRow, ExamAttempt};

mod enrollment;
pub use enrollment::{Enrollment, EnrollmentWithCourseRow};

pub mod payment;
pub use payment::Payment;

mod certificate;
pub use certificate::{Certificate, CertificateDetailsRow, certificate_code};

mod payout;
pub use payout::{CourseRevenueRow, InstructorRevenueRow, Payout, instructor_share};
