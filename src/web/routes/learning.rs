use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    exam::{course_completed, mooc_status},
    model::{
        ResourceTyped,
        entity::{
            Certificate, CertificateDetailsRow, Enrollment, EnrollmentWithCourseRow, ExamAttempt,
            Lesson, LessonProgress, LessonWithStatusRow, Mooc, MoocProgressRow,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::learning::{
            CertificateCheckResponse, CertificateRequirements, CertificateVerifyResponse,
            CompleteLessonBody, CourseProgressResponse, LessonResponse, MoocProgressResponse,
        },
        error::{ErrorResponse, ExamError},
        middlewares,
        routes::lookup::{find_enrollment, load_course},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/enrollments", get(learning_enrollments_handler))
        .route("/lessons/{id}", get(learning_lesson_handler))
        .route("/lessons/{id}/complete", post(learning_lesson_complete_handler))
        .route("/course/{course_id}/progress", get(learning_progress_handler))
        .route(
            "/course/{course_id}/certificate",
            post(learning_certificate_check_handler),
        )
        .route("/certificates/{code}", get(learning_certificate_verify_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn load_lesson(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<LessonWithStatusRow> {
    LessonWithStatusRow::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))
}

async fn require_enrollment(
    state: &AppState,
    user: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<Enrollment> {
    find_enrollment(state, user, course_id)
        .await?
        .ok_or_else(|| ExamError::ExamCourseNotEnrolled.into())
}

#[utoipa::path(
    get,
    path = "/api/learning/enrollments",
    description = "Courses the caller is enrolled in",
    responses(
        (status = 200, description = "Enrollments, newest first", body = Vec<EnrollmentWithCourseRow>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(
        ("cookie" = [])
    )
)]
pub async fn learning_enrollments_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollments = EnrollmentWithCourseRow::fetch_all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(enrollments)))
}

#[utoipa::path(
    get,
    path = "/api/learning/lessons/{lesson_id}",
    description = "Lesson content with the caller's completion state",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    responses(
        (status = 200, description = "Lesson found", body = LessonResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(
        ("cookie" = [])
    )
)]
pub async fn learning_lesson_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = load_lesson(&state, user, id).await?;

    if find_enrollment(&state, user, lesson.course_id).await?.is_none() {
        let course = load_course(&state, lesson.course_id).await?;
        if !user.is_admin() && course.owner_id() != user.user_id() {
            return Err(WebError::resource_forbidden(Lesson::get_resource_type()));
        }
    }

    Ok((StatusCode::OK, Json(LessonResponse::from(lesson))))
}

#[utoipa::path(
    post,
    path = "/api/learning/lessons/{lesson_id}/complete",
    description = "Marks a lesson completed; the body is optional",
    request_body = CompleteLessonBody,
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    responses(
        (status = 200, description = "Lesson marked completed", body = LessonProgress),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(
        ("cookie" = [])
    )
)]
pub async fn learning_lesson_complete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CompleteLessonBody>>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = load_lesson(&state, user, id).await?;
    if find_enrollment(&state, user, lesson.course_id).await?.is_none() {
        return Err(WebError::resource_forbidden(Lesson::get_resource_type()));
    }

    let body = payload.map(|Json(b)| b).unwrap_or_default();
    let progress = LessonProgress::mark_completed(state.pool(), user, lesson.id, body.last_position_sec)
        .await
        .map_err(|e| WebError::resource_fetch_error(LessonProgress::get_resource_type(), e))?;

    tracing::debug!("user {} completed lesson {}", user.user_id(), lesson.id);
    Ok((StatusCode::OK, Json(progress)))
}

#[utoipa::path(
    get,
    path = "/api/learning/course/{course_id}/progress",
    description = "Per-module status of the caller inside a course",
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Course progress", body = CourseProgressResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Course not found or not enrolled", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(
        ("cookie" = [])
    )
)]
pub async fn learning_progress_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = load_course(&state, course_id).await?;
    let enrollment = require_enrollment(&state, user, course.id()).await?;

    let rows = MoocProgressRow::fetch_by_course(state.pool(), course.id(), user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Mooc::get_resource_type(), e))?;

    let moocs_completed = i64::from(enrollment.moocs_completed());
    let all_moocs: Vec<MoocProgressResponse> = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| MoocProgressResponse {
            status: mooc_status(
                index as i64 + 1,
                moocs_completed,
                row.exam_passed,
                row.lessons_completed,
                row.total_lessons,
            ),
            mooc_id: row.id,
            name: row.title,
            order_index: row.order_index,
            lessons_completed: row.lessons_completed,
            total_lessons: row.total_lessons,
            exam_passed: row.exam_passed,
            exam_score: row.exam_score,
        })
        .collect();

    let certificate_available = !all_moocs.is_empty() && all_moocs.iter().all(|m| m.exam_passed);

    Ok((
        StatusCode::OK,
        Json(CourseProgressResponse {
            course_id: course.id(),
            enrollment_id: enrollment.id(),
            current_mooc: CourseProgressResponse::pick_current(&all_moocs),
            overall_progress: enrollment.progress().round() as i64,
            moocs_completed: enrollment.moocs_completed(),
            overall_score: enrollment.overall_score(),
            certificate_available,
            all_moocs,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/learning/course/{course_id}/certificate",
    description = "Checks completion of the course and issues the certificate once",
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Completion state", body = CertificateCheckResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Course not found or not enrolled", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(
        ("cookie" = [])
    )
)]
pub async fn learning_certificate_check_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = load_course(&state, course_id).await?;
    let enrollment = require_enrollment(&state, user, course.id()).await?;

    let (total_lessons, completed_lessons, passed_moocs) = tokio::try_join!(
        Lesson::count_by_course(state.pool(), course.id()),
        LessonProgress::count_completed_in_course(state.pool(), user, course.id()),
        ExamAttempt::count_passed_moocs(state.pool(), user, course.id()),
    )
    .map_err(|e| WebError::resource_fetch_error(Certificate::get_resource_type(), e))?;

    let mut tx = state
        .pool()
        .begin()
        .await
        .map_err(|e| WebError::resource_fetch_error(Certificate::get_resource_type(), e))?;

    let total_moocs = Mooc::count_by_course(&mut tx, course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Mooc::get_resource_type(), e))?;

    let requirements = CertificateRequirements {
        total_lessons,
        completed_lessons,
        total_moocs,
        passed_moocs,
    };

    let completed = course_completed(total_lessons, completed_lessons, total_moocs, passed_moocs);
    let existing = Certificate::find(&mut tx, user.user_id(), course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Certificate::get_resource_type(), e))?;

    let (certificate, newly_awarded) = match existing {
        Some(certificate) => (Some(certificate), false),
        None if completed => {
            let issued = Certificate::issue(&mut tx, user.user_id(), course.id())
                .await
                .map_err(|e| WebError::resource_fetch_error(Certificate::get_resource_type(), e))?;
            match issued {
                Some(certificate) => (Some(certificate), true),
                // issued concurrently
                None => (
                    Certificate::find(&mut tx, user.user_id(), course.id())
                        .await
                        .map_err(|e| {
                            WebError::resource_fetch_error(Certificate::get_resource_type(), e)
                        })?,
                    false,
                ),
            }
        }
        None => (None, false),
    };

    if completed {
        enrollment
            .mark_completed(&mut tx)
            .await
            .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;
    }

    tx.commit()
        .await
        .map_err(|e| WebError::resource_fetch_error(Certificate::get_resource_type(), e.into()))?;

    if newly_awarded {
        tracing::info!("certificate issued to {} for course {}", user.user_id(), course.id());
    }

    Ok((
        StatusCode::OK,
        Json(CertificateCheckResponse {
            completed,
            newly_awarded,
            certificate,
            requirements,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/learning/certificates/{code}",
    description = "Public verification of a certificate code",
    params(
        ("code" = String, Path, description = "Certificate code, e.g. MC-3F2A9C1D7B4E")
    ),
    responses(
        (status = 200, description = "Certificate is valid", body = CertificateVerifyResponse),
        (status = 404, description = "Unknown certificate", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning"
)]
pub async fn learning_certificate_verify_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> WebResult<impl IntoResponse> {
    // codes are issued in upper case
    let code = code.trim().to_uppercase();
    let details = CertificateDetailsRow::find_by_code(state.pool(), &code)
        .await
        .map_err(|e| WebError::resource_fetch_error(Certificate::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Certificate::get_resource_type()))?;

    Ok((
        StatusCode::OK,
        Json(CertificateVerifyResponse {
            valid: true,
            code: details.code,
            student_name: details.student_name,
            course_title: details.course_title,
            instructor_name: details.instructor_name,
            issued_at: details.issued_at,
            grade: details.grade,
        }),
    ))
}
