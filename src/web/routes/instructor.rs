use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    model::{
        ResourceTyped, check_access,
        entity::{
            Course, CourseRevenueRow, InstructorRevenueRow, Lesson, LessonCreate, Mooc,
            MoocCreate, Payout, Question, QuestionCreate, UserEntity,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::{
            admin::{InstructorPayoutResponse, InstructorRevenueResponse},
            catalog::{LessonBody, LessonUpdateBody, MoocBody, QuestionResponse},
        },
        error::ErrorResponse,
        middlewares,
        routes::lookup::{load_mooc, load_owned_course},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/courses", get(instructor_courses_handler))
        .route("/courses/{id}/moocs", post(instructor_mooc_create_handler))
        .route("/moocs/{id}", put(instructor_mooc_update_handler))
        .route("/moocs/{id}/lessons", post(instructor_lesson_create_handler))
        .route("/moocs/{id}/questions", post(instructor_question_create_handler))
        .route(
            "/lessons/{id}",
            put(instructor_lesson_update_handler).delete(instructor_lesson_delete_handler),
        )
        .route("/revenue", get(instructor_revenue_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Module of `mooc_id` when the caller may edit its course.
async fn load_owned_mooc(state: &AppState, user: &AuthenticatedUser, mooc_id: Uuid) -> WebResult<Mooc> {
    let mooc = load_mooc(state, mooc_id).await?;
    load_owned_course(state, user, mooc.course_id()).await?;
    Ok(mooc)
}

async fn load_owned_lesson(
    state: &AppState,
    user: &AuthenticatedUser,
    lesson_id: Uuid,
) -> WebResult<Lesson> {
    let lesson = Lesson::find_by_id(state.pool(), lesson_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Lesson::get_resource_type()))?;

    check_access(state.pool(), user, &lesson, user.user_id())
        .await
        .map_err(|e| WebError::resource_access_error(Lesson::get_resource_type(), e))?;
    Ok(lesson)
}

#[utoipa::path(
    get,
    path = "/api/instructor/courses",
    description = "Courses owned by the caller, in every status",
    responses(
        (status = 200, description = "Owned courses", body = Vec<Course>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Instructor role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "instructor",
    security(
        ("cookie" = [])
    )
)]
pub async fn instructor_courses_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    let courses = Course::all_by_owner(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(courses)))
}

#[utoipa::path(
    post,
    path = "/api/instructor/courses/{course_id}/moocs",
    description = "Adds a module to a course",
    request_body = MoocBody,
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Module created", body = Mooc),
        (status = 400, description = "Title is empty", body = ErrorResponse),
        (status = 403, description = "You don't own this course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "instructor",
    security(
        ("cookie" = [])
    )
)]
pub async fn instructor_mooc_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<MoocBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    let course = load_owned_course(&state, user, course_id).await?;

    if payload.title.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Mooc::get_resource_type(),
            "Module title is required",
        ));
    }

    let data = MoocCreate {
        course_id: course.id(),
        title: payload.title,
        order_index: payload.order_index,
    };
    let mooc = Mooc::create(state.pool(), data)
        .await
        .map_err(|e| WebError::resource_fetch_error(Mooc::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(mooc)))
}

#[utoipa::path(
    post,
    path = "/api/instructor/moocs/{mooc_id}/lessons",
    description = "Adds a lesson to a module",
    request_body = LessonBody,
    params(
        ("mooc_id" = Uuid, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Lesson created", body = Lesson),
        (status = 400, description = "Title is empty", body = ErrorResponse),
        (status = 403, description = "You don't own this course", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "instructor",
    security(
        ("cookie" = [])
    )
)]
pub async fn instructor_lesson_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(mooc_id): Path<Uuid>,
    Json(payload): Json<LessonBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    let mooc = load_owned_mooc(&state, user, mooc_id).await?;

    if payload.title.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Lesson::get_resource_type(),
            "Lesson title is required",
        ));
    }

    let data = LessonCreate {
        mooc_id: mooc.id(),
        title: payload.title,
        content: payload.content,
        order_index: payload.order_index,
    };
    let lesson = Lesson::create(state.pool(), data)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(lesson)))
}

#[utoipa::path(
    delete,
    path = "/api/instructor/lessons/{lesson_id}",
    description = "Deletes a lesson",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 403, description = "You don't own this course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "instructor",
    security(
        ("cookie" = [])
    )
)]
pub async fn instructor_lesson_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    let lesson = load_owned_lesson(&state, user, id).await?;

    lesson
        .delete(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/instructor/moocs/{mooc_id}/questions",
    description = "Adds a multiple-choice question to the module exam pool",
    request_body = QuestionCreate,
    params(
        ("mooc_id" = Uuid, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Question created", body = QuestionResponse),
        (status = 400, description = "Invalid options", body = ErrorResponse),
        (status = 403, description = "You don't own this course", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "instructor",
    security(
        ("cookie" = [])
    )
)]
pub async fn instructor_question_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(mooc_id): Path<Uuid>,
    Json(payload): Json<QuestionCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    let mooc = load_owned_mooc(&state, user, mooc_id).await?;

    payload.validate().map_err(|e| {
        WebError::resource_bad_request(Question::get_resource_type(), e.to_string())
    })?;

    let (question, options) = Question::create_with_options(state.pool(), mooc.id(), payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(QuestionResponse { question, options })))
}

#[utoipa::path(
    put,
    path = "/api/instructor/moocs/{mooc_id}",
    description = "Renames or reorders a module",
    request_body = MoocBody,
    params(
        ("mooc_id" = Uuid, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Module updated", body = Mooc),
        (status = 400, description = "Title is empty", body = ErrorResponse),
        (status = 403, description = "You don't own this course", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "instructor",
    security(
        ("cookie" = [])
    )
)]
pub async fn instructor_mooc_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(mooc_id): Path<Uuid>,
    Json(payload): Json<MoocBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    let mooc = load_owned_mooc(&state, user, mooc_id).await?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(WebError::resource_bad_request(
            Mooc::get_resource_type(),
            "Module title is required",
        ));
    }

    let updated = mooc
        .update(state.pool(), title, payload.order_index)
        .await
        .map_err(|e| WebError::resource_fetch_error(Mooc::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    put,
    path = "/api/instructor/lessons/{lesson_id}",
    description = "Edits a lesson, optionally moving it to another module of the caller",
    request_body = LessonUpdateBody,
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 400, description = "Title is empty", body = ErrorResponse),
        (status = 403, description = "You don't own this course", body = ErrorResponse),
        (status = 404, description = "Lesson or module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "instructor",
    security(
        ("cookie" = [])
    )
)]
pub async fn instructor_lesson_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LessonUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    let lesson = load_owned_lesson(&state, user, id).await?;

    if payload.title.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Lesson::get_resource_type(),
            "Lesson title is required",
        ));
    }

    let mooc_id = match payload.mooc_id {
        Some(target) if target != lesson.mooc_id() => {
            load_owned_mooc(&state, user, target).await?.id()
        }
        _ => lesson.mooc_id(),
    };

    let data = LessonCreate {
        mooc_id,
        title: payload.title,
        content: payload
            .content
            .unwrap_or_else(|| lesson.content().to_string()),
        order_index: payload.order_index,
    };
    let updated = lesson
        .update(state.pool(), data)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    get,
    path = "/api/instructor/revenue",
    description = "Sales, gross revenue and payout balance of the caller",
    responses(
        (status = 200, description = "Revenue summary", body = InstructorRevenueResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Instructor role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "instructor",
    security(
        ("cookie" = [])
    )
)]
pub async fn instructor_revenue_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    let share = state.config().payouts().instructor_share_percent();

    let (balance, courses) = tokio::try_join!(
        InstructorRevenueRow::fetch_one(state.pool().executor(), user.user_id()),
        CourseRevenueRow::fetch_by_owner(state.pool(), user.user_id()),
    )
    .map_err(|e| WebError::resource_fetch_error(Payout::get_resource_type(), e))?;

    let balance =
        balance.ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))?;

    Ok((
        StatusCode::OK,
        Json(InstructorRevenueResponse {
            summary: InstructorPayoutResponse::new(balance, share),
            courses,
        }),
    ))
}
