use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, DatabaseError, Page, ResourceTyped,
        entity::{
            Course, CourseCreate, CourseFilter, Enrollment, MoocWithLessonsRow, course::is_valid_level,
        },
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::catalog::{CourseDetailsResponse, CourseListQuery, MoocResponse},
        error::ErrorResponse,
        middlewares,
        routes::{
            PaginationQuery,
            lookup::{find_enrollment, load_course, load_owned_course},
        },
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(courses_list_handler).post(courses_create_handler))
        .route("/{id}", get(courses_get_handler).put(courses_update_handler))
        .route("/{id}/enroll", post(courses_enroll_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/courses",
    description = "Lists published courses, newest first",
    params(
        ("level" = Option<String>, Query, description = "Beginner, Intermediate or Advanced"),
        ("search" = Option<String>, Query, description = "Case-insensitive match on title or description"),
        ("limit" = Option<i64>, Query, description = "Page size"),
        ("offset" = Option<i64>, Query, description = "Page offset"),
    ),
    responses(
        (status = 200, description = "Requested page of courses", body = Page<Course>),
        (status = 400, description = "Unknown level", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "catalog"
)]
pub async fn courses_list_handler(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> WebResult<impl IntoResponse> {
    let level = query.level.filter(|l| !l.is_empty());
    if let Some(level) = &level {
        if !is_valid_level(level) {
            return Err(WebError::resource_bad_request(
                Course::get_resource_type(),
                format!("Unknown level `{level}`"),
            ));
        }
    }

    let filter = CourseFilter {
        level,
        search: query.search,
    };
    let (limit, offset) = PaginationQuery::new(query.limit, query.offset).bounds();

    let (items, total) = tokio::try_join!(
        Course::search_active(state.pool(), &filter, limit, offset),
        Course::count_active(state.pool(), &filter),
    )
    .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(Page::new(items, total, limit, offset))))
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}",
    description = "Course with its modules and lessons",
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Course found", body = CourseDetailsResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "catalog"
)]
pub async fn courses_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let course = load_course(&state, id).await?;

    // drafts and archived courses are visible to their owner and admins only
    if !course.is_active() {
        let visible = ctx
            .maybe_user()
            .is_some_and(|u| u.is_admin() || u.user_id() == course.owner_id());
        if !visible {
            return Err(WebError::resource_not_found(Course::get_resource_type()));
        }
    }

    let user_id = ctx.maybe_user().map(|u| u.user_id());
    let rows = MoocWithLessonsRow::fetch_by_course(state.pool(), course.id(), user_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let moocs = rows
        .into_iter()
        .map(MoocResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            WebError::resource_fetch_error(Course::get_resource_type(), DatabaseError::from(e))
        })?;

    let is_enrolled = match ctx.maybe_user() {
        Some(user) => find_enrollment(&state, user, course.id()).await?.is_some(),
        None => false,
    };

    Ok((
        StatusCode::OK,
        Json(CourseDetailsResponse {
            course,
            is_enrolled,
            moocs,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/courses",
    description = "Creates a course owned by the caller; it waits for admin approval",
    request_body = CourseCreate,
    responses(
        (status = 200, description = "Course created", body = Course),
        (status = 400, description = "Invalid course data", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Instructor role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "catalog",
    security(
        ("cookie" = [])
    )
)]
pub async fn courses_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    if !payload.is_valid() {
        return Err(WebError::resource_bad_request(
            Course::get_resource_type(),
            "Course needs a title, a known level and a non-negative price",
        ));
    }

    let course = Course::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    tracing::info!("course {} submitted for review", course.id());
    Ok((StatusCode::OK, Json(course)))
}

#[utoipa::path(
    put,
    path = "/api/courses/{course_id}",
    description = "Updates a course; non-admin edits send it back to review",
    request_body = CourseCreate,
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Invalid course data", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You don't own this course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "catalog",
    security(
        ("cookie" = [])
    )
)]
pub async fn courses_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourseCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = load_owned_course(&state, user, id).await?;

    if !payload.is_valid() {
        return Err(WebError::resource_bad_request(
            Course::get_resource_type(),
            "Course needs a title, a known level and a non-negative price",
        ));
    }

    let updated = course
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/enroll",
    description = "Enrolls the caller in a free course",
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Enrolled", body = Enrollment),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 402, description = "Paid course, use checkout", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Already enrolled", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "catalog",
    security(
        ("cookie" = [])
    )
)]
pub async fn courses_enroll_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = load_course(&state, id).await?;
    if !course.is_active() {
        return Err(WebError::resource_not_found(Course::get_resource_type()));
    }

    if find_enrollment(&state, user, course.id()).await?.is_some() {
        return Err(WebError::resource_conflict(
            Enrollment::get_resource_type(),
            "Already enrolled in this course",
        ));
    }

    if !course.is_free() {
        return Err(WebError::payment_required());
    }

    let mut tx = state
        .pool()
        .begin()
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;
    let enrollment = Enrollment::create(&mut tx, user.user_id(), course.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;
    tx.commit()
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e.into()))?;

    tracing::info!("user {} enrolled in course {}", user.user_id(), course.id());
    Ok((StatusCode::OK, Json(enrollment)))
}
