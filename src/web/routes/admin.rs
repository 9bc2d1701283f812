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
        CrudRepository, ResourceTyped,
        entity::{Course, InstructorRevenueRow, Payout, UserEntity, course, user},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::admin::{InstructorPayoutResponse, RejectBody, RoleBody},
        error::ErrorResponse,
        middlewares,
        routes::lookup::load_course,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/courses/pending", get(admin_pending_courses_handler))
        .route("/courses/{id}/approve", put(admin_course_approve_handler))
        .route("/courses/{id}/reject", put(admin_course_reject_handler))
        .route("/users/{id}/role", put(admin_user_role_handler))
        .route("/users/{id}/lock", put(admin_user_lock_handler))
        .route("/users/{id}/unlock", put(admin_user_unlock_handler))
        .route("/payouts", get(admin_payouts_handler))
        .route("/payouts/{instructor_id}", post(admin_payout_create_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn load_user(state: &AppState, admin: &AuthenticatedUser, id: Uuid) -> WebResult<UserEntity> {
    UserEntity::find_by_id(state.pool(), admin, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))
}

#[utoipa::path(
    get,
    path = "/api/admin/courses/pending",
    description = "Courses waiting for review, oldest first",
    responses(
        (status = 200, description = "Pending courses", body = Vec<Course>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("cookie" = [])
    )
)]
pub async fn admin_pending_courses_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    ctx.admin()?;
    let courses = Course::all_by_status(state.pool(), course::STATUS_PENDING)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(courses)))
}

#[utoipa::path(
    put,
    path = "/api/admin/courses/{course_id}/approve",
    description = "Publishes a course in the catalog",
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Course approved", body = Course),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("cookie" = [])
    )
)]
pub async fn admin_course_approve_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let admin = ctx.admin()?;
    let course = load_course(&state, id)
        .await?
        .set_status(state.pool(), admin, course::STATUS_ACTIVE)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    tracing::info!("course {} approved", course.id());
    Ok((StatusCode::OK, Json(course)))
}

#[utoipa::path(
    put,
    path = "/api/admin/courses/{course_id}/reject",
    description = "Archives a course; the reason is only logged",
    request_body = RejectBody,
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Course rejected", body = Course),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("cookie" = [])
    )
)]
pub async fn admin_course_reject_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<RejectBody>>,
) -> WebResult<impl IntoResponse> {
    let admin = ctx.admin()?;
    let course = load_course(&state, id)
        .await?
        .set_status(state.pool(), admin, course::STATUS_ARCHIVED)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let reason = payload.and_then(|Json(body)| body.reason).unwrap_or_default();
    tracing::info!("course {} rejected: {reason}", course.id());
    Ok((StatusCode::OK, Json(course)))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/role",
    description = "Switches a user between learner and instructor",
    request_body = RoleBody,
    params(
        ("user_id" = Uuid, Path, description = "ID of the user")
    ),
    responses(
        (status = 200, description = "Role updated", body = UserEntity),
        (status = 400, description = "Unknown role or admin target", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("cookie" = [])
    )
)]
pub async fn admin_user_role_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleBody>,
) -> WebResult<impl IntoResponse> {
    let admin = ctx.admin()?;
    let role = match payload.role.as_str() {
        "learner" => UserRole::Learner,
        "instructor" => UserRole::Instructor,
        other => {
            return Err(WebError::resource_bad_request(
                UserEntity::get_resource_type(),
                format!("Role `{other}` cannot be assigned"),
            ));
        }
    };

    let target = load_user(&state, admin, id).await?;
    if target.role() == UserRole::Admin {
        return Err(WebError::resource_bad_request(
            UserEntity::get_resource_type(),
            "Admin accounts cannot be changed",
        ));
    }

    let updated = target
        .set_role(state.pool(), admin, role)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    tracing::info!("user {} is now {role}", updated.id());
    Ok((StatusCode::OK, Json(updated)))
}

async fn set_user_status(
    ctx: RequestContext,
    state: AppState,
    id: Uuid,
    status: &str,
) -> WebResult<UserEntity> {
    let admin = ctx.admin()?;
    let target = load_user(&state, admin, id).await?;
    if target.role() == UserRole::Admin {
        return Err(WebError::resource_bad_request(
            UserEntity::get_resource_type(),
            "Admin accounts cannot be locked",
        ));
    }

    let updated = target
        .set_status(state.pool(), admin, status)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    tracing::info!("user {} is now {status}", updated.id());
    Ok(updated)
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/lock",
    description = "Locks an account; its sessions stop authenticating",
    params(
        ("user_id" = Uuid, Path, description = "ID of the user")
    ),
    responses(
        (status = 200, description = "Account locked", body = UserEntity),
        (status = 400, description = "Admin target", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("cookie" = [])
    )
)]
pub async fn admin_user_lock_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let updated = set_user_status(ctx, state, id, user::STATUS_LOCKED).await?;
    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/unlock",
    description = "Unlocks an account",
    params(
        ("user_id" = Uuid, Path, description = "ID of the user")
    ),
    responses(
        (status = 200, description = "Account unlocked", body = UserEntity),
        (status = 400, description = "Admin target", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("cookie" = [])
    )
)]
pub async fn admin_user_unlock_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let updated = set_user_status(ctx, state, id, user::STATUS_ACTIVE).await?;
    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    get,
    path = "/api/admin/payouts",
    description = "Revenue and outstanding share of every instructor",
    responses(
        (status = 200, description = "Instructor balances", body = Vec<InstructorPayoutResponse>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("cookie" = [])
    )
)]
pub async fn admin_payouts_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    ctx.admin()?;
    let share = state.config().payouts().instructor_share_percent();

    let rows = InstructorRevenueRow::fetch_all(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Payout::get_resource_type(), e))?;

    let balances: Vec<InstructorPayoutResponse> = rows
        .into_iter()
        .map(|row| InstructorPayoutResponse::new(row, share))
        .collect();

    Ok((StatusCode::OK, Json(balances)))
}

#[utoipa::path(
    post,
    path = "/api/admin/payouts/{instructor_id}",
    description = "Pays out the outstanding share of an instructor",
    params(
        ("instructor_id" = Uuid, Path, description = "ID of the instructor")
    ),
    responses(
        (status = 200, description = "Payout recorded", body = Payout),
        (status = 400, description = "Nothing to pay out", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Instructor not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("cookie" = [])
    )
)]
pub async fn admin_payout_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(instructor_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    ctx.admin()?;
    let share = state.config().payouts().instructor_share_percent();

    let mut tx = state
        .pool()
        .begin()
        .await
        .map_err(|e| WebError::resource_fetch_error(Payout::get_resource_type(), e))?;

    // serializes concurrent payouts to the same instructor
    let exists = UserEntity::lock_for_update(&mut tx, instructor_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Payout::get_resource_type(), e))?;
    if !exists {
        return Err(WebError::resource_not_found(UserEntity::get_resource_type()));
    }

    let balance = InstructorRevenueRow::fetch_one(&mut *tx, instructor_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Payout::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))?;

    let outstanding = balance.outstanding_cents(share);
    if outstanding <= 0 {
        return Err(WebError::resource_bad_request(
            Payout::get_resource_type(),
            "Nothing to pay out",
        ));
    }

    let payout = Payout::create(&mut tx, instructor_id, outstanding)
        .await
        .map_err(|e| WebError::resource_fetch_error(Payout::get_resource_type(), e))?;

    tx.commit()
        .await
        .map_err(|e| WebError::resource_fetch_error(Payout::get_resource_type(), e.into()))?;

    tracing::info!("paid out {} cents to {}", payout.amount_cents(), instructor_id);
    Ok((StatusCode::OK, Json(payout)))
}
