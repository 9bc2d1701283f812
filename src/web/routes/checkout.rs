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
    model::{
        ResourceTyped, check_access,
        entity::{Course, Enrollment, Payment},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::checkout::{OrderBody, OrderCompletedResponse},
        error::ErrorResponse,
        middlewares,
        routes::lookup::{find_enrollment, load_course},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/orders", get(checkout_orders_handler).post(checkout_order_create_handler))
        .route("/orders/{id}/complete", post(checkout_order_complete_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/checkout/orders",
    description = "Opens a pending payment for a paid course",
    request_body = OrderBody,
    responses(
        (status = 200, description = "Pending payment created", body = Payment),
        (status = 400, description = "Course is free", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Already enrolled", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
pub async fn checkout_order_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<OrderBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = load_course(&state, payload.course_id).await?;
    if !course.is_active() {
        return Err(WebError::resource_not_found(
            Course::get_resource_type(),
        ));
    }

    if find_enrollment(&state, user, course.id()).await?.is_some() {
        return Err(WebError::resource_conflict(
            Enrollment::get_resource_type(),
            "Already enrolled in this course",
        ));
    }

    if course.is_free() {
        return Err(WebError::resource_bad_request(
            Payment::get_resource_type(),
            "Free courses do not need a payment, enroll directly",
        ));
    }

    let payment = Payment::create(state.pool(), user, course.id(), course.price_cents())
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?;

    tracing::info!("payment {} opened for course {}", payment.id(), course.id());
    Ok((StatusCode::OK, Json(payment)))
}

#[utoipa::path(
    post,
    path = "/api/checkout/orders/{payment_id}/complete",
    description = "Confirms a pending payment and enrolls the payer",
    params(
        ("payment_id" = Uuid, Path, description = "ID of the payment")
    ),
    responses(
        (status = 200, description = "Payment completed", body = OrderCompletedResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Payment belongs to another user", body = ErrorResponse),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment already completed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
pub async fn checkout_order_complete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let payment = Payment::find_by_id(state.pool(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Payment::get_resource_type()))?;

    check_access(state.pool(), user, &payment, user.user_id())
        .await
        .map_err(|e| WebError::resource_access_error(Payment::get_resource_type(), e))?;

    if payment.is_completed() {
        return Err(WebError::resource_conflict(
            Payment::get_resource_type(),
            "Payment already completed",
        ));
    }

    let mut tx = state
        .pool()
        .begin()
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?;

    let txn_ref = format!("TXN-{}", Uuid::new_v4().simple()).to_uppercase();
    let payment = payment
        .complete(&mut tx, &txn_ref)
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?
        .ok_or_else(|| {
            WebError::resource_conflict(Payment::get_resource_type(), "Payment already completed")
        })?;

    let enrollment = Enrollment::create(&mut tx, payment.user_id(), payment.course_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

    tx.commit()
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e.into()))?;

    tracing::info!("payment {} completed ({txn_ref})", payment.id());
    Ok((
        StatusCode::OK,
        Json(OrderCompletedResponse {
            payment,
            enrollment,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/checkout/orders",
    description = "Payments of the caller, newest first",
    responses(
        (status = 200, description = "Payments", body = Vec<Payment>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "checkout",
    security(
        ("cookie" = [])
    )
)]
pub async fn checkout_orders_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let payments = Payment::all_by_user(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Payment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(payments)))
}
