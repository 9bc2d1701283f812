use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::web::middlewares::AUTH_TOKEN;

pub struct SessionAuthModifier;

impl Modify for SessionAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    AUTH_TOKEN,
                    "JWT token for current user",
                ))),
            );
            schema.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::routes::account::user_signup_handler,
        crate::web::routes::account::user_signin_handler,
        crate::web::routes::account::user_verify_handler,
        crate::web::routes::account::user_list_handler,
        crate::web::routes::account::user_update_handler,
        crate::web::routes::account::user_delete_handler,
        crate::web::routes::courses::courses_list_handler,
        crate::web::routes::courses::courses_get_handler,
        crate::web::routes::courses::courses_create_handler,
        crate::web::routes::courses::courses_update_handler,
        crate::web::routes::courses::courses_enroll_handler,
        crate::web::routes::instructor::instructor_courses_handler,
        crate::web::routes::instructor::instructor_mooc_create_handler,
        crate::web::routes::instructor::instructor_lesson_create_handler,
        crate::web::routes::instructor::instructor_lesson_delete_handler,
        crate::web::routes::instructor::instructor_question_create_handler,
        crate::web::routes::instructor::instructor_mooc_update_handler,
        crate::web::routes::instructor::instructor_lesson_update_handler,
        crate::web::routes::instructor::instructor_revenue_handler,
        crate::web::routes::learning::learning_enrollments_handler,
        crate::web::routes::learning::learning_lesson_handler,
        crate::web::routes::learning::learning_lesson_complete_handler,
        crate::web::routes::learning::learning_progress_handler,
        crate::web::routes::learning::learning_certificate_check_handler,
        crate::web::routes::learning::learning_certificate_verify_handler,
        crate::web::routes::exams::exams_info_handler,
        crate::web::routes::exams::exams_start_handler,
        crate::web::routes::exams::exams_submit_handler,
        crate::web::routes::exams::exams_result_handler,
        crate::web::routes::exams::exams_history_handler,
        crate::web::routes::checkout::checkout_order_create_handler,
        crate::web::routes::checkout::checkout_order_complete_handler,
        crate::web::routes::checkout::checkout_orders_handler,
        crate::web::routes::admin::admin_pending_courses_handler,
        crate::web::routes::admin::admin_course_approve_handler,
        crate::web::routes::admin::admin_course_reject_handler,
        crate::web::routes::admin::admin_user_role_handler,
        crate::web::routes::admin::admin_user_lock_handler,
        crate::web::routes::admin::admin_user_unlock_handler,
        crate::web::routes::admin::admin_payouts_handler,
        crate::web::routes::admin::admin_payout_create_handler,
    ),
    modifiers(&SessionAuthModifier),
    tags(
        (name = "account", description = "Sign up, sign in and account management"),
        (name = "catalog", description = "Course catalog and enrollment"),
        (name = "instructor", description = "Course authoring"),
        (name = "learning", description = "Lessons, progress and certificates"),
        (name = "exams", description = "Module exams"),
        (name = "checkout", description = "Payments for paid courses"),
        (name = "admin", description = "Moderation and payouts"),
    )
)]
pub struct ApiDoc;
