mod common;
use axum::http::StatusCode;
use mini_coursera::web::UserRole;
use serde_json::json;

use crate::common::{
    Action, Flow, FlowContext, setup_server, setup_test_db, signin_action, signin_admin_action,
    signup_action,
};

fn saved_id(ctx: &FlowContext, key: &str) -> String {
    ctx.get(key)["id"].as_str().expect("missing id").to_string()
}

#[tokio::test]
async fn instructor_publishes_course_after_review() {
    let pool = setup_test_db().await;
    pool.seed_user("mentor", "mentor", UserRole::Instructor).await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signin_action("mentor", "mentor"))
        .step(
            Action::new("create_course", "POST", "/api/courses")
                .with_body(json!({
                    "title": "Rust 101",
                    "description": "Ownership and borrowing",
                    "level": "Beginner",
                    "price_cents": 0,
                }))
                .assert_body(|body| assert!(body.contains(r#""status":"pending""#)))
                .with_save_as("course"),
        )
        .step(
            Action::new("create_course_bad_level", "POST", "/api/courses")
                .with_body(json!({
                    "title": "Rust 102",
                    "description": "",
                    "level": "Wizard",
                    "price_cents": 0,
                }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("create_mooc", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/instructor/courses/{}/moocs", saved_id(ctx, "course"))
                })
                .with_body(json!({ "title": "Intro" }))
                .assert_body(|body| assert!(body.contains(r#""order_index":1"#)))
                .with_save_as("mooc"),
        )
        .step(
            Action::new("create_lesson", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/instructor/moocs/{}/lessons", saved_id(ctx, "mooc")))
                .with_body(json!({ "title": "Hello, cargo", "content": "# cargo new" }))
                .with_save_as("lesson"),
        )
        .step(
            Action::new("rename_mooc", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/instructor/moocs/{}", saved_id(ctx, "mooc")))
                .with_body(json!({ "title": "Getting started" }))
                .assert_body(|body| {
                    assert!(body.contains(r#""title":"Getting started""#));
                    assert!(body.contains(r#""order_index":1"#));
                }),
        )
        .step(
            Action::new("rename_mooc_empty", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/instructor/moocs/{}", saved_id(ctx, "mooc")))
                .with_body(json!({ "title": "  " }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("edit_lesson_title", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/instructor/lessons/{}", saved_id(ctx, "lesson")))
                .with_body(json!({ "title": "Hello, cargo!" }))
                .assert_body(|body| {
                    assert!(body.contains(r#""title":"Hello, cargo!""#));
                    assert!(body.contains("# cargo new"));
                }),
        )
        .step(
            Action::new("create_scratch_lesson", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/instructor/moocs/{}/lessons", saved_id(ctx, "mooc")))
                .with_body(json!({ "title": "Scratch" }))
                .with_save_as("scratch"),
        )
        .step(
            Action::new("delete_scratch_lesson", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/instructor/lessons/{}", saved_id(ctx, "scratch"))),
        )
        .step(
            Action::new("create_question_two_correct", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/instructor/moocs/{}/questions", saved_id(ctx, "mooc")))
                .with_body(json!({
                    "stem": "Which keyword moves?",
                    "options": [
                        { "label": "A", "content": "move", "is_correct": true },
                        { "label": "B", "content": "ref", "is_correct": true },
                    ],
                }))
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("exactly one option must be correct"))),
        )
        .step(
            Action::new("create_question", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/instructor/moocs/{}/questions", saved_id(ctx, "mooc")))
                .with_body(json!({
                    "stem": "Which keyword moves?",
                    "difficulty": "easy",
                    "options": [
                        { "label": "A", "content": "move", "is_correct": true },
                        { "label": "B", "content": "ref" },
                    ],
                }))
                .assert_body(|body| {
                    assert!(body.contains(r#""difficulty":"easy""#));
                    assert!(body.contains(r#""qtype":"single_choice""#));
                }),
        )
        .step(
            Action::new("own_courses", "GET", "/api/instructor/courses")
                .assert_body(|body| assert!(body.contains("Rust 101"))),
        )
        .step(
            Action::new("catalog_hides_pending", "GET", "/api/courses")
                .assert_body(|body| assert!(!body.contains("Rust 101"))),
        )
        .step(signup_action("student", "student").with_clear_cookies(true))
        .step(
            Action::new("learner_cannot_author", "POST", "/api/courses")
                .with_body(json!({
                    "title": "Sneaky",
                    "description": "",
                    "level": "Beginner",
                    "price_cents": 0,
                }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("pending_course_hidden", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/courses/{}", saved_id(ctx, "course")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("learner_cannot_rename_mooc", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/instructor/moocs/{}", saved_id(ctx, "mooc")))
                .with_body(json!({ "title": "Mine now" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("learner_not_admin", "GET", "/api/admin/courses/pending")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("pending_courses", "GET", "/api/admin/courses/pending")
                .assert_body(|body| assert!(body.contains("Rust 101"))),
        )
        .step(
            Action::new("approve", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/admin/courses/{}/approve", saved_id(ctx, "course")))
                .assert_body(|body| assert!(body.contains(r#""status":"active""#))),
        )
        .step(
            Action::new("catalog_search", "GET", "/api/courses")
                .with_param("level", "Beginner")
                .with_param("search", "rust")
                .assert_body(|body| {
                    assert!(body.contains("Rust 101"));
                    assert!(body.contains(r#""total":1"#));
                }),
        )
        .step(
            Action::new("catalog_unknown_level", "GET", "/api/courses")
                .with_param("level", "Wizard")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(signin_action("student", "student").with_clear_cookies(true))
        .step(
            Action::new("course_details", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/courses/{}", saved_id(ctx, "course")))
                .assert_body(|body| {
                    assert!(body.contains(r#""is_enrolled":false"#));
                    assert!(body.contains("Hello, cargo!"));
                    assert!(body.contains("Getting started"));
                    assert!(!body.contains("Scratch"));
                }),
        )
        .step(
            Action::new("enroll", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/courses/{}/enroll", saved_id(ctx, "course"))),
        )
        .step(
            Action::new("course_details_enrolled", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/courses/{}", saved_id(ctx, "course")))
                .assert_body(|body| assert!(body.contains(r#""is_enrolled":true"#))),
        )
        .step(
            Action::new("enrollments", "GET", "/api/learning/enrollments")
                .assert_body(|body| assert!(body.contains("Rust 101"))),
        )
        .step(signin_action("mentor", "mentor").with_clear_cookies(true))
        // edits go back to review
        .step(
            Action::new("update_course", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/courses/{}", saved_id(ctx, "course")))
                .with_body(json!({
                    "title": "Rust 101, second edition",
                    "description": "Ownership and borrowing",
                    "level": "Beginner",
                    "price_cents": 0,
                }))
                .assert_body(|body| assert!(body.contains(r#""status":"pending""#))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn paid_course_checkout_and_payout() {
    let pool = setup_test_db().await;
    let mentor = pool.seed_user("mentor", "mentor", UserRole::Instructor).await;
    let course = pool.seed_course(&mentor, 5000, 1, 1, 1).await;
    let mut server = setup_server(&pool).await;

    let course_id = course.course_id;
    let mentor_id = mentor.id();

    Flow::new()
        .step(signup_action("student", "student").with_save_as("student"))
        .step(
            Action::new("enroll_paid", "POST", "dynamic")
                .with_path(format!("/api/courses/{course_id}/enroll"))
                .with_expect(StatusCode::PAYMENT_REQUIRED)
                .assert_body(|body| assert!(body.contains("PAYMENT_REQUIRED"))),
        )
        .step(
            Action::new("order", "POST", "/api/checkout/orders")
                .with_body(json!({ "course_id": course_id }))
                .assert_body(|body| {
                    assert!(body.contains(r#""status":"pending""#));
                    assert!(body.contains(r#""amount_cents":5000"#));
                })
                .with_save_as("payment"),
        )
        .step(
            Action::new("complete", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/checkout/orders/{}/complete", saved_id(ctx, "payment"))
                })
                .assert_body(|body| {
                    assert!(body.contains(r#""status":"completed""#));
                    assert!(body.contains("TXN-"));
                    assert!(body.contains("enrollment"));
                }),
        )
        .step(
            Action::new("complete_twice", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/checkout/orders/{}/complete", saved_id(ctx, "payment"))
                })
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("order_when_enrolled", "POST", "/api/checkout/orders")
                .with_body(json!({ "course_id": course_id }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("orders", "GET", "/api/checkout/orders")
                .assert_body(|body| assert!(body.contains(r#""status":"completed""#))),
        )
        .step(
            Action::new("learner_has_no_revenue", "GET", "/api/instructor/revenue")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_action("mentor", "mentor").with_clear_cookies(true))
        .step(
            Action::new("revenue", "GET", "/api/instructor/revenue")
                .assert_body(move |body| {
                    assert!(body.contains(r#""sales_count":1"#));
                    assert!(body.contains(r#""gross_cents":5000"#));
                    assert!(body.contains(r#""instructor_share_cents":3500"#));
                    assert!(body.contains(r#""outstanding_cents":3500"#));
                    assert!(body.contains(&course_id.to_string()));
                }),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("payouts", "GET", "/api/admin/payouts")
                .assert_body(|body| {
                    assert!(body.contains(r#""gross_cents":5000"#));
                    assert!(body.contains(r#""instructor_share_cents":3500"#));
                    assert!(body.contains(r#""outstanding_cents":3500"#));
                }),
        )
        .step(
            Action::new("payout", "POST", "dynamic")
                .with_path(format!("/api/admin/payouts/{mentor_id}"))
                .assert_body(|body| assert!(body.contains(r#""amount_cents":3500"#))),
        )
        .step(
            Action::new("payout_nothing_left", "POST", "dynamic")
                .with_path(format!("/api/admin/payouts/{mentor_id}"))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("payout_unknown_instructor", "POST", "dynamic")
                .with_path(format!("/api/admin/payouts/{}", uuid::Uuid::new_v4()))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("payouts_settled", "GET", "/api/admin/payouts")
                .assert_body(|body| {
                    assert!(body.contains(r#""paid_out_cents":3500"#));
                    assert!(body.contains(r#""outstanding_cents":0"#));
                }),
        )
        .step(signin_action("mentor", "mentor").with_clear_cookies(true))
        .step(
            Action::new("revenue_after_payout", "GET", "/api/instructor/revenue")
                .assert_body(|body| {
                    assert!(body.contains(r#""paid_out_cents":3500"#));
                    assert!(body.contains(r#""outstanding_cents":0"#));
                }),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("promote_to_admin", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/admin/users/{}/role", saved_id(ctx, "student")))
                .with_body(json!({ "role": "admin" }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("promote_to_instructor", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/admin/users/{}/role", saved_id(ctx, "student")))
                .with_body(json!({ "role": "instructor" }))
                .assert_body(|body| assert!(body.contains(r#""role":"instructor""#))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn free_course_cannot_be_bought() {
    let pool = setup_test_db().await;
    let mentor = pool.seed_user("mentor", "mentor", UserRole::Instructor).await;
    let course = pool.seed_course(&mentor, 0, 1, 1, 1).await;
    let mut server = setup_server(&pool).await;

    let course_id = course.course_id;

    Flow::new()
        .step(signup_action("student", "student"))
        .step(
            Action::new("order_free", "POST", "/api/checkout/orders")
                .with_body(json!({ "course_id": course_id }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("order_unknown", "POST", "/api/checkout/orders")
                .with_body(json!({ "course_id": uuid::Uuid::new_v4() }))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}
