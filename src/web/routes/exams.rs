use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    exam::{ExamRules, round_score},
    model::{
        ResourceTyped, check_access,
        entity::{
            AttemptStatsRow, Enrollment, ExamAttempt, Lesson, LessonProgress, Mooc, Question,
            QuestionOption, group_options,
        },
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::exams::{
            DetailedResult, ExamInfoResponse, ExamQuestion, ExamResultResponse, ResultOption,
            StartExamResponse, SubmitExamBody, SubmitExamResponse,
        },
        error::{ErrorResponse, ExamError},
        middlewares,
        routes::lookup::{find_enrollment, load_mooc},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/mooc/{mooc_id}", get(exams_info_handler))
        .route("/mooc/{mooc_id}/attempts", get(exams_history_handler))
        .route("/{exam_id}/start", post(exams_start_handler))
        .route("/{exam_id}/submit", post(exams_submit_handler))
        .route("/attempts/{attempt_id}/result", get(exams_result_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn exam_fetch_error(e: crate::model::DatabaseError) -> WebError {
    WebError::resource_fetch_error(ExamAttempt::get_resource_type(), e)
}

#[utoipa::path(
    get,
    path = "/api/exams/mooc/{mooc_id}",
    description = "Exam overview of a module with the caller's eligibility and history",
    params(
        ("mooc_id" = Uuid, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Exam overview", body = ExamInfoResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "exams",
    security(
        ("cookie" = [])
    )
)]
pub async fn exams_info_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(mooc_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let mooc = load_mooc(&state, mooc_id).await?;
    let rules = state.exam_rules();

    let (total_lessons, lessons_completed, available, stats) = tokio::try_join!(
        Lesson::count_by_mooc(state.pool(), mooc.id()),
        LessonProgress::count_completed_in_mooc(state.pool(), user, mooc.id()),
        Question::count_by_mooc(state.pool(), mooc.id()),
        AttemptStatsRow::fetch(state.pool(), user, mooc.id()),
    )
    .map_err(exam_fetch_error)?;

    Ok((
        StatusCode::OK,
        Json(ExamInfoResponse {
            exam_id: mooc.id(),
            mooc_id: mooc.id(),
            mooc_name: mooc.title().to_string(),
            course_id: mooc.course_id(),
            total_questions: rules.exam_size(available),
            duration_minutes: rules.duration_minutes(),
            passing_score: rules.passing_score(),
            can_take_exam: ExamRules::can_take_exam(total_lessons, lessons_completed),
            lessons_completed,
            total_lessons,
            previous_attempts: stats.previous_attempts,
            best_score: stats.best_score,
            last_attempt_date: stats.last_attempt_date,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/exams/{exam_id}/start",
    description = "Starts a timed attempt with randomly drawn questions",
    params(
        ("exam_id" = Uuid, Path, description = "ID of the module the exam belongs to")
    ),
    responses(
        (status = 200, description = "Attempt started", body = StartExamResponse),
        (status = 400, description = "Lessons incomplete or cooldown active", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not enrolled in this course", body = ErrorResponse),
        (status = 404, description = "Module not found or no questions", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "exams",
    security(
        ("cookie" = [])
    )
)]
#[tracing::instrument(skip(ctx, state))]
pub async fn exams_start_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(exam_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let mooc = load_mooc(&state, exam_id).await?;
    let rules = state.exam_rules();

    if find_enrollment(&state, user, mooc.course_id()).await?.is_none() {
        return Err(ExamError::ExamNotEnrolled.into());
    }

    let (total_lessons, lessons_completed) = tokio::try_join!(
        Lesson::count_by_mooc(state.pool(), mooc.id()),
        LessonProgress::count_completed_in_mooc(state.pool(), user, mooc.id()),
    )
    .map_err(exam_fetch_error)?;

    if !ExamRules::can_take_exam(total_lessons, lessons_completed) {
        return Err(ExamError::ExamLessonsIncomplete.into());
    }

    let last_started = ExamAttempt::last_started_at(state.pool(), user, mooc.id())
        .await
        .map_err(exam_fetch_error)?;
    if let Some(seconds) = rules.cooldown_remaining(last_started, Utc::now()) {
        return Err(ExamError::ExamCooldown { seconds }.into());
    }

    let questions = Question::random_for_mooc(state.pool(), mooc.id(), rules.question_count())
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;
    if questions.is_empty() {
        return Err(ExamError::ExamNoQuestions.into());
    }

    let question_ids: Vec<Uuid> = questions.iter().map(|q| q.id()).collect();
    let options = QuestionOption::shuffled_for(state.pool(), &question_ids)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuestionOption::get_resource_type(), e))?;
    let mut options = group_options(options);

    let attempt = ExamAttempt::create(state.pool(), user, mooc.id(), &question_ids)
        .await
        .map_err(exam_fetch_error)?;

    let questions = questions
        .into_iter()
        .map(|q| ExamQuestion {
            question_id: q.id(),
            stem: q.stem().to_string(),
            qtype: q.qtype().to_string(),
            difficulty: q.difficulty().to_string(),
            options: options
                .remove(&q.id())
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
        })
        .collect();

    tracing::info!("attempt {} started on module {}", attempt.id(), mooc.id());
    Ok((
        StatusCode::OK,
        Json(StartExamResponse {
            attempt_id: attempt.id(),
            started_at: attempt.started_at(),
            expires_at: rules.expires_at(attempt.started_at()),
            duration_minutes: rules.duration_minutes(),
            total_questions: attempt.total_questions(),
            questions,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/exams/{exam_id}/submit",
    description = "Grades an attempt and unlocks the next module on a first pass",
    request_body = SubmitExamBody,
    params(
        ("exam_id" = Uuid, Path, description = "ID of the module the exam belongs to")
    ),
    responses(
        (status = 200, description = "Attempt graded", body = SubmitExamResponse),
        (status = 400, description = "Already submitted, time exceeded or wrong exam", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Attempt belongs to another user", body = ErrorResponse),
        (status = 404, description = "Attempt not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "exams",
    security(
        ("cookie" = [])
    )
)]
#[tracing::instrument(skip(ctx, state, payload))]
pub async fn exams_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(exam_id): Path<Uuid>,
    Json(payload): Json<SubmitExamBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rules = state.exam_rules();

    let attempt = ExamAttempt::find_by_id(state.pool(), payload.attempt_id)
        .await
        .map_err(exam_fetch_error)?
        .ok_or_else(|| WebError::resource_not_found(ExamAttempt::get_resource_type()))?;

    if attempt.user_id() != user.user_id() {
        return Err(WebError::resource_forbidden(ExamAttempt::get_resource_type()));
    }
    if attempt.mooc_id() != exam_id {
        return Err(ExamError::ExamAttemptMismatch.into());
    }
    if attempt.is_submitted() {
        return Err(ExamError::ExamAlreadySubmitted.into());
    }

    let time_taken = ExamRules::elapsed_seconds(attempt.started_at(), Utc::now());
    if rules.is_time_exceeded(time_taken) {
        return Err(ExamError::ExamTimeLimitExceeded.into());
    }

    let mooc = load_mooc(&state, attempt.mooc_id()).await?;
    let mut tx = state.pool().begin().await.map_err(exam_fetch_error)?;

    let correct_labels = QuestionOption::correct_labels(&mut tx, attempt.question_ids())
        .await
        .map_err(|e| WebError::resource_fetch_error(QuestionOption::get_resource_type(), e))?;
    let grade = rules.grade(attempt.question_ids(), &payload.answers, &correct_labels);

    let recorded = attempt
        .record_submission(&mut tx, &grade, time_taken as i32, &payload.answers)
        .await
        .map_err(exam_fetch_error)?;
    if !recorded {
        return Err(ExamError::ExamAlreadySubmitted.into());
    }

    let mut next_mooc_unlocked = false;
    if grade.passed {
        // the enrollment lock must come first: once it is held, passes
        // committed by concurrent submits are visible to the count below
        let enrollment = Enrollment::find_for_update(&mut tx, user.user_id(), mooc.course_id())
            .await
            .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

        let other_passes =
            ExamAttempt::count_other_passes(&mut tx, user.user_id(), mooc.id(), attempt.id())
                .await
                .map_err(exam_fetch_error)?;

        if let (0, Some(enrollment)) = (other_passes, enrollment) {
            let next = mooc.next(&mut tx).await.map_err(|e| {
                WebError::resource_fetch_error(Mooc::get_resource_type(), e)
            })?;

            match next {
                Some(next) => {
                    let module_count = Mooc::count_by_course(&mut tx, mooc.course_id())
                        .await
                        .map_err(|e| WebError::resource_fetch_error(Mooc::get_resource_type(), e))?;
                    let progress = ExamRules::progress_after(
                        enrollment.moocs_completed() + 1,
                        module_count,
                        true,
                    );
                    enrollment
                        .advance(&mut tx, next.id(), progress)
                        .await
                        .map_err(|e| {
                            WebError::resource_fetch_error(Enrollment::get_resource_type(), e)
                        })?;
                    next_mooc_unlocked = true;
                }
                None => {
                    let overall = ExamAttempt::average_passing_score(
                        &mut tx,
                        user.user_id(),
                        mooc.course_id(),
                    )
                    .await
                    .map_err(exam_fetch_error)?;
                    enrollment
                        .finish_moocs(&mut tx, overall.map(round_score))
                        .await
                        .map_err(|e| {
                            WebError::resource_fetch_error(Enrollment::get_resource_type(), e)
                        })?;
                }
            }
        }
    }

    tx.commit()
        .await
        .map_err(|e| exam_fetch_error(e.into()))?;

    tracing::info!(
        "attempt {} submitted: {:.2}% ({})",
        attempt.id(),
        grade.score,
        if grade.passed { "passed" } else { "failed" }
    );

    Ok((
        StatusCode::OK,
        Json(SubmitExamResponse {
            attempt_id: attempt.id(),
            score: round_score(grade.score),
            correct_answers: grade.correct_answers,
            total_questions: grade.total_questions,
            passed: grade.passed,
            time_taken: time_taken as i32,
            next_mooc_unlocked,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/exams/attempts/{attempt_id}/result",
    description = "Graded attempt with the correct option of every question",
    params(
        ("attempt_id" = Uuid, Path, description = "ID of the attempt")
    ),
    responses(
        (status = 200, description = "Attempt result", body = ExamResultResponse),
        (status = 400, description = "Attempt not submitted yet", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Attempt belongs to another user", body = ErrorResponse),
        (status = 404, description = "Attempt not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "exams",
    security(
        ("cookie" = [])
    )
)]
pub async fn exams_result_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let attempt = ExamAttempt::find_by_id(state.pool(), attempt_id)
        .await
        .map_err(exam_fetch_error)?
        .ok_or_else(|| WebError::resource_not_found(ExamAttempt::get_resource_type()))?;

    check_access(state.pool(), user, &attempt, user.user_id())
        .await
        .map_err(|e| WebError::resource_access_error(ExamAttempt::get_resource_type(), e))?;

    if !attempt.is_submitted() {
        return Err(ExamError::ExamNotSubmitted.into());
    }

    let mooc = load_mooc(&state, attempt.mooc_id()).await?;
    let answers = attempt.answers().map_err(exam_fetch_error)?;
    let answered: Vec<Uuid> = answers.iter().map(|a| a.question_id).collect();

    let (questions, options) = tokio::try_join!(
        Question::find_many(state.pool(), &answered),
        QuestionOption::ordered_for(state.pool(), &answered),
    )
    .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    let questions: HashMap<Uuid, Question> = questions.into_iter().map(|q| (q.id(), q)).collect();
    let options = group_options(options);

    let details = answers
        .into_iter()
        .filter_map(|answer| {
            let question = questions.get(&answer.question_id)?;
            let options = options.get(&answer.question_id).map(Vec::as_slice).unwrap_or_default();
            let correct_option = options
                .iter()
                .find(|o| o.is_correct())
                .map(|o| o.label().to_string())
                .unwrap_or_default();

            Some(DetailedResult {
                question_id: question.id(),
                stem: question.stem().to_string(),
                difficulty: question.difficulty().to_string(),
                is_correct: !correct_option.is_empty() && answer.selected_option == correct_option,
                selected_option: answer.selected_option,
                correct_option,
                options: options.iter().map(ResultOption::from).collect(),
            })
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(ExamResultResponse::new(&attempt, mooc.title().to_string(), details)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/exams/mooc/{mooc_id}/attempts",
    description = "The caller's attempts on a module, newest first",
    params(
        ("mooc_id" = Uuid, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Attempt history", body = Vec<ExamAttempt>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "exams",
    security(
        ("cookie" = [])
    )
)]
pub async fn exams_history_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(mooc_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let mooc = load_mooc(&state, mooc_id).await?;

    let attempts = ExamAttempt::history(state.pool(), user, mooc.id())
        .await
        .map_err(exam_fetch_error)?;

    Ok((StatusCode::OK, Json(attempts)))
}
