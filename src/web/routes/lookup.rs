//! Loaders shared by handlers, mapping missing rows to 404.

use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{Course, Enrollment, Mooc},
    },
    web::{AppState, AuthenticatedUser, WebError, WebResult},
};

pub async fn load_course(state: &AppState, id: Uuid) -> WebResult<Course> {
    Course::find_by_id(state.pool(), &AuthenticatedUser::admin(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))
}

pub async fn load_mooc(state: &AppState, id: Uuid) -> WebResult<Mooc> {
    Mooc::find_by_id(state.pool(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Mooc::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Mooc::get_resource_type()))
}

/// Course of `course_id` when `user` owns it or is an admin.
pub async fn load_owned_course(
    state: &AppState,
    user: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<Course> {
    let course = load_course(state, course_id).await?;
    check_access(state.pool(), user, &course, user.user_id())
        .await
        .map_err(|e| WebError::resource_access_error(Course::get_resource_type(), e))?;
    Ok(course)
}

pub async fn find_enrollment(
    state: &AppState,
    user: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<Option<Enrollment>> {
    Enrollment::find(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))
}
