//! services/api/src/web/admin.rs
//!
//! The admin console endpoints: course and lesson CRUD. Every mutation is
//! followed by a full re-fetch of the affected collection, and the response
//! carries that refreshed collection (invalidate-and-reload, never a local
//! patch).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use training_portal_core::domain::{CourseDraft, TrainingDraft};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{store_failure, CourseBody, TrainingBody};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CoursePayload {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct TrainingPayload {
    pub title: String,
    pub video_url: String,
    pub order_number: i32,
    pub course_id: Uuid,
}

/// Deleting a course touches two collections (the cascade removes its
/// lessons), so the response refreshes both.
#[derive(Serialize, ToSchema)]
pub struct DeleteCourseResponse {
    pub courses: Vec<CourseBody>,
    pub trainings: Vec<TrainingBody>,
}

//=========================================================================================
// Form validation
//=========================================================================================

fn course_draft(payload: CoursePayload) -> Result<CourseDraft, (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "The course title is required".to_string(),
        ));
    }
    Ok(CourseDraft {
        title: payload.title,
        description: payload
            .description
            .filter(|description| !description.trim().is_empty()),
    })
}

fn training_draft(payload: TrainingPayload) -> Result<TrainingDraft, (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "The lesson title is required".to_string(),
        ));
    }
    if payload.video_url.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "The video URL is required".to_string(),
        ));
    }
    if payload.order_number < 1 {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "The lesson order must be 1 or greater".to_string(),
        ));
    }
    Ok(TrainingDraft {
        title: payload.title,
        video_url: payload.video_url,
        order_number: payload.order_number,
        course_id: payload.course_id,
    })
}

//=========================================================================================
// Course CRUD
//=========================================================================================

/// POST /courses - Add a course.
#[utoipa::path(
    post,
    path = "/courses",
    request_body = CoursePayload,
    responses(
        (status = 201, description = "The refreshed course list", body = [CourseBody]),
        (status = 403, description = "Not an admin"),
        (status = 422, description = "Missing required fields"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CoursePayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let draft = course_draft(payload)?;
    state.catalog.create_course(draft).await.map_err(store_failure)?;

    let courses = state.catalog.list_courses().await.map_err(store_failure)?;
    let body: Vec<CourseBody> = courses.into_iter().map(CourseBody::from).collect();
    Ok((StatusCode::CREATED, Json(body)))
}

/// PUT /courses/{id} - Edit a course.
#[utoipa::path(
    put,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "The course id")),
    request_body = CoursePayload,
    responses(
        (status = 200, description = "The refreshed course list", body = [CourseBody]),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Course not found"),
        (status = 422, description = "Missing required fields"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<CoursePayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let draft = course_draft(payload)?;
    state
        .catalog
        .update_course(course_id, draft)
        .await
        .map_err(store_failure)?;

    let courses = state.catalog.list_courses().await.map_err(store_failure)?;
    let body: Vec<CourseBody> = courses.into_iter().map(CourseBody::from).collect();
    Ok(Json(body))
}

/// DELETE /courses/{id} - Delete a course and (via the store) its lessons.
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "The course id")),
    responses(
        (status = 200, description = "The refreshed courses and lessons", body = DeleteCourseResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Course not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .catalog
        .delete_course(course_id)
        .await
        .map_err(store_failure)?;

    // The cascade dropped the course's lessons at the store; re-fetch both
    // collections so the client's view reflects that.
    let courses = state.catalog.list_courses().await.map_err(store_failure)?;
    let trainings = state.catalog.list_trainings().await.map_err(store_failure)?;
    Ok(Json(DeleteCourseResponse {
        courses: courses.into_iter().map(CourseBody::from).collect(),
        trainings: trainings.into_iter().map(TrainingBody::from).collect(),
    }))
}

//=========================================================================================
// Training CRUD
//=========================================================================================

/// POST /trainings - Add a lesson to a course.
#[utoipa::path(
    post,
    path = "/trainings",
    request_body = TrainingPayload,
    responses(
        (status = 201, description = "The refreshed lesson list", body = [TrainingBody]),
        (status = 403, description = "Not an admin"),
        (status = 422, description = "Missing required fields"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_training_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TrainingPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let draft = training_draft(payload)?;
    state
        .catalog
        .create_training(draft)
        .await
        .map_err(store_failure)?;

    let trainings = state.catalog.list_trainings().await.map_err(store_failure)?;
    let body: Vec<TrainingBody> = trainings.into_iter().map(TrainingBody::from).collect();
    Ok((StatusCode::CREATED, Json(body)))
}

/// PUT /trainings/{id} - Edit a lesson.
#[utoipa::path(
    put,
    path = "/trainings/{id}",
    params(("id" = Uuid, Path, description = "The training id")),
    request_body = TrainingPayload,
    responses(
        (status = 200, description = "The refreshed lesson list", body = [TrainingBody]),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Training not found"),
        (status = 422, description = "Missing required fields"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_training_handler(
    State(state): State<Arc<AppState>>,
    Path(training_id): Path<Uuid>,
    Json(payload): Json<TrainingPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let draft = training_draft(payload)?;
    state
        .catalog
        .update_training(training_id, draft)
        .await
        .map_err(store_failure)?;

    let trainings = state.catalog.list_trainings().await.map_err(store_failure)?;
    let body: Vec<TrainingBody> = trainings.into_iter().map(TrainingBody::from).collect();
    Ok(Json(body))
}

/// DELETE /trainings/{id} - Delete a lesson.
#[utoipa::path(
    delete,
    path = "/trainings/{id}",
    params(("id" = Uuid, Path, description = "The training id")),
    responses(
        (status = 200, description = "The refreshed lesson list", body = [TrainingBody]),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Training not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_training_handler(
    State(state): State<Arc<AppState>>,
    Path(training_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .catalog
        .delete_training(training_id)
        .await
        .map_err(store_failure)?;

    let trainings = state.catalog.list_trainings().await.map_err(store_failure)?;
    let body: Vec<TrainingBody> = trainings.into_iter().map(TrainingBody::from).collect();
    Ok(Json(body))
}
