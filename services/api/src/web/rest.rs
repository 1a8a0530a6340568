//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the catalog-browsing and progress REST
//! endpoints, and the master definition for the OpenAPI specification.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use training_portal_core::domain::{CompletedLesson, Course, Training};
use training_portal_core::progress::{
    course_trainings, is_course_completed, is_lesson_completed, sort_for_display,
};
use training_portal_core::ports::PortError;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::state::{AppState, CurrentUser};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::session_handler,
        list_courses_handler,
        course_progress_handler,
        list_trainings_handler,
        list_completed_lessons_handler,
        complete_lesson_handler,
        crate::web::admin::create_course_handler,
        crate::web::admin::update_course_handler,
        crate::web::admin::delete_course_handler,
        crate::web::admin::create_training_handler,
        crate::web::admin::update_training_handler,
        crate::web::admin::delete_training_handler,
    ),
    components(schemas(
        crate::web::auth::SignupRequest,
        crate::web::auth::LoginRequest,
        crate::web::auth::SessionResponse,
        crate::web::admin::CoursePayload,
        crate::web::admin::TrainingPayload,
        crate::web::admin::DeleteCourseResponse,
        CourseBody,
        TrainingBody,
        CompletedLessonBody,
        CompleteLessonRequest,
        LessonProgress,
        CourseProgressResponse,
    )),
    tags(
        (name = "Training Portal API", description = "API endpoints for the video training portal.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A course as presented to clients.
#[derive(Serialize, ToSchema)]
pub struct CourseBody {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseBody {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            created_at: course.created_at,
        }
    }
}

/// A lesson as presented to clients.
#[derive(Serialize, ToSchema)]
pub struct TrainingBody {
    pub id: Uuid,
    pub title: String,
    pub video_url: String,
    pub order_number: i32,
    pub course_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Training> for TrainingBody {
    fn from(training: Training) -> Self {
        Self {
            id: training.id,
            title: training.title,
            video_url: training.video_url,
            order_number: training.order_number,
            course_id: training.course_id,
            created_at: training.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CompletedLessonBody {
    pub id: Uuid,
    pub user_id: Uuid,
    pub training_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

impl From<CompletedLesson> for CompletedLessonBody {
    fn from(lesson: CompletedLesson) -> Self {
        Self {
            id: lesson.id,
            user_id: lesson.user_id,
            training_id: lesson.training_id,
            completed_at: lesson.completed_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteLessonRequest {
    pub training_id: Uuid,
}

/// One lesson of a course together with its completion flag for the
/// requesting user.
#[derive(Serialize, ToSchema)]
pub struct LessonProgress {
    pub training: TrainingBody,
    pub completed: bool,
}

/// A course's lessons in display order plus the derived course-completed
/// flag. Never persisted; computed fresh on every request.
#[derive(Serialize, ToSchema)]
pub struct CourseProgressResponse {
    pub course_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub lessons: Vec<LessonProgress>,
}

#[derive(Deserialize)]
pub struct TrainingsQuery {
    pub course_id: Option<Uuid>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// GET /courses - The full course catalog.
#[utoipa::path(
    get,
    path = "/courses",
    responses(
        (status = 200, description = "All courses", body = [CourseBody]),
        (status = 401, description = "No live session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let courses = state.catalog.list_courses().await.map_err(store_failure)?;
    let body: Vec<CourseBody> = courses.into_iter().map(CourseBody::from).collect();
    Ok(Json(body))
}

/// GET /courses/{id}/progress - The course's lessons with completion state.
///
/// Powers the lesson player and the completion celebration: the course is
/// reported complete iff every one of its lessons is completed by the
/// requesting user, vacuously so when it has no lessons.
#[utoipa::path(
    get,
    path = "/courses/{id}/progress",
    params(
        ("id" = Uuid, Path, description = "The course id")
    ),
    responses(
        (status = 200, description = "Course progress", body = CourseProgressResponse),
        (status = 401, description = "No live session"),
        (status = 404, description = "Course not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn course_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let courses = state.catalog.list_courses().await.map_err(store_failure)?;
    let course = courses
        .into_iter()
        .find(|c| c.id == course_id)
        .ok_or((StatusCode::NOT_FOUND, "Course not found".to_string()))?;

    let trainings = state.catalog.list_trainings().await.map_err(store_failure)?;
    let completed = state
        .catalog
        .list_completed_lessons(current_user.profile.id)
        .await
        .map_err(store_failure)?;

    let user_id = current_user.profile.id;
    let lessons: Vec<LessonProgress> = course_trainings(course_id, &trainings)
        .into_iter()
        .map(|training| LessonProgress {
            completed: is_lesson_completed(training.id, user_id, &completed),
            training: TrainingBody::from(training.clone()),
        })
        .collect();
    let course_completed = is_course_completed(course_id, &trainings, &completed, user_id);

    Ok(Json(CourseProgressResponse {
        course_id,
        title: course.title,
        completed: course_completed,
        lessons,
    }))
}

/// GET /trainings - All lessons, optionally narrowed to one course.
///
/// Always in display order (order_number ascending, insertion order on
/// ties); the unfiltered list interleaves courses accordingly.
#[utoipa::path(
    get,
    path = "/trainings",
    params(
        ("course_id" = Option<Uuid>, Query, description = "Narrow to one course")
    ),
    responses(
        (status = 200, description = "Lessons", body = [TrainingBody]),
        (status = 401, description = "No live session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_trainings_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrainingsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut trainings = state.catalog.list_trainings().await.map_err(store_failure)?;

    let body: Vec<TrainingBody> = match query.course_id {
        Some(course_id) => course_trainings(course_id, &trainings)
            .into_iter()
            .map(|t| TrainingBody::from(t.clone()))
            .collect(),
        None => {
            sort_for_display(&mut trainings);
            trainings.into_iter().map(TrainingBody::from).collect()
        }
    };
    Ok(Json(body))
}

/// GET /completed-lessons - The requesting user's completion records.
#[utoipa::path(
    get,
    path = "/completed-lessons",
    responses(
        (status = 200, description = "Completion records", body = [CompletedLessonBody]),
        (status = 401, description = "No live session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_completed_lessons_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let completed = state
        .catalog
        .list_completed_lessons(current_user.profile.id)
        .await
        .map_err(store_failure)?;
    let body: Vec<CompletedLessonBody> =
        completed.into_iter().map(CompletedLessonBody::from).collect();
    Ok(Json(body))
}

/// POST /completed-lessons - Mark a lesson complete.
///
/// Idempotent: re-marking a completed lesson changes nothing. The response
/// carries the freshly re-fetched collection rather than a locally patched
/// one, so the client's view is always read-after-write.
#[utoipa::path(
    post,
    path = "/completed-lessons",
    request_body = CompleteLessonRequest,
    responses(
        (status = 201, description = "The refreshed completion records", body = [CompletedLessonBody]),
        (status = 401, description = "No live session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn complete_lesson_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<CompleteLessonRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = current_user.profile.id;
    state
        .catalog
        .mark_lesson_completed(user_id, req.training_id)
        .await
        .map_err(store_failure)?;

    // Invalidate-and-reload: re-fetch the full collection after the mutation.
    let completed = state
        .catalog
        .list_completed_lessons(user_id)
        .await
        .map_err(store_failure)?;
    let body: Vec<CompletedLessonBody> =
        completed.into_iter().map(CompletedLessonBody::from).collect();
    Ok((StatusCode::CREATED, Json(body)))
}

//=========================================================================================
// Error helpers
//=========================================================================================

/// Maps a store failure to a plain-language 5xx. Failures are terminal for
/// the operation: logged, reported, never retried.
pub(crate) fn store_failure(e: PortError) -> (StatusCode, String) {
    error!("Catalog store operation failed: {:?}", e);
    match e {
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found".to_string()),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "The operation failed, try again later".to_string(),
        ),
    }
}
