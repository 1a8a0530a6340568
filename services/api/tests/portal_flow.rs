//! services/api/tests/portal_flow.rs
//!
//! Exercises the sign-in role gate, session resume, and the
//! invalidate-and-reload behavior of the mutation handlers against an
//! in-memory implementation of the collaborator ports.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use api_lib::config::Config;
use api_lib::web::admin::delete_course_handler;
use api_lib::web::auth::{login_handler, LoginRequest};
use api_lib::web::middleware::{resolve_current_user, ResumeError};
use api_lib::web::rest::{
    complete_lesson_handler, course_progress_handler, list_trainings_handler,
    CompleteLessonRequest, TrainingsQuery,
};
use api_lib::web::state::{AppState, CurrentUser};
use training_portal_core::domain::{
    AccountCredentials, AuthSession, CompletedLesson, Course, CourseDraft, Profile, Role,
    Training, TrainingDraft,
};
use training_portal_core::ports::{CatalogStore, PortError, PortResult, SessionGateway};

//=========================================================================================
// In-memory backend implementing both ports
//=========================================================================================

#[derive(Default)]
struct Backend {
    profiles: Vec<Profile>,
    credentials: Vec<AccountCredentials>,
    sessions: Vec<AuthSession>,
    courses: Vec<Course>,
    trainings: Vec<Training>,
    completed: Vec<CompletedLesson>,
}

#[derive(Default)]
struct InMemoryBackend {
    inner: Mutex<Backend>,
}

#[async_trait]
impl SessionGateway for InMemoryBackend {
    async fn create_account(&self, email: &str, hashed_password: &str) -> PortResult<Profile> {
        let mut inner = self.inner.lock().unwrap();
        let profile = Profile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: Role::Student,
            created_at: Utc::now(),
        };
        inner.profiles.push(profile.clone());
        inner.credentials.push(AccountCredentials {
            user_id: profile.id,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        });
        Ok(profile)
    }

    async fn credentials_for_email(&self, email: &str) -> PortResult<AccountCredentials> {
        let inner = self.inner.lock().unwrap();
        inner
            .credentials
            .iter()
            .find(|c| c.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("No account for email {}", email)))
    }

    async fn open_session(
        &self,
        token: &str,
        user_id: Uuid,
        chosen_role: Role,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.push(AuthSession {
            token: token.to_string(),
            user_id,
            chosen_role,
            expires_at,
        });
        Ok(())
    }

    async fn current_session(&self, token: &str) -> PortResult<AuthSession> {
        let inner = self.inner.lock().unwrap();
        inner
            .sessions
            .iter()
            .find(|s| s.token == token && s.expires_at > Utc::now())
            .cloned()
            .ok_or(PortError::Unauthorized)
    }

    async fn close_session(&self, token: &str) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.retain(|s| s.token != token);
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryBackend {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let inner = self.inner.lock().unwrap();
        inner
            .profiles
            .iter()
            .find(|p| p.id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", user_id)))
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        Ok(self.inner.lock().unwrap().courses.clone())
    }

    async fn create_course(&self, draft: CourseDraft) -> PortResult<Course> {
        let mut inner = self.inner.lock().unwrap();
        let course = Course {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            created_at: Utc::now(),
        };
        inner.courses.push(course.clone());
        Ok(course)
    }

    async fn update_course(&self, course_id: Uuid, draft: CourseDraft) -> PortResult<Course> {
        let mut inner = self.inner.lock().unwrap();
        let course = inner
            .courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| PortError::NotFound(format!("Course {} not found", course_id)))?;
        course.title = draft.title;
        course.description = draft.description;
        Ok(course.clone())
    }

    async fn delete_course(&self, course_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.courses.iter().any(|c| c.id == course_id) {
            return Err(PortError::NotFound(format!("Course {} not found", course_id)));
        }
        inner.courses.retain(|c| c.id != course_id);
        // Cascade, as the real store does.
        let dropped: Vec<Uuid> = inner
            .trainings
            .iter()
            .filter(|t| t.course_id == course_id)
            .map(|t| t.id)
            .collect();
        inner.trainings.retain(|t| t.course_id != course_id);
        inner.completed.retain(|c| !dropped.contains(&c.training_id));
        Ok(())
    }

    async fn list_trainings(&self) -> PortResult<Vec<Training>> {
        Ok(self.inner.lock().unwrap().trainings.clone())
    }

    async fn create_training(&self, draft: TrainingDraft) -> PortResult<Training> {
        let mut inner = self.inner.lock().unwrap();
        let training = Training {
            id: Uuid::new_v4(),
            title: draft.title,
            video_url: draft.video_url,
            order_number: draft.order_number,
            course_id: draft.course_id,
            created_at: Utc::now(),
        };
        inner.trainings.push(training.clone());
        Ok(training)
    }

    async fn update_training(
        &self,
        training_id: Uuid,
        draft: TrainingDraft,
    ) -> PortResult<Training> {
        let mut inner = self.inner.lock().unwrap();
        let training = inner
            .trainings
            .iter_mut()
            .find(|t| t.id == training_id)
            .ok_or_else(|| PortError::NotFound(format!("Training {} not found", training_id)))?;
        training.title = draft.title;
        training.video_url = draft.video_url;
        training.order_number = draft.order_number;
        training.course_id = draft.course_id;
        Ok(training.clone())
    }

    async fn delete_training(&self, training_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.trainings.iter().any(|t| t.id == training_id) {
            return Err(PortError::NotFound(format!(
                "Training {} not found",
                training_id
            )));
        }
        inner.trainings.retain(|t| t.id != training_id);
        inner.completed.retain(|c| c.training_id != training_id);
        Ok(())
    }

    async fn list_completed_lessons(&self, user_id: Uuid) -> PortResult<Vec<CompletedLesson>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .completed
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_lesson_completed(&self, user_id: Uuid, training_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let already = inner
            .completed
            .iter()
            .any(|c| c.user_id == user_id && c.training_id == training_id);
        if !already {
            inner.completed.push(CompletedLesson {
                id: Uuid::new_v4(),
                user_id,
                training_id,
                completed_at: Utc::now(),
            });
        }
        Ok(())
    }
}

//=========================================================================================
// Test helpers
//=========================================================================================

fn test_state() -> (Arc<InMemoryBackend>, Arc<AppState>) {
    let backend = Arc::new(InMemoryBackend::default());
    let config = Arc::new(Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: String::new(),
        log_level: tracing::Level::INFO,
        cors_origin: "http://localhost:5173".to_string(),
        session_ttl_days: 30,
    });
    let state = Arc::new(AppState {
        gateway: backend.clone(),
        catalog: backend.clone(),
        config,
    });
    (backend, state)
}

fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

fn seed_profile(backend: &InMemoryBackend, email: &str, password: &str, role: Role) -> Profile {
    let mut inner = backend.inner.lock().unwrap();
    let profile = Profile {
        id: Uuid::new_v4(),
        email: email.to_string(),
        role,
        created_at: Utc::now(),
    };
    inner.profiles.push(profile.clone());
    inner.credentials.push(AccountCredentials {
        user_id: profile.id,
        email: email.to_string(),
        hashed_password: hash_password(password),
    });
    profile
}

fn seed_course(backend: &InMemoryBackend, title: &str) -> Course {
    let course = Course {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: None,
        created_at: Utc::now(),
    };
    backend.inner.lock().unwrap().courses.push(course.clone());
    course
}

fn seed_training(backend: &InMemoryBackend, course_id: Uuid, order_number: i32) -> Training {
    let training = Training {
        id: Uuid::new_v4(),
        title: format!("Lesson {order_number}"),
        video_url: "https://video.example/watch".to_string(),
        order_number,
        course_id,
        created_at: Utc::now(),
    };
    backend.inner.lock().unwrap().trainings.push(training.clone());
    training
}

fn current_user(profile: &Profile) -> CurrentUser {
    CurrentUser {
        is_admin: profile.role == Role::Admin,
        profile: profile.clone(),
    }
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

//=========================================================================================
// Sign-in and session resume
//=========================================================================================

#[tokio::test]
async fn login_with_mismatched_role_is_rejected_and_opens_no_session() {
    let (backend, state) = test_state();
    seed_profile(&backend, "student@example.com", "secret", Role::Student);

    let result = login_handler(
        State(state),
        HeaderMap::new(),
        Json(LoginRequest {
            email: "student@example.com".to_string(),
            password: "secret".to_string(),
            role: "admin".to_string(),
        }),
    )
    .await;

    let (status, message) = result.err().unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(message.contains("administrator"));

    // Nothing was signed in: no session row exists anywhere.
    assert!(backend.inner.lock().unwrap().sessions.is_empty());
}

#[tokio::test]
async fn login_with_matching_role_records_the_chosen_role() {
    let (backend, state) = test_state();
    seed_profile(&backend, "student@example.com", "secret", Role::Student);

    let result = login_handler(
        State(state),
        HeaderMap::new(),
        Json(LoginRequest {
            email: "student@example.com".to_string(),
            password: "secret".to_string(),
            role: "student".to_string(),
        }),
    )
    .await;

    let response = result.unwrap().into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["is_admin"], serde_json::json!(false));
    assert_eq!(body["role"], serde_json::json!("student"));

    let inner = backend.inner.lock().unwrap();
    assert_eq!(inner.sessions.len(), 1);
    assert_eq!(inner.sessions[0].chosen_role, Role::Student);
}

#[tokio::test]
async fn bad_password_is_rejected_without_a_session() {
    let (backend, state) = test_state();
    seed_profile(&backend, "student@example.com", "secret", Role::Student);

    let result = login_handler(
        State(state),
        HeaderMap::new(),
        Json(LoginRequest {
            email: "student@example.com".to_string(),
            password: "wrong".to_string(),
            role: "student".to_string(),
        }),
    )
    .await;

    let (status, _) = result.err().unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(backend.inner.lock().unwrap().sessions.is_empty());
}

#[tokio::test]
async fn resumed_session_replays_the_role_check_and_force_closes_on_mismatch() {
    let (backend, _state) = test_state();
    let profile = seed_profile(&backend, "admin@example.com", "secret", Role::Admin);

    backend
        .open_session("tok-1", profile.id, Role::Admin, Utc::now() + chrono::Duration::days(1))
        .await
        .unwrap();

    // While the roles agree the session resumes fine.
    let user = resolve_current_user(backend.as_ref(), backend.as_ref(), "tok-1")
        .await
        .unwrap();
    assert!(user.is_admin);

    // The stored role changes out-of-band; the next resume must fail and the
    // session must be gone.
    backend.inner.lock().unwrap().profiles[0].role = Role::Student;
    let err = resolve_current_user(backend.as_ref(), backend.as_ref(), "tok-1")
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ResumeError::RoleMismatch));
    assert!(backend.inner.lock().unwrap().sessions.is_empty());
}

//=========================================================================================
// Progress and completion
//=========================================================================================

#[tokio::test]
async fn course_progress_follows_the_lessons_and_empty_courses_are_complete() {
    let (backend, state) = test_state();
    let profile = seed_profile(&backend, "student@example.com", "secret", Role::Student);
    let onboarding = seed_course(&backend, "Onboarding");
    let l1 = seed_training(&backend, onboarding.id, 1);
    let l2 = seed_training(&backend, onboarding.id, 2);
    let empty = seed_course(&backend, "Empty");

    backend.mark_lesson_completed(profile.id, l1.id).await.unwrap();

    let response = course_progress_handler(
        State(state.clone()),
        Extension(current_user(&profile)),
        Path(onboarding.id),
    )
    .await
    .unwrap()
    .into_response();
    let body = response_json(response).await;
    assert_eq!(body["completed"], serde_json::json!(false));
    assert_eq!(body["lessons"].as_array().unwrap().len(), 2);
    assert_eq!(body["lessons"][0]["completed"], serde_json::json!(true));
    assert_eq!(body["lessons"][1]["completed"], serde_json::json!(false));

    backend.mark_lesson_completed(profile.id, l2.id).await.unwrap();
    let response = course_progress_handler(
        State(state.clone()),
        Extension(current_user(&profile)),
        Path(onboarding.id),
    )
    .await
    .unwrap()
    .into_response();
    let body = response_json(response).await;
    assert_eq!(body["completed"], serde_json::json!(true));

    // A course with no lessons is vacuously complete.
    let response = course_progress_handler(
        State(state),
        Extension(current_user(&profile)),
        Path(empty.id),
    )
    .await
    .unwrap()
    .into_response();
    let body = response_json(response).await;
    assert_eq!(body["completed"], serde_json::json!(true));
    assert!(body["lessons"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn trainings_list_comes_back_in_display_order() {
    let (backend, state) = test_state();
    let first_course = seed_course(&backend, "Onboarding");
    let second_course = seed_course(&backend, "Advanced");
    // Seeded out of order on purpose.
    let l3 = seed_training(&backend, second_course.id, 3);
    let l1 = seed_training(&backend, first_course.id, 1);
    let l2 = seed_training(&backend, second_course.id, 2);

    // Unfiltered: every course's lessons, ordered by order_number.
    let response = list_trainings_handler(
        State(state.clone()),
        Query(TrainingsQuery { course_id: None }),
    )
    .await
    .unwrap()
    .into_response();
    let body = response_json(response).await;
    let ids: Vec<serde_json::Value> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].clone())
        .collect();
    assert_eq!(
        ids,
        vec![
            serde_json::json!(l1.id),
            serde_json::json!(l2.id),
            serde_json::json!(l3.id),
        ]
    );

    // Narrowed to one course: same ordering, only that course's lessons.
    let response = list_trainings_handler(
        State(state),
        Query(TrainingsQuery {
            course_id: Some(second_course.id),
        }),
    )
    .await
    .unwrap()
    .into_response();
    let body = response_json(response).await;
    let ids: Vec<serde_json::Value> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].clone())
        .collect();
    assert_eq!(ids, vec![serde_json::json!(l2.id), serde_json::json!(l3.id)]);
}

#[tokio::test]
async fn marking_complete_is_idempotent_and_returns_the_reloaded_collection() {
    let (backend, state) = test_state();
    let profile = seed_profile(&backend, "student@example.com", "secret", Role::Student);
    let course = seed_course(&backend, "Onboarding");
    let lesson = seed_training(&backend, course.id, 1);

    for _ in 0..2 {
        let response = complete_lesson_handler(
            State(state.clone()),
            Extension(current_user(&profile)),
            Json(CompleteLessonRequest {
                training_id: lesson.id,
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        // The response body is the re-fetched collection, exactly one record.
        let body = response_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["training_id"], serde_json::json!(lesson.id));
    }

    assert_eq!(backend.inner.lock().unwrap().completed.len(), 1);
}

//=========================================================================================
// Admin CRUD
//=========================================================================================

#[tokio::test]
async fn deleting_a_course_cascades_and_returns_refreshed_collections() {
    let (backend, state) = test_state();
    let doomed = seed_course(&backend, "Doomed");
    let survivor = seed_course(&backend, "Survivor");
    let doomed_lesson = seed_training(&backend, doomed.id, 1);
    let kept_lesson = seed_training(&backend, survivor.id, 1);

    let response = delete_course_handler(State(state), Path(doomed.id))
        .await
        .unwrap()
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let courses = body["courses"].as_array().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["id"], serde_json::json!(survivor.id));

    let trainings = body["trainings"].as_array().unwrap();
    assert_eq!(trainings.len(), 1);
    assert_eq!(trainings[0]["id"], serde_json::json!(kept_lesson.id));
    assert!(trainings
        .iter()
        .all(|t| t["id"] != serde_json::json!(doomed_lesson.id)));
}

#[tokio::test]
async fn deleting_a_missing_course_is_not_found() {
    let (_backend, state) = test_state();
    let result = delete_course_handler(State(state), Path(Uuid::new_v4())).await;
    let (status, _) = result.err().unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}
