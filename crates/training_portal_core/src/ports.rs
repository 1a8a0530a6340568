//! crates/training_portal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AccountCredentials, AuthSession, CompletedLesson, Course, CourseDraft, Profile, Role,
    Training, TrainingDraft,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The authentication collaborator: account credentials and login sessions.
///
/// Password hashing and verification stay with the caller; this port only
/// stores and retrieves the opaque hash string.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Provisions a new account: credential row plus a student profile.
    async fn create_account(&self, email: &str, hashed_password: &str) -> PortResult<Profile>;

    async fn credentials_for_email(&self, email: &str) -> PortResult<AccountCredentials>;

    /// Opens a login session, recording the role the user claimed at sign-in.
    async fn open_session(
        &self,
        token: &str,
        user_id: Uuid,
        chosen_role: Role,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live (non-expired) session for the given token.
    async fn current_session(&self, token: &str) -> PortResult<AuthSession>;

    /// Signs the session out. Closing an already-closed session is not an error.
    async fn close_session(&self, token: &str) -> PortResult<()>;
}

/// The persistence collaborator for the catalog tables:
/// profiles, courses, trainings and completed_lessons.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // --- Profiles ---
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;

    // --- Courses ---
    async fn list_courses(&self) -> PortResult<Vec<Course>>;
    async fn create_course(&self, draft: CourseDraft) -> PortResult<Course>;
    async fn update_course(&self, course_id: Uuid, draft: CourseDraft) -> PortResult<Course>;
    /// Deletes the course. The store cascades the delete to its trainings.
    async fn delete_course(&self, course_id: Uuid) -> PortResult<()>;

    // --- Trainings ---
    async fn list_trainings(&self) -> PortResult<Vec<Training>>;
    async fn create_training(&self, draft: TrainingDraft) -> PortResult<Training>;
    async fn update_training(&self, training_id: Uuid, draft: TrainingDraft)
        -> PortResult<Training>;
    async fn delete_training(&self, training_id: Uuid) -> PortResult<()>;

    // --- Completed lessons ---
    async fn list_completed_lessons(&self, user_id: Uuid) -> PortResult<Vec<CompletedLesson>>;
    /// Records that the user finished the lesson. Marking an already-completed
    /// lesson again is a no-op at the store, so the operation is idempotent.
    async fn mark_lesson_completed(&self, user_id: Uuid, training_id: Uuid) -> PortResult<()>;
}
