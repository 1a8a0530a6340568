//! crates/training_portal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The access role stored on a profile and claimed at sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    /// The wire/storage spelling of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role '{0}', expected 'admin' or 'student'")]
pub struct UnknownRole(pub String);

/// An account record. Provisioned once at signup; only the role ever changes,
/// and only through an out-of-band administrative action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A named collection of ordered lessons.
#[derive(Debug, Clone)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single video lesson belonging to one course.
///
/// `order_number` drives display order within the course. It is not required
/// to be unique; ties are broken by insertion order.
#[derive(Debug, Clone)]
pub struct Training {
    pub id: Uuid,
    pub title: String,
    pub video_url: String,
    pub order_number: i32,
    pub course_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A fact record: the user finished the lesson. Existence of a
/// (user_id, training_id) pair is all that "completed" means.
#[derive(Debug, Clone)]
pub struct CompletedLesson {
    pub id: Uuid,
    pub user_id: Uuid,
    pub training_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

/// The fields an admin supplies when creating or editing a course.
#[derive(Debug, Clone)]
pub struct CourseDraft {
    pub title: String,
    pub description: Option<String>,
}

/// The fields an admin supplies when creating or editing a training.
#[derive(Debug, Clone)]
pub struct TrainingDraft {
    pub title: String,
    pub video_url: String,
    pub order_number: i32,
    pub course_id: Uuid,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Represents a browser login session (auth cookie). The role the user
/// claimed at sign-in is stored alongside so it can be re-verified on every
/// resume.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: Uuid,
    pub chosen_role: Role,
    pub expires_at: DateTime<Utc>,
}
