//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `SessionGateway` and `CatalogStore` ports from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use training_portal_core::domain::{
    AccountCredentials, AuthSession, CompletedLesson, Course, CourseDraft, Profile, Role,
    Training, TrainingDraft,
};
use training_portal_core::ports::{CatalogStore, PortError, PortResult, SessionGateway};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SessionGateway` and `CatalogStore` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn parse_role(raw: &str) -> PortResult<Role> {
    raw.parse::<Role>()
        .map_err(|e| PortError::Unexpected(e.to_string()))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProfileRecord {
    id: Uuid,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}
impl ProfileRecord {
    fn to_domain(self) -> PortResult<Profile> {
        Ok(Profile {
            id: self.id,
            email: self.email,
            role: parse_role(&self.role)?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> AccountCredentials {
        AccountCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    token: String,
    user_id: Uuid,
    chosen_role: String,
    expires_at: DateTime<Utc>,
}
impl AuthSessionRecord {
    fn to_domain(self) -> PortResult<AuthSession> {
        Ok(AuthSession {
            user_id: self.user_id,
            chosen_role: parse_role(&self.chosen_role)?,
            expires_at: self.expires_at,
            token: self.token,
        })
    }
}

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}
impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            id: self.id,
            title: self.title,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct TrainingRecord {
    id: Uuid,
    title: String,
    video_url: String,
    order_number: i32,
    course_id: Uuid,
    created_at: DateTime<Utc>,
}
impl TrainingRecord {
    fn to_domain(self) -> Training {
        Training {
            id: self.id,
            title: self.title,
            video_url: self.video_url,
            order_number: self.order_number,
            course_id: self.course_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CompletedLessonRecord {
    id: Uuid,
    user_id: Uuid,
    training_id: Uuid,
    completed_at: DateTime<Utc>,
}
impl CompletedLessonRecord {
    fn to_domain(self) -> CompletedLesson {
        CompletedLesson {
            id: self.id,
            user_id: self.user_id,
            training_id: self.training_id,
            completed_at: self.completed_at,
        }
    }
}

//=========================================================================================
// `SessionGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionGateway for DbAdapter {
    async fn create_account(&self, email: &str, hashed_password: &str) -> PortResult<Profile> {
        // The profile row and the credential row must appear together.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, ProfileRecord>(
            "INSERT INTO profiles (id, email, role) VALUES ($1, $2, 'student') \
             RETURNING id, email, role, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO account_credentials (user_id, email, hashed_password) \
             VALUES ($1, $2, $3)",
        )
        .bind(record.id)
        .bind(email)
        .bind(hashed_password)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn credentials_for_email(&self, email: &str) -> PortResult<AccountCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM account_credentials WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("No account for email {}", email))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn open_session(
        &self,
        token: &str,
        user_id: Uuid,
        chosen_role: Role,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO auth_sessions (token, user_id, chosen_role, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(token)
        .bind(user_id)
        .bind(chosen_role.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn current_session(&self, token: &str) -> PortResult<AuthSession> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT token, user_id, chosen_role, expires_at FROM auth_sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => unexpected(e),
        })?;

        let session = record.to_domain()?;
        if session.expires_at <= Utc::now() {
            // Expired rows are garbage; clear them out on the way past.
            self.close_session(token).await?;
            return Err(PortError::Unauthorized);
        }
        Ok(session)
    }

    async fn close_session(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `CatalogStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogStore for DbAdapter {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT id, email, role, created_at FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Profile {} not found", user_id))
            }
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(
            "SELECT id, title, description, created_at FROM courses ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_course(&self, draft: CourseDraft) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(
            "INSERT INTO courses (id, title, description) VALUES ($1, $2, $3) \
             RETURNING id, title, description, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&draft.title)
        .bind(&draft.description)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_course(&self, course_id: Uuid, draft: CourseDraft) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(
            "UPDATE courses SET title = $1, description = $2 WHERE id = $3 \
             RETURNING id, title, description, created_at",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Course {} not found", course_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn delete_course(&self, course_id: Uuid) -> PortResult<()> {
        // Trainings (and their completion records) go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Course {} not found",
                course_id
            )));
        }
        Ok(())
    }

    async fn list_trainings(&self) -> PortResult<Vec<Training>> {
        let records = sqlx::query_as::<_, TrainingRecord>(
            "SELECT id, title, video_url, order_number, course_id, created_at \
             FROM trainings ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_training(&self, draft: TrainingDraft) -> PortResult<Training> {
        let record = sqlx::query_as::<_, TrainingRecord>(
            "INSERT INTO trainings (id, title, video_url, order_number, course_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, title, video_url, order_number, course_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&draft.title)
        .bind(&draft.video_url)
        .bind(draft.order_number)
        .bind(draft.course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_training(
        &self,
        training_id: Uuid,
        draft: TrainingDraft,
    ) -> PortResult<Training> {
        let record = sqlx::query_as::<_, TrainingRecord>(
            "UPDATE trainings SET title = $1, video_url = $2, order_number = $3, course_id = $4 \
             WHERE id = $5 \
             RETURNING id, title, video_url, order_number, course_id, created_at",
        )
        .bind(&draft.title)
        .bind(&draft.video_url)
        .bind(draft.order_number)
        .bind(draft.course_id)
        .bind(training_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Training {} not found", training_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn delete_training(&self, training_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM trainings WHERE id = $1")
            .bind(training_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Training {} not found",
                training_id
            )));
        }
        Ok(())
    }

    async fn list_completed_lessons(&self, user_id: Uuid) -> PortResult<Vec<CompletedLesson>> {
        let records = sqlx::query_as::<_, CompletedLessonRecord>(
            "SELECT id, user_id, training_id, completed_at FROM completed_lessons \
             WHERE user_id = $1 ORDER BY completed_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn mark_lesson_completed(&self, user_id: Uuid, training_id: Uuid) -> PortResult<()> {
        // The unique constraint on (user_id, training_id) makes re-marking a no-op.
        sqlx::query(
            "INSERT INTO completed_lessons (id, user_id, training_id) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, training_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(training_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
