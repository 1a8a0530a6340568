//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: signup, role-gated login, logout, and the
//! session-resume probe.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use training_portal_core::domain::{Profile, Role};
use training_portal_core::gate::{GateError, RoleGate};
use training_portal_core::ports::PortError;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::session_token;
use crate::web::state::{AppState, CurrentUser};

/// The rejection shown when the chosen role does not match the account.
const ROLE_MISMATCH_MESSAGE: &str =
    "Invalid credentials. Check with the application administrator.";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// The access role the user picked on the role-selection screen.
    pub role: String,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub is_admin: bool,
}

impl SessionResponse {
    fn from_profile(profile: &Profile, is_admin: bool) -> Self {
        Self {
            user_id: profile.id,
            email: profile.email.clone(),
            role: profile.role.to_string(),
            is_admin,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new account with a student profile
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created successfully", body = SessionResponse),
        (status = 422, description = "Missing email or password"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Email and password are required".to_string(),
        ));
    }

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to hash password".to_string(),
            )
        })?
        .to_string();

    // 2. Provision the account (credentials + student profile)
    let profile = state
        .gateway
        .create_account(&req.email, &password_hash)
        .await
        .map_err(|e| {
            error!("Failed to create account: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create account".to_string(),
            )
        })?;

    // No session is opened at signup; the user signs in through the role gate.
    let response = SessionResponse::from_profile(&profile, false);
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login - Sign in as the chosen role
///
/// Drives the role gate: the account's stored role must match the role the
/// user claimed on the role-selection screen, otherwise the attempt is
/// rejected and nothing is signed in.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 401, description = "Invalid credentials or role mismatch"),
        (status = 422, description = "Unknown role"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Parse the chosen role and walk the gate up to the credential check
    let role = req
        .role
        .parse::<Role>()
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let mut gate = RoleGate::new();
    gate.choose_role(role).map_err(internal_gate_error)?;
    let chosen = gate.begin_authentication().map_err(internal_gate_error)?;

    // 2. Verify the credentials
    let creds = match state.gateway.credentials_for_email(&req.email).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => {
            gate.sign_out();
            return Err(invalid_credentials());
        }
        Err(e) => {
            error!("Failed to fetch credentials: {:?}", e);
            gate.fail();
            return Err(generic_failure());
        }
    };

    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication error".to_string(),
        )
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        gate.sign_out();
        return Err(invalid_credentials());
    }

    // 3. Fetch the profile and resolve the role check
    let profile = match state.catalog.get_profile(creds.user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            error!("Failed to fetch profile during login: {:?}", e);
            gate.fail();
            return Err(generic_failure());
        }
    };

    let profile = match gate.resolve_profile(profile) {
        Ok(profile) => profile.clone(),
        Err(GateError::RoleMismatch) => {
            // Force sign-out of any session the browser still carries before
            // reporting the rejection.
            if let Some(token) = session_token(&headers) {
                if let Err(e) = state.gateway.close_session(token).await {
                    error!("Failed to close session after role mismatch: {:?}", e);
                }
            }
            return Err((StatusCode::UNAUTHORIZED, ROLE_MISMATCH_MESSAGE.to_string()));
        }
        Err(e) => return Err(internal_gate_error(e)),
    };
    let is_admin = gate.is_admin();

    // 4. Open the session, recording the chosen role for resume checks
    let token = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);
    let expires_at = Utc::now() + ttl;

    if let Err(e) = state
        .gateway
        .open_session(&token, profile.id, chosen, expires_at)
        .await
    {
        error!("Failed to open session: {:?}", e);
        gate.sign_out();
        return Err(generic_failure());
    }

    // 5. Return the session cookie and the authenticated identity
    let cookie = format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        token,
        ttl.num_seconds()
    );

    let response = SessionResponse::from_profile(&profile, is_admin);
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Sign out and invalidate the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let token = session_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state.gateway.close_session(token).await.map_err(|e| {
        error!("Failed to close session: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to sign out".to_string(),
        )
    })?;

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/session - Resume an existing session
///
/// The role check has already been replayed by the auth middleware by the
/// time this handler runs; a mismatched session never reaches it.
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "A live session exists", body = SessionResponse),
        (status = 401, description = "No live session")
    )
)]
pub async fn session_handler(
    Extension(current_user): Extension<CurrentUser>,
) -> Json<SessionResponse> {
    Json(SessionResponse::from_profile(
        &current_user.profile,
        current_user.is_admin,
    ))
}

//=========================================================================================
// Error helpers
//=========================================================================================

fn invalid_credentials() -> (StatusCode, String) {
    (
        StatusCode::UNAUTHORIZED,
        "Invalid email or password".to_string(),
    )
}

fn generic_failure() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Sign-in failed, try again later".to_string(),
    )
}

fn internal_gate_error(e: GateError) -> (StatusCode, String) {
    error!("Role gate rejected a transition: {:?}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Authentication error".to_string(),
    )
}
