//! services/api/src/web/middleware.rs
//!
//! Authentication middleware protecting the catalog and admin routes.
//!
//! A resumed session is not exempt from role verification: every request
//! replays the role-match check between the role stored at sign-in and the
//! profile's current role, and a mismatch force-closes the session.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{error, warn};

use crate::web::state::{AppState, CurrentUser};
use training_portal_core::gate::verify_role;
use training_portal_core::ports::{CatalogStore, PortError, SessionGateway};

/// Pulls the session token out of the request's cookie header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header.split(';').find_map(|c| {
        let c = c.trim();
        c.strip_prefix("session=")
    })
}

/// Why a session could not be resumed.
#[derive(Debug)]
pub enum ResumeError {
    /// No live session for the token (missing, expired, or signed out).
    InvalidSession,
    /// The profile's role no longer matches the role claimed at sign-in.
    /// The session has already been force-closed by the time this returns.
    RoleMismatch,
    /// A collaborator failed; nothing was authenticated.
    Failure(String),
}

/// Resolves a session token into the request's user identity.
///
/// Replays the role gate's check against the stored profile before granting
/// anything, exactly as at sign-in.
pub async fn resolve_current_user(
    gateway: &dyn SessionGateway,
    catalog: &dyn CatalogStore,
    token: &str,
) -> Result<CurrentUser, ResumeError> {
    let session = gateway.current_session(token).await.map_err(|e| match e {
        PortError::Unauthorized | PortError::NotFound(_) => ResumeError::InvalidSession,
        PortError::Unexpected(msg) => ResumeError::Failure(msg),
    })?;

    let profile = catalog
        .get_profile(session.user_id)
        .await
        .map_err(|e| ResumeError::Failure(e.to_string()))?;

    if verify_role(session.chosen_role, &profile).is_err() {
        // Force sign-out before reporting; no authenticated state leaks past
        // a failed role check.
        if let Err(e) = gateway.close_session(token).await {
            error!("Failed to close session after role mismatch: {:?}", e);
        }
        return Err(ResumeError::RoleMismatch);
    }

    let is_admin = profile.role == training_portal_core::domain::Role::Admin;
    Ok(CurrentUser { profile, is_admin })
}

/// Middleware that validates the session cookie and replays the role check.
///
/// If valid, inserts a `CurrentUser` into request extensions for handlers to use.
/// If invalid, mismatched, or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = session_token(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let current_user =
        match resolve_current_user(state.gateway.as_ref(), state.catalog.as_ref(), token).await {
            Ok(user) => user,
            Err(ResumeError::InvalidSession) => return Err(StatusCode::UNAUTHORIZED),
            Err(ResumeError::RoleMismatch) => {
                warn!("Session closed: stored role no longer matches the profile");
                return Err(StatusCode::UNAUTHORIZED);
            }
            Err(ResumeError::Failure(msg)) => {
                error!("Failed to resume session: {}", msg);
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Middleware for the admin console routes. Runs after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, StatusCode> {
    let current_user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !current_user.is_admin {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(next.run(req).await)
}
