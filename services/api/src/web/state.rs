//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request user identity.

use crate::config::Config;
use std::sync::Arc;
use training_portal_core::domain::Profile;
use training_portal_core::ports::{CatalogStore, SessionGateway};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn SessionGateway>,
    pub catalog: Arc<dyn CatalogStore>,
    pub config: Arc<Config>,
}

//=========================================================================================
// CurrentUser (Specific to One Authenticated Request)
//=========================================================================================

/// The identity attached to a request once the session cookie has been
/// validated and the role check replayed. Built fresh on every request, so
/// there is no partially-reset session state to worry about: signing out
/// deletes the session row and everything derived from it disappears with it.
#[derive(Clone)]
pub struct CurrentUser {
    pub profile: Profile,
    pub is_admin: bool,
}
