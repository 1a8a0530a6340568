//! crates/training_portal_core/src/gate.rs
//!
//! The role gate: a small state machine that refuses to hand out an
//! authenticated session unless the account's stored role matches the role
//! the user claimed at sign-in. The caller drives the machine around its
//! external calls (credential check, profile fetch) and must force a
//! sign-out at the session gateway whenever the gate reports a mismatch.

use crate::domain::{Profile, Role};

/// Errors produced by the role gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The account's stored role differs from the role chosen at sign-in.
    /// The caller must sign the session out before reporting this to the
    /// user; the gate itself has already dropped back to `Unselected`.
    #[error("the account's role does not match the selected role")]
    RoleMismatch,

    /// A transition was requested from a state that does not allow it.
    #[error("invalid role gate transition: {0}")]
    InvalidTransition(&'static str),
}

/// The observable state of the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// No role picked yet. Also the state after sign-out or a mismatch.
    Unselected,
    /// The user picked a role but has not submitted credentials.
    RoleChosen(Role),
    /// Credentials are with the session gateway; awaiting the profile.
    Authenticating { chosen: Role },
    /// The role check passed. The only state that grants access.
    Authenticated { profile: Profile, is_admin: bool },
    /// A gateway failure ended the attempt; the user must start over.
    Rejected,
}

/// Drives one sign-in attempt (or a resumed session's re-verification).
#[derive(Debug)]
pub struct RoleGate {
    state: GateState,
}

impl Default for RoleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Unselected,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, GateState::Authenticated { .. })
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self.state,
            GateState::Authenticated { is_admin: true, .. }
        )
    }

    pub fn profile(&self) -> Option<&Profile> {
        match &self.state {
            GateState::Authenticated { profile, .. } => Some(profile),
            _ => None,
        }
    }

    /// Picks (or re-picks) the access role. Allowed whenever the user is not
    /// mid-authentication and not already signed in.
    pub fn choose_role(&mut self, role: Role) -> Result<(), GateError> {
        match self.state {
            GateState::Unselected | GateState::RoleChosen(_) | GateState::Rejected => {
                self.state = GateState::RoleChosen(role);
                Ok(())
            }
            _ => Err(GateError::InvalidTransition(
                "a role can only be chosen before authentication starts",
            )),
        }
    }

    /// Marks the credentials as submitted. Returns the chosen role so the
    /// caller can carry it to the session gateway.
    pub fn begin_authentication(&mut self) -> Result<Role, GateError> {
        match self.state {
            GateState::RoleChosen(role) => {
                self.state = GateState::Authenticating { chosen: role };
                Ok(role)
            }
            _ => Err(GateError::InvalidTransition(
                "authentication requires a chosen role",
            )),
        }
    }

    /// Resolves the fetched profile against the chosen role.
    ///
    /// On a match the gate becomes `Authenticated`. On a mismatch the gate
    /// drops straight to `Unselected` (the user must re-pick a role) and the
    /// caller gets `RoleMismatch`; the authenticated flags are never set, not
    /// even momentarily.
    pub fn resolve_profile(&mut self, profile: Profile) -> Result<&Profile, GateError> {
        let chosen = match self.state {
            GateState::Authenticating { chosen } => chosen,
            _ => {
                return Err(GateError::InvalidTransition(
                    "no authentication in progress",
                ))
            }
        };

        if profile.role != chosen {
            self.state = GateState::Unselected;
            return Err(GateError::RoleMismatch);
        }

        let is_admin = profile.role == Role::Admin;
        self.state = GateState::Authenticated { profile, is_admin };
        match &self.state {
            GateState::Authenticated { profile, .. } => Ok(profile),
            _ => unreachable!(),
        }
    }

    /// Records a gateway failure (credential check, profile fetch or
    /// sign-out). The attempt is over; the gate never lands in
    /// `Authenticated` through this path.
    pub fn fail(&mut self) {
        self.state = GateState::Rejected;
    }

    /// Signs out. All derived state clears together, from any state.
    pub fn sign_out(&mut self) {
        self.state = GateState::Unselected;
    }
}

/// The role-match check on its own, shared with the session-resume path: a
/// resumed session is not exempt from verification, so the role stored at
/// sign-in is re-checked against the profile on every resume.
pub fn verify_role(chosen: Role, profile: &Profile) -> Result<(), GateError> {
    if profile.role == chosen {
        Ok(())
    } else {
        Err(GateError::RoleMismatch)
    }
}
