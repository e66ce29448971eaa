use crate::domain::value_objects::Actor;

/// Role names carried in the identity token
pub mod roles {
    pub const ADMIN: &str = "ROLE_ADMIN";
    pub const STAFF: &str = "ROLE_STAFF";
    pub const USER: &str = "ROLE_USER";

    pub const ALL: &[&str] = &[ADMIN, STAFF, USER];

    /// Check if a role is valid
    pub fn is_valid_role(role: &str) -> bool {
        ALL.contains(&role)
    }
}

/// Authorization result
#[derive(Debug, PartialEq, Eq)]
pub enum AuthorizationResult {
    Allowed,
    Forbidden(String),    // Reason for denial
    Unauthorized(String), // Authentication required
}

impl AuthorizationResult {
    pub fn allowed() -> Self {
        Self::Allowed
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Any authenticated identity
pub fn authenticated(identity: Option<&Actor>) -> AuthorizationResult {
    match identity {
        Some(_) => AuthorizationResult::allowed(),
        None => AuthorizationResult::unauthorized("authentication required"),
    }
}

/// Admin screens require ROLE_ADMIN
pub fn admin_only(identity: Option<&Actor>) -> AuthorizationResult {
    match identity {
        Some(actor) if actor.has_role(roles::ADMIN) => AuthorizationResult::allowed(),
        Some(actor) => AuthorizationResult::forbidden(format!(
            "user {} lacks {}",
            actor.id,
            roles::ADMIN
        )),
        None => AuthorizationResult::unauthorized("authentication required"),
    }
}

/// Staff tools; admins inherit staff rights
pub fn staff_only(identity: Option<&Actor>) -> AuthorizationResult {
    match identity {
        Some(actor) if actor.has_role(roles::STAFF) || actor.has_role(roles::ADMIN) => {
            AuthorizationResult::allowed()
        }
        Some(actor) => AuthorizationResult::forbidden(format!(
            "user {} lacks {}",
            actor.id,
            roles::STAFF
        )),
        None => AuthorizationResult::unauthorized("authentication required"),
    }
}
