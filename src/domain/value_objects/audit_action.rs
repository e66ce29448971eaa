use serde::{Deserialize, Serialize};

/// Action recorded on an audit record.
///
/// The stored column is an open string: producers in this crate only emit the
/// named variants, but rows written by other tools round-trip through
/// [`AuditAction::Other`] unchanged. API schemas describe it as a string
/// through field-level `#[schema(value_type = String)]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    LoginFailed,
    PageAccess,
    Test,
    Other(String),
}

impl AuditAction {
    /// Actions offered as filters on the admin activity screen
    pub const FILTERABLE: &'static [AuditAction] = &[
        AuditAction::Login,
        AuditAction::Logout,
        AuditAction::LoginFailed,
        AuditAction::Create,
        AuditAction::Update,
        AuditAction::Delete,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::PageAccess => "PAGE_ACCESS",
            AuditAction::Test => "TEST",
            AuditAction::Other(value) => value,
        }
    }

    /// Security actions are the ones produced by the authentication layer
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            AuditAction::Login | AuditAction::Logout | AuditAction::LoginFailed
        )
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<&str> for AuditAction {
    fn from(value: &str) -> Self {
        match value {
            "CREATE" => AuditAction::Create,
            "UPDATE" => AuditAction::Update,
            "DELETE" => AuditAction::Delete,
            "LOGIN" => AuditAction::Login,
            "LOGOUT" => AuditAction::Logout,
            "LOGIN_FAILED" => AuditAction::LoginFailed,
            "PAGE_ACCESS" => AuditAction::PageAccess,
            "TEST" => AuditAction::Test,
            other => AuditAction::Other(other.to_string()),
        }
    }
}

impl From<String> for AuditAction {
    fn from(value: String) -> Self {
        match AuditAction::from(value.as_str()) {
            AuditAction::Other(_) => AuditAction::Other(value),
            known => known,
        }
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        action.as_str().to_string()
    }
}

impl std::str::FromStr for AuditAction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AuditAction::from(s))
    }
}
