use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Host suffixes used by tunnelling services that rewrite Host/Origin
const TUNNEL_DOMAINS: &[&str] = &["ngrok.io", "ngrok-free.app", "ngrok.app"];

static TUNNEL_HOST_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+\.ngrok(-free)?\.(io|app)$").ok());

/// Authenticated account performing an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    pub id: i64,
    pub email: String,
    /// "First Last" as shown in the admin screens
    pub display_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: None,
            roles: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Name used as `entityName` for security events; falls back to the email
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Request attributes copied onto audit records and token metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RequestMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Matched route name, when the router exposes one
    pub route: Option<String>,
    pub host: Option<String>,
}

impl RequestMetadata {
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address,
            user_agent,
            route: None,
            host: None,
        }
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Whether the request arrived through a tunnelling service (ngrok)
    pub fn is_tunneled(&self) -> bool {
        self.host.as_deref().is_some_and(is_tunnel_host)
    }
}

/// Check a Host header value against known tunnel domains
pub fn is_tunnel_host(host: &str) -> bool {
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    TUNNEL_DOMAINS.iter().any(|domain| host.contains(domain))
        || TUNNEL_HOST_PATTERN
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(&host))
}

/// Who is acting and from where.
///
/// Passed explicitly into every capture and helper call; both halves are
/// optional because CLI and background paths have neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorContext {
    pub identity: Option<Actor>,
    pub request: Option<RequestMetadata>,
}

impl ActorContext {
    /// Context with no identity and no request (CLI, scheduled jobs)
    pub fn system() -> Self {
        Self::default()
    }

    pub fn new(identity: Option<Actor>, request: Option<RequestMetadata>) -> Self {
        Self { identity, request }
    }

    pub fn for_actor(identity: Actor) -> Self {
        Self {
            identity: Some(identity),
            request: None,
        }
    }

    pub fn with_request(mut self, request: RequestMetadata) -> Self {
        self.request = Some(request);
        self
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.request.as_ref().and_then(|r| r.ip_address.as_deref())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.request.as_ref().and_then(|r| r.user_agent.as_deref())
    }

    pub fn route(&self) -> Option<&str> {
        self.request.as_ref().and_then(|r| r.route.as_deref())
    }
}
