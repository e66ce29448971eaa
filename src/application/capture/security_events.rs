use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use super::{persist, CaptureOutcome};
use crate::application::ports::AuditRecordRepository;
use crate::domain::entities::AuditRecord;
use crate::domain::value_objects::{Actor, ActorContext, AuditAction};

const USER_ENTITY: &str = "User";

/// How logout is detected besides the dedicated logout notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutDetection {
    /// Route name treated as logout by the request-level fallback
    pub logout_route: String,
    /// Whether a request to `logout_route` records a logout on its own
    pub route_fallback: bool,
}

impl Default for LogoutDetection {
    fn default() -> Self {
        Self {
            logout_route: "app_logout".to_string(),
            route_fallback: false,
        }
    }
}

#[derive(Debug, Default)]
struct SessionAuditState {
    /// Identity seen on the most recent authenticated request
    previous_identity: Option<Actor>,
    /// Set once a LOGOUT record exists for the current logout
    logout_recorded: bool,
}

/// Records LOGIN, LOGIN_FAILED and LOGOUT events.
///
/// The dedicated [`on_logout`](Self::on_logout) notification is the
/// canonical logout signal. The route fallback in
/// [`on_request`](Self::on_request) is optional; both paths share a
/// per-session marker so one logout yields at most one LOGOUT record.
pub struct SecurityEventCapture {
    repository: Arc<dyn AuditRecordRepository>,
    detection: LogoutDetection,
    sessions: DashMap<String, SessionAuditState>,
}

impl SecurityEventCapture {
    pub fn new(repository: Arc<dyn AuditRecordRepository>, detection: LogoutDetection) -> Self {
        Self {
            repository,
            detection,
            sessions: DashMap::new(),
        }
    }

    pub async fn on_login_success(&self, identity: &Actor, ctx: &ActorContext) -> CaptureOutcome {
        let record = AuditRecord::builder(AuditAction::Login, USER_ENTITY)
            .entity_id(Some(identity.id))
            .entity_name(Some(identity.label().to_string()))
            .user(Some(identity))
            .description(format!("User successfully logged in: {}", identity.email))
            .request_of(ctx)
            .build();
        persist(self.repository.as_ref(), record).await
    }

    /// Authentication failed; there is no principal, only what was typed
    pub async fn on_login_failure(
        &self,
        attempted_identifier: &str,
        ctx: &ActorContext,
    ) -> CaptureOutcome {
        let record = AuditRecord::builder(AuditAction::LoginFailed, USER_ENTITY)
            .entity_name(Some(attempted_identifier.to_string()))
            .description(format!("Failed login attempt for: {}", attempted_identifier))
            .request_of(ctx)
            .build();
        persist(self.repository.as_ref(), record).await
    }

    /// Dedicated logout notification.
    ///
    /// `identity` is the principal being logged out when the notifier still
    /// has it; otherwise the context identity or the identity remembered from
    /// the session's last request is used.
    pub async fn on_logout(
        &self,
        session_id: &str,
        identity: Option<&Actor>,
        ctx: &ActorContext,
    ) -> CaptureOutcome {
        let identity = identity
            .cloned()
            .or_else(|| ctx.identity.clone())
            .or_else(|| {
                self.sessions
                    .get(session_id)
                    .and_then(|state| state.previous_identity.clone())
            });
        match identity {
            Some(identity) => self.record_logout(session_id, &identity, ctx).await,
            None => {
                debug!("Logout without a known identity; nothing to record");
                CaptureOutcome::Skipped
            }
        }
    }

    /// Called at the start of every request on a session.
    ///
    /// Remembers the active identity so it is still known after logout has
    /// cleared it, and re-arms the logout marker on any non-logout request.
    pub async fn on_request(
        &self,
        session_id: &str,
        route: Option<&str>,
        ctx: &ActorContext,
    ) -> CaptureOutcome {
        let is_logout = route == Some(self.detection.logout_route.as_str());

        let previous = match &ctx.identity {
            Some(identity) => {
                let mut state = self.sessions.entry(session_id.to_string()).or_default();
                state.previous_identity = Some(identity.clone());
                if !is_logout {
                    state.logout_recorded = false;
                }
                state.previous_identity.clone()
            }
            None => match self.sessions.get_mut(session_id) {
                Some(mut state) => {
                    if !is_logout {
                        state.logout_recorded = false;
                    }
                    state.previous_identity.clone()
                }
                None => None,
            },
        };

        if !is_logout || !self.detection.route_fallback {
            return CaptureOutcome::Skipped;
        }
        match previous {
            Some(identity) => self.record_logout(session_id, &identity, ctx).await,
            None => CaptureOutcome::Skipped,
        }
    }

    /// Drop per-session state once the session itself is gone
    pub fn forget_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn tracked_sessions(&self) -> usize {
        self.sessions.len()
    }

    async fn record_logout(
        &self,
        session_id: &str,
        identity: &Actor,
        ctx: &ActorContext,
    ) -> CaptureOutcome {
        {
            let mut state = self.sessions.entry(session_id.to_string()).or_default();
            if state.logout_recorded {
                debug!("Logout already recorded for this session; skipping");
                return CaptureOutcome::Skipped;
            }
            state.logout_recorded = true;
            state.previous_identity = None;
        }

        let record = AuditRecord::builder(AuditAction::Logout, USER_ENTITY)
            .entity_id(Some(identity.id))
            .entity_name(Some(identity.label().to_string()))
            .user(Some(identity))
            .description(format!("User logged out: {}", identity.email))
            .request_of(ctx)
            .build();

        let outcome = persist(self.repository.as_ref(), record).await;
        match &outcome {
            CaptureOutcome::Failed(_) => {
                // Let the other signal retry.
                if let Some(mut state) = self.sessions.get_mut(session_id) {
                    state.logout_recorded = false;
                }
            }
            CaptureOutcome::Recorded(_) => info!("User {} logged out", identity.id),
            CaptureOutcome::Skipped => {}
        }
        outcome
    }
}
