use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::application::ports::{SessionError, SessionStore};
use crate::domain::value_objects::{CsrfTokenValue, RequestMetadata, TokenMetadata};

/// Session key prefix for token values
pub const TOKEN_PREFIX: &str = "csrf_";

/// Session key prefix for token metadata
pub const METADATA_PREFIX: &str = "csrf_metadata_";

/// Ids that would collide with another token's metadata key
pub fn is_reserved_token_id(token_id: &str) -> bool {
    token_key(token_id).starts_with(METADATA_PREFIX)
}

/// Default token lifetime in seconds
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Where a ledger call reads and writes.
///
/// Both halves are optional: CLI and background paths have no session and
/// no request.
#[derive(Clone, Default)]
pub struct TokenScope {
    pub session: Option<Arc<dyn SessionStore>>,
    pub request: Option<RequestMetadata>,
}

impl TokenScope {
    pub fn new(session: Option<Arc<dyn SessionStore>>, request: Option<RequestMetadata>) -> Self {
        Self { session, request }
    }

    /// No session, no request
    pub fn detached() -> Self {
        Self::default()
    }
}

/// Token reported by [`CsrfTokenLedger::get_active_tokens`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveToken {
    pub token: CsrfTokenValue,
    pub metadata: Option<TokenMetadata>,
}

/// Session-scoped anti-forgery tokens with lazy expiry.
///
/// Token ids are namespaced per purpose (`clean_activity_logs`, `submit`).
/// Any storage failure while validating means "invalid"; any failure while
/// writing is logged and otherwise ignored.
pub struct CsrfTokenLedger {
    lifetime_secs: i64,
}

impl Default for CsrfTokenLedger {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LIFETIME_SECS)
    }
}

impl CsrfTokenLedger {
    pub fn new(lifetime_secs: i64) -> Self {
        Self { lifetime_secs }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Issue a fresh token; it is stored only when a session exists and the
    /// id is not reserved
    pub fn generate_token(&self, scope: &TokenScope, token_id: &str) -> CsrfTokenValue {
        let token = CsrfTokenValue::generate();
        if is_reserved_token_id(token_id) {
            warn!("Refusing to store anti-forgery token under reserved id {}", token_id);
            return token;
        }
        if let Some(session) = &scope.session {
            let metadata = TokenMetadata::new(
                now(),
                scope.request.as_ref().and_then(|r| r.ip_address.clone()),
                scope.request.as_ref().and_then(|r| r.user_agent.clone()),
            );
            if let Err(e) = store_token(session.as_ref(), token_id, &token, &metadata) {
                warn!("Failed to store anti-forgery token {}: {}", token_id, e);
            } else {
                debug!(
                    token_id,
                    fingerprint = %token.fingerprint(),
                    "Anti-forgery token issued"
                );
            }
        }
        token
    }

    /// Whether `candidate` is the live token stored under `token_id`
    pub fn check_token_validity(
        &self,
        scope: &TokenScope,
        token_id: &str,
        candidate: Option<&str>,
    ) -> bool {
        let Some(candidate) = candidate.filter(|c| !c.is_empty()) else {
            return false;
        };
        if is_reserved_token_id(token_id) {
            return false;
        }
        let Some(session) = &scope.session else {
            return false;
        };
        match self.live_token(session.as_ref(), token_id) {
            Ok(Some((stored, _))) => stored.matches(candidate),
            Ok(None) => false,
            Err(e) => {
                warn!("Treating token {} as invalid: {}", token_id, e);
                false
            }
        }
    }

    /// Stored token while it is live, otherwise a newly issued one
    pub fn refresh_token_if_needed(&self, scope: &TokenScope, token_id: &str) -> CsrfTokenValue {
        let session = scope
            .session
            .as_ref()
            .filter(|_| !is_reserved_token_id(token_id));
        if let Some(session) = session {
            match self.live_token(session.as_ref(), token_id) {
                Ok(Some((stored, mut metadata))) => {
                    metadata.last_accessed = now();
                    if let Err(e) = write_metadata(session.as_ref(), token_id, &metadata) {
                        debug!("Could not touch token {}: {}", token_id, e);
                    }
                    return stored;
                }
                Ok(None) => {}
                Err(e) => warn!("Regenerating token {} after read failure: {}", token_id, e),
            }
        }
        self.generate_token(scope, token_id)
    }

    /// Remove a token and its metadata (form resubmission prevention)
    pub fn remove_token(&self, scope: &TokenScope, token_id: &str) {
        let Some(session) = &scope.session else {
            return;
        };
        if is_reserved_token_id(token_id) {
            return;
        }
        let removed = session
            .remove(&token_key(token_id))
            .and_then(|_| session.remove(&metadata_key(token_id)));
        if let Err(e) = removed {
            debug!("Ignoring failure removing token {}: {}", token_id, e);
        }
    }

    /// Tokens present in the session, keyed by token id
    pub fn get_active_tokens(&self, scope: &TokenScope) -> BTreeMap<String, ActiveToken> {
        let Some(session) = &scope.session else {
            return BTreeMap::new();
        };
        let ids = match token_ids(session.as_ref()) {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Cannot list anti-forgery tokens: {}", e);
                return BTreeMap::new();
            }
        };

        ids.into_iter()
            .filter_map(|id| {
                let token = read_token(session.as_ref(), &id).ok().flatten()?;
                let metadata = read_metadata(session.as_ref(), &id).ok().flatten();
                Some((id, ActiveToken { token, metadata }))
            })
            .collect()
    }

    /// Remove every expired token (or token without metadata); returns how many
    pub fn cleanup_expired_tokens(&self, scope: &TokenScope) -> usize {
        let Some(session) = &scope.session else {
            return 0;
        };
        let ids = match token_ids(session.as_ref()) {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Token cleanup skipped: {}", e);
                return 0;
            }
        };

        let now = now();
        let mut cleaned = 0;
        for id in ids {
            let live = matches!(
                read_metadata(session.as_ref(), &id),
                Ok(Some(metadata)) if metadata.is_live(now, self.lifetime_secs)
            );
            if !live {
                self.remove_token(scope, &id);
                cleaned += 1;
            }
        }
        if cleaned > 0 {
            debug!("Removed {} expired anti-forgery tokens", cleaned);
        }
        cleaned
    }

    fn live_token(
        &self,
        session: &dyn SessionStore,
        token_id: &str,
    ) -> Result<Option<(CsrfTokenValue, TokenMetadata)>, SessionError> {
        let Some(stored) = read_token(session, token_id)? else {
            return Ok(None);
        };
        match read_metadata(session, token_id)? {
            Some(metadata) if metadata.is_live(now(), self.lifetime_secs) => {
                Ok(Some((stored, metadata)))
            }
            _ => Ok(None),
        }
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

fn token_key(token_id: &str) -> String {
    format!("{}{}", TOKEN_PREFIX, token_id)
}

fn metadata_key(token_id: &str) -> String {
    format!("{}{}", METADATA_PREFIX, token_id)
}

/// Token ids present in the session; metadata entries are not tokens
fn token_ids(session: &dyn SessionStore) -> Result<Vec<String>, SessionError> {
    Ok(session
        .keys()?
        .into_iter()
        .filter(|key| !key.starts_with(METADATA_PREFIX))
        .filter_map(|key| key.strip_prefix(TOKEN_PREFIX).map(str::to_string))
        .collect())
}

fn store_token(
    session: &dyn SessionStore,
    token_id: &str,
    token: &CsrfTokenValue,
    metadata: &TokenMetadata,
) -> Result<(), SessionError> {
    session.insert(&token_key(token_id), Value::String(token.as_str().to_string()))?;
    write_metadata(session, token_id, metadata)
}

fn write_metadata(
    session: &dyn SessionStore,
    token_id: &str,
    metadata: &TokenMetadata,
) -> Result<(), SessionError> {
    let value =
        serde_json::to_value(metadata).map_err(|e| SessionError::Serialization(e.to_string()))?;
    session.insert(&metadata_key(token_id), value)
}

fn read_token(
    session: &dyn SessionStore,
    token_id: &str,
) -> Result<Option<CsrfTokenValue>, SessionError> {
    match session.get(&token_key(token_id))? {
        Some(Value::String(token)) if !token.is_empty() => {
            Ok(Some(CsrfTokenValue::from_string(token)))
        }
        Some(Value::String(_)) | None => Ok(None),
        Some(other) => Err(SessionError::Serialization(format!(
            "token {} is not a string: {}",
            token_id, other
        ))),
    }
}

/// Malformed metadata reads as missing
fn read_metadata(
    session: &dyn SessionStore,
    token_id: &str,
) -> Result<Option<TokenMetadata>, SessionError> {
    Ok(session
        .get(&metadata_key(token_id))?
        .and_then(|value| serde_json::from_value(value).ok()))
}
