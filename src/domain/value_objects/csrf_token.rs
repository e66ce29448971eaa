use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Number of random bytes behind each anti-forgery token
const TOKEN_BYTES: usize = 32;

/// Anti-forgery token value
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CsrfTokenValue(String);

impl CsrfTokenValue {
    /// Generate a new random token (URL-safe base64, no padding)
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap a value loaded from session storage
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Compare against a submitted candidate without early exit
    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), candidate.as_bytes())
    }

    /// Short, log-safe identifier for this token
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..6])
    }
}

// Tokens never appear in debug output.
impl std::fmt::Debug for CsrfTokenValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CsrfTokenValue({})", self.fingerprint())
    }
}

/// Diagnostics stored next to each session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenMetadata {
    /// Unix seconds
    pub created_at: i64,
    /// Unix seconds
    pub last_accessed: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl TokenMetadata {
    pub fn new(now: i64, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            created_at: now,
            last_accessed: now,
            ip_address,
            user_agent,
        }
    }

    /// Age in seconds at `now`
    pub fn age(&self, now: i64) -> i64 {
        now - self.created_at
    }

    /// A token is live while its age is strictly below the lifetime
    pub fn is_live(&self, now: i64, lifetime_secs: i64) -> bool {
        self.age(now) < lifetime_secs
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
