//! Server-side login sessions.
//!
//! The client holds a random bearer value in the session cookie; the
//! store only ever sees its SHA-256, so a dump of the map cannot be
//! replayed. Sessions carry a fixed expiry set at login. There is no
//! sliding renewal.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::MAX_SESSION_TTL;

/// Purge expired entries once the map grows past this size.
const CLEANUP_THRESHOLD: usize = 1000;

/// Hash a session token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random session token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

struct SessionEntry {
    user_id: i64,
    expires_at: Instant,
}

/// Token-hash → session map with a fixed TTL.
pub struct SessionStore {
    entries: HashMap<[u8; 32], SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    /// TTLs above [`MAX_SESSION_TTL`] are clamped.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: ttl.min(MAX_SESSION_TTL),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Open a session and return the raw token for the cookie.
    pub fn create(&mut self, user_id: i64) -> String {
        if self.entries.len() > CLEANUP_THRESHOLD {
            self.cleanup();
        }

        let token = generate_token();
        self.entries.insert(
            hash_token(&token),
            SessionEntry {
                user_id,
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// Resolve a token to its user id. Expired sessions are dropped on sight.
    pub fn resolve(&mut self, token: &str) -> Option<i64> {
        let key = hash_token(token);
        let (user_id, expires_at) = self
            .entries
            .get(&key)
            .map(|e| (e.user_id, e.expires_at))?;
        if Instant::now() >= expires_at {
            self.entries.remove(&key);
            return None;
        }
        Some(user_id)
    }

    /// Returns `true` if a session was removed.
    pub fn destroy(&mut self, token: &str) -> bool {
        self.entries.remove(&hash_token(token)).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn cleanup(&mut self) {
        let now = Instant::now();
        self.entries.retain(|_, e| now < e.expires_at);
    }
}
