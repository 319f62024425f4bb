//! Shared application state.
//!
//! `CoreState` is built once at startup, wrapped in `Arc`, and handed to
//! every handler and middleware. Locks are `std::sync` and are never held
//! across an `.await`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::config::PortalConfig;
use crate::crypto;
use crate::db::{self, MemoryStore, Storage};
use crate::session::SessionStore;

/// Audit entries kept in memory; older ones are dropped first.
const AUDIT_BUFFER_CAPACITY: usize = 1000;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    storage: Arc<dyn Storage>,
    sessions: RwLock<SessionStore>,
    pub config: PortalConfig,
    audit: AuditLogger,
    /// Stand-in hash verified when a login names an unknown user.
    login_decoy: String,
}

impl CoreState {
    /// Empty in-memory store.
    pub fn new(config: PortalConfig) -> Self {
        Self::with_storage(Arc::new(MemoryStore::new()), config)
    }

    pub fn with_storage(storage: Arc<dyn Storage>, config: PortalConfig) -> Self {
        Self {
            storage,
            sessions: RwLock::new(SessionStore::new(config.session_ttl)),
            login_decoy: crypto::decoy_hash(config.password_iterations),
            config,
            audit: AuditLogger::new(),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    // ── Sessions ────────────────────────────────────────────

    pub fn read_sessions(&self) -> Result<RwLockReadGuard<'_, SessionStore>, CoreError> {
        self.sessions.read().map_err(|_| CoreError::LockPoisoned)
    }

    /// Resolution may evict an expired entry, so it needs the write side.
    pub fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionStore>, CoreError> {
        self.sessions.write().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn login_decoy(&self) -> &str {
        &self.login_decoy
    }

    // ── Audit ───────────────────────────────────────────────

    pub fn log_access(&self, user_id: Option<i64>, action: &str, status: u16) {
        self.audit.log(user_id, action, status);
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }
}

impl Default for CoreState {
    fn default() -> Self {
        Self::new(PortalConfig::default())
    }
}

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// Audit logger
// ═══════════════════════════════════════════════════════════

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// `None` for requests without a valid session.
    pub user_id: Option<i64>,
    pub action: String,
    pub status: u16,
}

/// Bounded in-memory audit trail. Each entry is also emitted as a
/// `tracing` event under the `audit` target.
pub struct AuditLogger {
    buffer: Mutex<VecDeque<AuditEntry>>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(AUDIT_BUFFER_CAPACITY)),
        }
    }

    pub fn log(&self, user_id: Option<i64>, action: &str, status: u16) {
        tracing::info!(target: "audit", user_id, action, status, "API access");

        if let Ok(mut buf) = self.buffer.lock() {
            if buf.len() == AUDIT_BUFFER_CAPACITY {
                buf.pop_front();
            }
            buf.push_back(AuditEntry {
                timestamp: Utc::now(),
                user_id,
                action: action.to_string(),
                status,
            });
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }

}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
