//! Shared types for the portal API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{FromRequest, FromRequestParts};

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::db::{PatientRepository, Storage};
use crate::models::{Patient, User, UserRole};

/// Sweep idle keys once the limiter tracks this many.
const PRUNE_THRESHOLD: usize = 1024;

/// Length of the longest window.
const WINDOW: Duration = Duration::from_secs(3600);

/// Login attempts allowed per client key.
const LOGIN_PER_MINUTE: u32 = 10;
const LOGIN_PER_HOUR: u32 = 50;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the portal router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus API-specific limiters.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub login_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new())),
            login_limiter: Arc::new(Mutex::new(RateLimiter::with_limits(
                LOGIN_PER_MINUTE,
                LOGIN_PER_HOUR,
            ))),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.core.storage()
    }
}

// ═══════════════════════════════════════════════════════════
// Authenticated user: injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// The signed-in user, inserted into request extensions by the gate
/// middleware after the session cookie resolved.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn is_doctor(&self) -> bool {
        self.user.role == UserRole::Doctor
    }

    /// The patient profile of a patient user.
    pub fn own_patient(&self, storage: &dyn Storage) -> Result<Patient, ApiError> {
        storage
            .get_patient_by_user_id(self.user.id)?
            .ok_or_else(|| ApiError::NotFound("No patient profile for this user".into()))
    }

    /// Doctors may act on any patient; patients only on themselves.
    pub fn ensure_patient_access(
        &self,
        storage: &dyn Storage,
        patient_id: i64,
    ) -> Result<(), ApiError> {
        if self.is_doctor() {
            return Ok(());
        }
        match storage.get_patient_by_user_id(self.user.id)? {
            Some(patient) if patient.id == patient_id => Ok(()),
            _ => Err(ApiError::Forbidden(
                "You can only access your own records".into(),
            )),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Extractors with JSON error bodies
// ═══════════════════════════════════════════════════════════

/// `Json<T>` whose rejection is a `400 BAD_REQUEST` error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path<T>` whose rejection is a `400 BAD_REQUEST` error body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `Query<T>` whose rejection is a `400 BAD_REQUEST` error body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

// ═══════════════════════════════════════════════════════════
// Rate limiter: per-client sliding window
// ═══════════════════════════════════════════════════════════

/// Per-client rate limiter with per-minute and per-hour limits.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(100, 1000)
    }

    pub fn with_limits(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
        }
    }

    /// Check if a client is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        if self.windows.len() >= PRUNE_THRESHOLD {
            self.prune(now);
        }
        let entries = self.windows.entry(key.to_string()).or_default();

        // Clean entries older than 1 hour
        entries.retain(|ts| now.duration_since(*ts) < WINDOW);

        let last_minute = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < Duration::from_secs(60))
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }

    /// Drop keys with no request inside the window.
    fn prune(&mut self, now: Instant) {
        self.windows.retain(|_, entries| {
            entries.retain(|ts| now.duration_since(*ts) < WINDOW);
            !entries.is_empty()
        });
    }

    /// Forget a key, e.g. after a successful login.
    pub fn reset(&mut self, key: &str) {
        self.windows.remove(key);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
