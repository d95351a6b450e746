// Dashium - A self-hosted monitoring dashboard built with Rust
// Copyright (C) 2025 Dashium Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! In-memory authentication state: users, sessions and the login lockout.
//!
//! Every operation takes the single state lock for its mutation, so
//! `authenticate`, `validate`, `logout` and `cleanup` are atomic with respect
//! to one another. Password hashing runs outside the lock.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, info, warn};

use crate::{
    clock::{Clock, SystemClock},
    error::AuthError,
    models::{LockoutState, Session, User},
};

/// Tunables for session lifetime and brute-force protection
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSettings {
    /// Idle time after which a session is discarded
    pub session_timeout: Duration,
    /// Consecutive failures that engage the lock; zero disables it
    pub max_failed_attempts: u32,
    pub lockout_duration: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_timeout: Duration::hours(24),
            max_failed_attempts: 10,
            lockout_duration: Duration::minutes(30),
        }
    }
}

/// Credential presented to [`AuthManager::authenticate`]
#[derive(Debug, Clone, Copy)]
pub enum PasswordInput<'a> {
    /// Plain password, verified against the stored Argon2 hash
    Raw(&'a str),
    /// Already-hashed credential, compared with the stored hash string
    Hashed(&'a str),
}

/// Summary of an active session for the admin panel
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionInfo {
    pub username: String,
    pub debug_id: u64,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

/// Snapshot of the lockout state
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LockoutStatus {
    pub is_locked: bool,
    pub lock_until: Option<DateTime<Utc>>,
    pub failed_attempts: u32,
    pub max_failed_attempts: u32,
}

#[derive(Debug, Default)]
struct AuthState {
    users: HashMap<String, User>,
    sessions: HashMap<String, Session>,
    lockout: LockoutState,
    next_debug_id: u64,
}

/// Owns users, sessions and lockout state. Construct one at startup and share it.
#[derive(Debug)]
pub struct AuthManager {
    settings: AuthSettings,
    clock: Arc<dyn Clock>,
    state: Mutex<AuthState>,
}

impl AuthManager {
    pub fn new(settings: AuthSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: AuthSettings, clock: Arc<dyn Clock>) -> Self {
        info!(
            session_timeout_minutes = settings.session_timeout.num_minutes(),
            max_failed_attempts = settings.max_failed_attempts,
            lockout_minutes = settings.lockout_duration.num_minutes(),
            "Authentication manager initialized"
        );

        Self {
            settings,
            clock,
            state: Mutex::new(AuthState {
                next_debug_id: 1,
                ..AuthState::default()
            }),
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    fn lock_state(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a user. Returns `Ok(false)` when the username is taken.
    pub fn create_user(&self, username: &str, password: &str) -> Result<bool> {
        if self.lock_state().users.contains_key(username) {
            warn!(username = %username, "User already exists");
            return Ok(false);
        }

        let user = User::new(username, password)?;

        let mut state = self.lock_state();
        if state.users.contains_key(username) {
            warn!(username = %username, "User already exists");
            return Ok(false);
        }
        state.users.insert(user.username.clone(), user);
        info!(username = %username, "User created");
        Ok(true)
    }

    /// Check credentials and open a session.
    ///
    /// While locked, attempts are rejected with [`AuthError::Locked`] and not counted.
    pub fn authenticate(
        &self,
        username: &str,
        password: PasswordInput<'_>,
    ) -> Result<(User, String), AuthError> {
        let candidate = {
            let mut state = self.lock_state();
            if state.lockout.is_locked(self.clock.now()) {
                warn!(username = %username, "Authentication rejected: login locked");
                return Err(AuthError::Locked);
            }
            state.users.get(username).cloned()
        };

        let matched = match &candidate {
            Some(user) => match password {
                PasswordInput::Raw(raw) => user.verify_password(raw).map_err(|e| {
                    tracing::error!(username = %username, "Password verification error: {:?}", e);
                    AuthError::ServiceUnavailable
                })?,
                PasswordInput::Hashed(hash) => user.matches_hash(hash),
            },
            None => false,
        };

        let mut state = self.lock_state();
        let now = self.clock.now();

        // Another attempt may have engaged the lock while the hash was verified
        if state.lockout.is_locked(now) {
            warn!(username = %username, "Authentication rejected: login locked");
            return Err(AuthError::Locked);
        }

        match candidate {
            Some(user) if matched => {
                let debug_id = state.next_debug_id;
                state.next_debug_id += 1;

                let session = Session::new(user.username.clone(), debug_id, now);
                let session_id = session.id.clone();
                state.sessions.insert(session_id.clone(), session);
                state.lockout.reset();

                info!(username = %username, debug_id, "Login successful");
                Ok((user, session_id))
            }
            _ => {
                let engaged = state.lockout.record_failure(
                    now,
                    self.settings.max_failed_attempts,
                    self.settings.lockout_duration,
                );
                warn!(
                    username = %username,
                    failed_attempts = state.lockout.failed_attempts,
                    max_failed_attempts = self.settings.max_failed_attempts,
                    "Login failed"
                );
                if engaged {
                    warn!(
                        lock_until = ?state.lockout.lock_until,
                        "Too many failed login attempts, login locked"
                    );
                }
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Resolve a session id to its user, refreshing its activity timestamp.
    ///
    /// An idle session past the timeout is removed and yields `None`.
    pub fn validate(&self, session_id: &str) -> Option<User> {
        let mut state = self.lock_state();
        let now = self.clock.now();
        let timeout = self.settings.session_timeout;

        let session = state.sessions.get_mut(session_id)?;
        if session.is_expired(now, timeout) {
            let debug_id = session.debug_id;
            state.sessions.remove(session_id);
            info!(debug_id, "Session expired");
            return None;
        }

        session.touch(now);
        let username = session.username.clone();

        match state.users.get(&username) {
            Some(user) => Some(user.clone()),
            None => {
                warn!(username = %username, "Session owner no longer exists");
                state.sessions.remove(session_id);
                None
            }
        }
    }

    /// Remove a session. Returns whether it existed.
    pub fn logout(&self, session_id: &str) -> bool {
        match self.lock_state().sessions.remove(session_id) {
            Some(session) => {
                info!(username = %session.username, debug_id = session.debug_id, "Logged out");
                true
            }
            None => false,
        }
    }

    /// Whether logins are currently locked. Clears an expired lock.
    pub fn is_locked(&self) -> bool {
        let now = self.clock.now();
        self.lock_state().lockout.is_locked(now)
    }

    /// Periodic sweep: drops idle sessions and resets the failed-attempt counter.
    ///
    /// The counter reset happens on every sweep, locked or not. An active lock
    /// itself is left in place until it expires.
    pub fn cleanup(&self) -> usize {
        let mut state = self.lock_state();
        let now = self.clock.now();
        let timeout = self.settings.session_timeout;

        let before = state.sessions.len();
        state
            .sessions
            .retain(|_, session| !session.is_expired(now, timeout));
        let removed = before - state.sessions.len();

        state.lockout.reset();

        if removed > 0 {
            info!(removed, remaining = state.sessions.len(), "Cleaned up expired sessions");
        } else {
            debug!(remaining = state.sessions.len(), "Session cleanup found nothing to remove");
        }
        removed
    }

    /// Active sessions ordered by creation
    pub fn active_sessions(&self) -> Vec<SessionInfo> {
        let state = self.lock_state();
        let mut sessions: Vec<SessionInfo> = state
            .sessions
            .values()
            .map(|s| SessionInfo {
                username: s.username.clone(),
                debug_id: s.debug_id,
                created_at: s.created_at,
                last_active_at: s.last_access,
            })
            .collect();
        sessions.sort_by_key(|s| s.debug_id);
        sessions
    }

    pub fn session_count(&self) -> usize {
        self.lock_state().sessions.len()
    }

    pub fn user_count(&self) -> usize {
        self.lock_state().users.len()
    }

    pub fn lockout_status(&self) -> LockoutStatus {
        let now = self.clock.now();
        let mut state = self.lock_state();
        let is_locked = state.lockout.is_locked(now);

        LockoutStatus {
            is_locked,
            lock_until: state.lockout.lock_until,
            failed_attempts: state.lockout.failed_attempts,
            max_failed_attempts: self.settings.max_failed_attempts,
        }
    }
}
