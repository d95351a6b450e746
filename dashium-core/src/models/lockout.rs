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

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Global brute-force counter shared by every login attempt
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LockoutState {
    pub failed_attempts: u32,
    pub lock_until: Option<DateTime<Utc>>,
}

impl LockoutState {
    /// Check the lock, clearing it (and the counter) once `lock_until` has passed
    pub fn is_locked(&mut self, now: DateTime<Utc>) -> bool {
        match self.lock_until {
            Some(until) if now >= until => {
                tracing::info!("Login lockout expired, resetting failed attempts");
                self.lock_until = None;
                self.failed_attempts = 0;
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Count a failed attempt. Returns true when this attempt engaged the lock.
    ///
    /// A `threshold` of zero disables locking.
    pub fn record_failure(&mut self, now: DateTime<Utc>, threshold: u32, duration: Duration) -> bool {
        self.failed_attempts = self.failed_attempts.saturating_add(1);

        if threshold > 0 && self.failed_attempts >= threshold && self.lock_until.is_none() {
            self.lock_until = Some(now + duration);
            return true;
        }

        false
    }

    pub fn reset(&mut self) {
        self.failed_attempts = 0;
    }
}
