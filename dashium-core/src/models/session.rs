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

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;

/// Number of random bytes in a session id (256 bits)
pub const SESSION_ID_BYTES: usize = 32;

/// Server-side record binding an opaque token to an authenticated user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Session {
    #[serde(skip_serializing)]
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub debug_id: u64,
}

impl Session {
    pub fn new(username: impl Into<String>, debug_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_session_id(),
            username: username.into(),
            created_at: now,
            last_access: now,
            debug_id,
        }
    }

    /// True once the session has been idle for longer than `timeout`
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_access > timeout
    }

    /// Record activity. `last_access` never moves backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_access {
            self.last_access = now;
        }
    }
}

/// Generate a URL-safe session token from the OS random source
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
