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

//! Core domain for the Dashium dashboard: users, sessions, brute-force lockout
//! and the [`AuthManager`] that ties them together.
//!
//! ```
//! use dashium_core::{AuthManager, AuthSettings, PasswordInput};
//!
//! let auth = AuthManager::new(AuthSettings::default());
//! assert!(auth.create_user("admin", "s3cret").unwrap());
//!
//! let (user, session_id) = auth
//!     .authenticate("admin", PasswordInput::Raw("s3cret"))
//!     .unwrap();
//! assert_eq!(user.username, "admin");
//! assert_eq!(auth.validate(&session_id).unwrap().username, "admin");
//! ```

pub mod auth;
pub mod clock;
pub mod error;
pub mod models;

pub use auth::{AuthManager, AuthSettings, LockoutStatus, PasswordInput, SessionInfo};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AuthError;
pub use models::*;
