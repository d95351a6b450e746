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

use axum::{extract::FromRequestParts, http::request::Parts};
use cookie::{time::OffsetDateTime, Cookie, SameSite};
use dashium_core::User;
use std::convert::Infallible;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "auth_token";

/// Identity resolved by the auth gate for the current request
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<User>,
    /// A session cookie was presented but did not resolve to a user
    pub stale_cookie: bool,
}

impl<S> FromRequestParts<S> for SessionState
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SessionState>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Cookie carrying a freshly issued session id
pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie that makes the browser drop the session cookie
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// Reduce a post-login target to a same-origin relative path
pub fn sanitize_next(next: Option<&str>) -> String {
    let next = next.map(str::trim).unwrap_or_default();
    if !next.starts_with('/') || next.starts_with("//") || next.starts_with("/\\") {
        "/".to_string()
    } else {
        next.to_string()
    }
}

/// `/login?next=...` for the given original path and query
pub fn login_redirect_target(path_and_query: &str) -> String {
    let encoded = urlencoding::encode(path_and_query).replace("%2F", "/");
    format!("/login?next={}", encoded)
}
