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

use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::{
    auth::{login_redirect_target, SessionState, SESSION_COOKIE},
    error::RoutingError,
    AppState,
};

/// How the gate treats a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// Served without any session lookup
    Open,
    /// Identity resolved for display, never rejected
    Public,
    /// Identity resolved, rejected when absent
    Protected,
}

fn classify(method: &Method, path: &str) -> Access {
    if path == "/static" || path.starts_with("/static/") || path == "/logout" {
        return Access::Open;
    }
    if path == "/login" || path == "/logged_out_page" {
        return Access::Public;
    }
    if method == Method::GET || method == Method::HEAD {
        Access::Protected
    } else {
        // POST endpoints authorize themselves from the headers they receive
        Access::Public
    }
}

/// Resolve the session cookie and reject unauthenticated access to protected paths.
///
/// The resolved [`SessionState`] is stored in the request extensions.
pub async fn auth_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let access = classify(request.method(), &path);

    let Some(auth) = state.auth.as_ref() else {
        return next.run(request).await;
    };

    if access == Access::Open {
        return next.run(request).await;
    }

    let session = match jar.get(SESSION_COOKIE).map(|c| c.value()) {
        Some(token) if !token.is_empty() => match auth.validate(token) {
            Some(user) => SessionState {
                user: Some(user),
                stale_cookie: false,
            },
            None => SessionState {
                user: None,
                stale_cookie: true,
            },
        },
        _ => SessionState::default(),
    };

    if access == Access::Protected && session.user.is_none() {
        if path.starts_with("/api/") {
            tracing::debug!(path = %path, "Unauthenticated API request rejected");
            return RoutingError::Unauthorized.into_response();
        }

        let original = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(path.as_str());
        let location = login_redirect_target(original);
        tracing::debug!(path = %path, location = %location, "Redirecting to login");
        return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}
