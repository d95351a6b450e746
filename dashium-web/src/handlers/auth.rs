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
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use dashium_core::{AuthError, PasswordInput};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::{removal_cookie, sanitize_next, session_cookie, SESSION_COOKIE},
    error::ApiError,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub next: Option<String>,
}

/// `POST /login` and `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let Some(auth) = state.auth.clone() else {
        tracing::warn!("Login attempted while authentication is disabled");
        return Err(AuthError::ServiceUnavailable.into());
    };

    let request: LoginRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Rejecting login body: {}", e);
        ApiError::bad_request("Invalid JSON format")
    })?;

    let username = request.username.unwrap_or_default().trim().to_string();
    let password = request.password.unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    if auth.is_locked() {
        return Err(AuthError::Locked.into());
    }

    let redirect = sanitize_next(request.next.as_deref());

    let manager = auth.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        manager.authenticate(&username, PasswordInput::Raw(&password))
    })
    .await
    .map_err(|e| {
        tracing::error!("Authentication task failed: {}", e);
        ApiError::from(AuthError::ServiceUnavailable)
    })?;

    match outcome {
        Ok((user, session_id)) => {
            tracing::info!(username = %user.username, redirect = %redirect, "User logged in");
            let cookie = session_cookie(session_id, state.config.session.secure_cookies);
            Ok((
                jar.add(cookie),
                Json(json!({
                    "success": true,
                    "message": "Login successful",
                    "redirect": redirect,
                })),
            ))
        }
        // This attempt may have been the one that engaged the lock
        Err(AuthError::InvalidCredentials) if auth.is_locked() => Err(AuthError::Locked.into()),
        Err(e) => Err(e.into()),
    }
}

/// `GET /logout`: drop the session and send the browser to the logged-out page
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let (Some(auth), Some(cookie)) = (state.auth.as_ref(), jar.get(SESSION_COOKIE)) {
        if !auth.logout(cookie.value()) {
            tracing::debug!("Logout with unknown session");
        }
    }

    (
        StatusCode::FOUND,
        [
            (header::LOCATION, "/logged_out_page".to_string()),
            (header::SET_COOKIE, removal_cookie().to_string()),
        ],
    )
        .into_response()
}
