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
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dashium_core::AuthError;
use serde_json::json;
use thiserror::Error;

/// Outcomes of path classification and gating
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Not Found")]
    NotFound,
    #[error("Unauthorized")]
    Unauthorized,
}

impl RoutingError {
    pub fn status(&self) -> StatusCode {
        match self {
            RoutingError::NotFound => StatusCode::NOT_FOUND,
            RoutingError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for RoutingError {
    fn into_response(self) -> Response {
        tracing::debug!(status = ?self.status(), "Routing error: {}", self);
        (self.status(), self.to_string()).into_response()
    }
}

/// Failures while serving a JSON endpoint. Clients receive `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    /// Detail is logged, never sent
    #[error("internal error: {0}")]
    InternalError(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::InternalError(details.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::Locked) => StatusCode::LOCKED,
            ApiError::Auth(AuthError::ServiceUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::InternalError(details) => {
                tracing::error!(status = ?status, details = %details, "API request failed");
                "Internal Server Error".to_string()
            }
            other => {
                tracing::debug!(status = ?status, "API request rejected: {}", other);
                other.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
