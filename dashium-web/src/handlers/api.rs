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
    extract::{Query, State},
    http::{header, HeaderMap, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::time::Instant;

use crate::{
    api_registry::ApiReply,
    error::{ApiError, RoutingError},
    view_registry::QueryParams,
    AppState,
};

const ALLOW_ANY_ORIGIN: [(header::HeaderName, &str); 1] =
    [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")];

/// Collapse a blocking callback's outcome, turning errors and panics into 500s
fn settle(
    path: &str,
    outcome: Result<anyhow::Result<ApiReply>, tokio::task::JoinError>,
) -> Result<ApiReply, ApiError> {
    match outcome {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(e)) => Err(ApiError::internal(format!("{}: {:#}", path, e))),
        Err(e) => Err(ApiError::internal(format!("{}: callback panicked: {}", path, e))),
    }
}

/// Registered GET endpoint; the payload is wrapped as `{"data": ...}`
pub async fn api_get(
    State(state): State<AppState>,
    uri: Uri,
    Query(params): Query<QueryParams>,
) -> Response {
    let path = uri.path();
    let Some(callback) = state.apis.get_endpoint(path) else {
        return RoutingError::NotFound.into_response();
    };

    let started = Instant::now();
    let call_params = params.clone();
    let outcome = tokio::task::spawn_blocking(move || callback(&call_params)).await;
    let result = settle(path, outcome);
    let elapsed = started.elapsed();

    match result {
        Ok(reply) => {
            state
                .api_stats
                .record(&params, elapsed, reply.status.is_client_error() || reply.status.is_server_error());
            tracing::debug!(path = %path, status = %reply.status, elapsed_ms = elapsed.as_millis() as u64, "API call");
            (
                reply.status,
                ALLOW_ANY_ORIGIN,
                Json(json!({ "data": reply.payload })),
            )
                .into_response()
        }
        Err(e) => {
            state.api_stats.record(&params, elapsed, true);
            e.into_response()
        }
    }
}

/// Registered POST endpoint; the callback's payload is returned as is
pub async fn api_post(State(state): State<AppState>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path();
    let Some(callback) = state.apis.post_endpoint(path) else {
        return RoutingError::NotFound.into_response();
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(path = %path, "Rejecting POST body: {}", e);
            return ApiError::bad_request("Invalid JSON format").into_response();
        }
    };

    let outcome = tokio::task::spawn_blocking(move || callback(payload, &headers)).await;
    match settle(path, outcome) {
        Ok(reply) => (reply.status, ALLOW_ANY_ORIGIN, Json(reply.payload)).into_response(),
        Err(e) => e.into_response(),
    }
}
