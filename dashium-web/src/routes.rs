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

use crate::{auth_gate::auth_gate, handlers, request_logging::request_logging_middleware, AppState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.config.paths.static_files.clone();

    let mut router = Router::new()
        // Login page and login endpoint share a path
        .route("/login", get(handlers::view_handler).post(handlers::login))
        .route("/api/login", post(handlers::login));

    if state.auth.is_some() {
        router = router.route("/logout", get(handlers::logout));
    }

    router
        // Registered JSON endpoints
        .route(
            "/api/{*endpoint}",
            get(handlers::api_get).post(handlers::api_post),
        )
        // Static files
        .nest_service("/static", ServeDir::new(static_dir))
        // Registered views (last, exact match)
        .fallback(handlers::view_handler)
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        create_test_app_state, login_cookie, TEST_PASSWORD, TEST_USERNAME,
    };
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn server(auth_enabled: bool) -> TestServer {
        let state = create_test_app_state(auth_enabled).expect("Failed to create test state");
        TestServer::new(create_router(state)).expect("Failed to create test server")
    }

    fn location(response: &axum_test::TestResponse) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    fn set_cookie(response: &axum_test::TestResponse) -> Option<String> {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_unauthenticated_page_redirects_to_login() {
        let server = server(true);

        let response = server.get("/").await;
        assert_eq!(response.status_code(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login?next=/");

        let response = server.get("/admin").add_query_param("tab", "stats").await;
        assert_eq!(response.status_code(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login?next=/admin%3Ftab%3Dstats");
    }

    #[tokio::test]
    async fn test_unauthenticated_api_is_401_without_details() {
        let server = server(true);

        let response = server.get("/api/status").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), "Unauthorized");
    }

    #[tokio::test]
    async fn test_exempt_paths_are_reachable() {
        let server = server(true);

        let response = server.get("/login").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().contains("login page next=/"));

        let response = server.get("/logged_out_page").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        // Missing static file is a plain 404, not a login redirect
        let response = server.get("/static/missing.css").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_sanitizes_next() {
        let server = server(true);

        let response = server
            .post("/login")
            .json(&json!({
                "username": TEST_USERNAME,
                "password": TEST_PASSWORD,
                "next": "http://evil"
            }))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["redirect"], "/");

        let cookie = set_cookie(&response).expect("session cookie");
        assert!(cookie.starts_with("auth_token="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
    }

    #[tokio::test]
    async fn test_login_keeps_relative_next() {
        let server = server(true);

        let response = server
            .post("/api/login")
            .json(&json!({
                "username": TEST_USERNAME,
                "password": TEST_PASSWORD,
                "next": "/admin"
            }))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["redirect"], "/admin");
    }

    #[tokio::test]
    async fn test_login_rejections() {
        let server = server(true);

        let response = server.post("/login").text("{not json").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"], "Invalid JSON format");

        let response = server
            .post("/login")
            .json(&json!({ "username": TEST_USERNAME }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["error"],
            "Username and password are required"
        );

        let response = server
            .post("/login")
            .json(&json!({ "username": TEST_USERNAME, "password": "wrong" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<Value>()["error"],
            "Invalid username or password"
        );
    }

    #[tokio::test]
    async fn test_lockout_returns_423() {
        let server = server(true);
        let wrong = json!({ "username": TEST_USERNAME, "password": "wrong" });

        // Threshold is 3 in the test configuration
        assert_eq!(
            server.post("/login").json(&wrong).await.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            server.post("/login").json(&wrong).await.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            server.post("/login").json(&wrong).await.status_code(),
            StatusCode::LOCKED
        );

        let response = server
            .post("/login")
            .json(&json!({ "username": TEST_USERNAME, "password": TEST_PASSWORD }))
            .await;
        assert_eq!(response.status_code(), StatusCode::LOCKED);
    }

    #[tokio::test]
    async fn test_authenticated_page_renders_with_user() {
        let server = server(true);
        let cookie = login_cookie(&server).await;

        let response = server
            .get("/")
            .add_header(header::COOKIE, HeaderValue::from_str(&cookie).unwrap())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let html = response.text();
        assert!(html.contains("home for admin"));
        assert!(html.contains("logout=true"));
        assert!(set_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn test_stale_cookie_is_cleared_on_public_page() {
        let server = server(true);

        let response = server
            .get("/login")
            .add_header(header::COOKIE, HeaderValue::from_static("auth_token=gone"))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let cookie = set_cookie(&response).expect("removal cookie");
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let server = server(true);
        let cookie = login_cookie(&server).await;
        let cookie_header = HeaderValue::from_str(&cookie).unwrap();

        let response = server
            .get("/logout")
            .add_header(header::COOKIE, cookie_header.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::FOUND);
        assert_eq!(location(&response), "/logged_out_page");
        let removal = set_cookie(&response).expect("removal cookie");
        assert!(removal.starts_with("auth_token=;"));
        assert!(removal.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));

        let response = server
            .get("/")
            .add_header(header::COOKIE, cookie_header)
            .await;
        assert_eq!(response.status_code(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_get_api_envelope_and_cors() {
        let server = server(true);
        let cookie = HeaderValue::from_str(&login_cookie(&server).await).unwrap();

        let response = server
            .get("/api/echo")
            .add_query_param("type", "cpu")
            .add_header(header::COOKIE, cookie.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        assert_eq!(response.json::<Value>(), json!({ "data": { "type": "cpu" } }));

        let response = server
            .get("/api/missing")
            .add_header(header::COOKIE, cookie)
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failing_callbacks_are_generic_500s() {
        let server = server(false);

        let response = server.get("/api/fail").await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.text().contains("sensor offline"));

        let response = server.get("/api/panic").await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_post_api_passes_body_and_headers() {
        let server = server(true);

        let response = server
            .post("/api/events")
            .add_header(
                header::HeaderName::from_static("x-api-key"),
                HeaderValue::from_static("k1"),
            )
            .json(&json!({ "event": "disk_full" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(
            response.json::<Value>(),
            json!({ "received": { "event": "disk_full" }, "key": "k1" })
        );

        let response = server.post("/api/events").text("nope").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = server.post("/api/unknown").json(&json!({})).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_stats_are_recorded() {
        let state = create_test_app_state(false).unwrap();
        let stats = state.api_stats.clone();
        let server = TestServer::new(create_router(state)).unwrap();

        server.get("/api/echo").add_query_param("type", "cpu").await;
        server.get("/api/echo").add_query_param("type", "cpu").await;
        server.get("/api/fail").await;

        let rows = stats.snapshot();
        let cpu = rows.iter().find(|r| r.api_name == "type=cpu").unwrap();
        assert_eq!(cpu.total_calls, 2);
        assert_eq!(cpu.total_errors, 0);

        let failing = rows.iter().find(|r| r.api_name.is_empty()).unwrap();
        assert_eq!(failing.total_errors, 1);
    }

    #[tokio::test]
    async fn test_auth_disabled_serves_pages_directly() {
        let server = server(false);

        let response = server.get("/").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().contains("login=false"));

        assert_eq!(
            server.get("/logout").await.status_code(),
            StatusCode::NOT_FOUND
        );

        let response = server
            .post("/login")
            .json(&json!({ "username": TEST_USERNAME, "password": TEST_PASSWORD }))
            .await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_view_and_method() {
        let server = server(false);

        assert_eq!(server.get("/nope").await.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(server.delete("/").await.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_view_seed_is_not_mutated_between_requests() {
        let server = server(false);

        let first = server.get("/counter").await.text();
        let second = server.get("/counter").await.text();
        assert_eq!(first, "visits=1");
        assert_eq!(second, "visits=1");
    }
}
