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

use crate::{
    api_registry::ApiReply,
    configuration::{Configuration, UserCredentials},
    view_registry::View,
    AppState,
};
use axum::http::{header, StatusCode};
use dashium_template::{MemorySource, TemplateEngine};
use serde_json::json;

pub const TEST_USERNAME: &str = "admin";
pub const TEST_PASSWORD: &str = "correct-horse";

/// Small templates that make the standard context keys easy to assert on
pub fn test_templates() -> TemplateEngine {
    let source = MemorySource::new()
        .with(
            "index.html",
            "home for {{ user.username | nobody }} logout={{ show_logout_button }} login={{ show_login_button }}",
        )
        .with("login.html", "login page next={{ next_url }}")
        .with("logout.html", "logged out")
        .with("admin.html", "admin users={{ user_count }}")
        .with("counter.html", "visits={{ visits }}");
    TemplateEngine::with_source(source, true)
}

pub fn test_config(auth_enabled: bool) -> Configuration {
    let mut config = Configuration::default();
    config.auth.enabled = auth_enabled;
    config.auth.users = vec![UserCredentials {
        username: TEST_USERNAME.to_string(),
        password: TEST_PASSWORD.to_string(),
    }];
    config.lockout.max_attempts = 3;
    config.paths.static_files = "does-not-exist/static".to_string();
    config
}

/// App state with the built-in views plus a few test endpoints
pub fn create_test_app_state(auth_enabled: bool) -> Result<AppState, anyhow::Error> {
    AppState::bootstrap(test_config(auth_enabled), test_templates(), |views, apis| {
        views.register(
            View::new(["/counter"], "counter.html")
                .with_value("visits", &0)
                .with_processor(|context, _path, _params| {
                    let visits = context.get("visits").and_then(|v| v.as_i64()).unwrap_or(0);
                    context.insert("visits", &(visits + 1));
                    Ok(())
                }),
        )?;

        apis.register_get(["/api/echo"], |params| Ok(ApiReply::ok(json!(params))))?;
        apis.register_get(["/api/fail"], |_| Err(anyhow::anyhow!("sensor offline")))?;
        apis.register_get(["/api/panic"], |_| -> anyhow::Result<ApiReply> {
            panic!("callback bug")
        })?;
        apis.register_post(["/api/events"], |body, headers| {
            let key = headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            Ok(ApiReply::with_status(
                json!({ "received": body, "key": key }),
                StatusCode::CREATED,
            ))
        })?;
        Ok(())
    })
}

/// Log in as the test user and return the `auth_token=...` cookie pair
pub async fn login_cookie(server: &axum_test::TestServer) -> String {
    let response = server
        .post("/login")
        .json(&json!({ "username": TEST_USERNAME, "password": TEST_PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("login response sets a cookie")
        .to_string()
}
