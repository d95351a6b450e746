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
    extract::{Query, State},
    http::{header, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use dashium_template::Context;

use crate::{
    auth::{removal_cookie, SessionState},
    configuration::{Configuration, TopBarLink},
    error::RoutingError,
    view_registry::QueryParams,
    AppState,
};

/// Top-bar links with the admin entry appended when the panel is enabled
fn top_bar_links(config: &Configuration) -> Vec<TopBarLink> {
    let mut links = config.web_views.top_bar_links.clone();
    if config.web_views.enable_admin_panel && !links.iter().any(|l| l.url == "/admin") {
        links.push(TopBarLink {
            title: "Admin".to_string(),
            url: "/admin".to_string(),
        });
    }
    links
}

/// Keys every view receives on top of its seed
pub fn standard_context(config: &Configuration, auth_enabled: bool, session: &SessionState) -> Context {
    let mut context = Context::new();
    context.insert(
        "current_time",
        &chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    context.insert("server_info", &config.web_views.server_info);
    context.insert("site_title", &config.web_views.application_name);
    context.insert("top_bar_links", &top_bar_links(config));
    context.insert("enable_admin_panel", &config.web_views.enable_admin_panel);
    context.insert("show_logout_button", &(auth_enabled && session.user.is_some()));
    context.insert("show_login_button", &(auth_enabled && session.user.is_none()));
    context.insert("user", &session.user);
    context
}

/// Exact-match view dispatch for every path no other route claims
pub async fn view_handler(
    State(state): State<AppState>,
    session: SessionState,
    method: Method,
    uri: Uri,
    Query(params): Query<QueryParams>,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return RoutingError::NotFound.into_response();
    }

    let path = uri.path().to_string();
    let Some(view) = state.views.find(&path) else {
        return RoutingError::NotFound.into_response();
    };

    let mut context = view.seed.clone();
    context.extend(standard_context(
        &state.config,
        state.auth.is_some(),
        &session,
    ));

    let templates = state.templates.clone();
    let rendered = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        if let Some(processor) = &view.processor {
            processor(&mut context, &path, &params)?;
        }
        Ok(templates.render(&view.template, &context))
    })
    .await;

    let body = match rendered {
        Ok(Ok(body)) => body,
        Ok(Err(e)) => {
            tracing::error!(path = %uri.path(), "View context processor failed: {:#}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
        Err(e) => {
            tracing::error!(path = %uri.path(), "View rendering task failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    if session.stale_cookie {
        ([(header::SET_COOKIE, removal_cookie().to_string())], Html(body)).into_response()
    } else {
        Html(body).into_response()
    }
}
