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

use anyhow::{Context as _, Result};
use dashium_core::AuthManager;
use serde_json::json;
use std::sync::Arc;

use crate::{
    api_registry::{ApiRegistry, ApiReply},
    api_stats::ApiStats,
    auth::sanitize_next,
    configuration::{Configuration, DashboardConfig},
    view_registry::{View, ViewRegistry},
};

const ICONS: &[(&str, &str)] = &[
    ("line_chart_up", "&#x1F4C8;"),
    ("line_chart_down", "&#x1F4C9;"),
    ("table", "&#x25A4;"),
    ("bars", "&#x1F4CA;"),
    ("metric", "&#x1F5E0;"),
    ("ballot", "&#x1F5F3;"),
    ("grid", "&#x25A6;"),
    ("calc", "&#x1F9EE;"),
    ("numbers", "&#x1F522;"),
    ("report", "&#x1F5C4;"),
    ("check", "&#x2705;"),
    ("error", "&#x274C;"),
    ("warning", "&#x26A0;"),
    ("priority", "&#x26A1;"),
    ("green_circle", "&#x1F7E2;"),
    ("yellow_circle", "&#x1F7E1;"),
    ("red_circle", "&#x1F534;"),
    ("clipboard", "&#x1F4CB;"),
    ("mobile", "&#x1F4F1;"),
    ("pc", "&#x1F4BB;"),
    ("folder", "&#x1F5C2;"),
    ("database", "&#x1F4BE;"),
    ("signal", "&#128246;"),
    ("wifi", "&#128246;"),
    ("server", "&#128187;"),
    ("stopwatch", "&#9201;"),
    ("star", "&#11088;"),
    ("target", "&#127919;"),
    ("trophy", "&#127942;"),
    ("magnifying_glass", "&#128269;"),
    ("bell", "&#128276;"),
    ("gear", "&#9881;"),
    ("tools", "&#128736;"),
    ("pie", "&#9684;"),
    ("dollar", "&#128178;"),
    ("battery", "&#128267;"),
    ("electric_plug", "&#128268;"),
    ("lightning", "&#9889;"),
    ("link", "&#128279;"),
    ("globe", "&#127760;"),
    ("termometer", "&#127777;"),
    ("calendar", "&#128197;"),
    ("lock", "&#128274;"),
    ("unlock", "&#128275;"),
    ("eye", "&#128065;"),
    ("shield", "&#128737;"),
    ("person", "&#128100;"),
    ("money", "&#128181;"),
    ("pushpin", "&#128205;"),
    ("red_flag", "&#128681;"),
    ("fire", "&#128293;"),
    ("disk", "&#128191;"),
    ("bug", "&#128027;"),
    ("floppy", "&#128190;"),
    ("doc", "&#x1F4C4;"),
    ("writing", "&#x1F4DD;"),
];

/// HTML entity for a named icon. Unknown names are used verbatim.
pub fn icon_html(name: &str) -> String {
    ICONS
        .iter()
        .find(|(icon, _)| *icon == name)
        .map(|(_, entity)| *entity)
        .unwrap_or(name)
        .to_string()
}

/// Home page entries for the configured dashboards
fn dashboard_links(dashboards: &[DashboardConfig]) -> Vec<serde_json::Value> {
    dashboards
        .iter()
        .map(|dashboard| {
            json!({
                "title": dashboard.title,
                "icon": icon_html(&dashboard.icon),
                "description": dashboard.inline_description,
                "url": dashboard.path(),
            })
        })
        .collect()
}

fn dashboard_view(dashboard: &DashboardConfig) -> View {
    View::new([dashboard.path()], "dashboard.html")
        .with_value("page_title", &dashboard.title)
        .with_value("dashboard_name", &dashboard.title)
        .with_value("dashboard_id", &dashboard.id)
        .with_value("default_event_name_param", &dashboard.default_event_name_param)
        .with_value("event_name_param_choices", &dashboard.event_name_param_choices)
        .with_value("event_name_param_label", &dashboard.event_name_param_label)
        .with_value(
            "show_page_time_aggregation_selection",
            &dashboard.show_page_time_aggregation_selection,
        )
        .with_value("data_sources", &dashboard.data)
        .with_value("widgets", &dashboard.widgets)
        .with_value("default_time_aggregation", &dashboard.default_time_aggregation)
        .with_value("description", &dashboard.description_html())
}

/// Home, login, logged-out, admin and dashboard pages plus the `/api/status` endpoint
pub fn register_builtin_views(
    views: &mut ViewRegistry,
    apis: &mut ApiRegistry,
    config: &Configuration,
    auth: Option<Arc<AuthManager>>,
    api_stats: Arc<ApiStats>,
) -> Result<()> {
    views.register(
        View::new(["/", ""], "index.html")
            .with_value("page_title", "Home")
            .with_value("dashboard_name", "Home")
            .with_value("home_page_intro", &config.web_views.home_page_intro)
            .with_value("dashboards", &dashboard_links(&config.dashboards)),
    )?;

    for dashboard in &config.dashboards {
        views
            .register(dashboard_view(dashboard))
            .with_context(|| format!("Failed to register dashboard {:?}", dashboard.id))?;
    }

    if auth.is_some() {
        views.register(
            View::new(["/login"], "login.html")
                .with_value("page_title", "Login")
                .with_processor(|context, _path, params| {
                    let next = sanitize_next(params.get("next").map(String::as_str));
                    context.insert(
                        "next_url",
                        &html_escape::encode_double_quoted_attribute(&next),
                    );
                    Ok(())
                }),
        )?;
        views.register(
            View::new(["/logged_out_page"], "logout.html").with_value("page_title", "Logged Out"),
        )?;
    }

    if config.web_views.enable_admin_panel {
        let admin_auth = auth.clone();
        views.register(
            View::new(["/admin"], "admin.html")
                .with_value("page_title", "Admin")
                .with_processor(move |context, _path, _params| {
                    context.insert("auth_required", &admin_auth.is_some());
                    match &admin_auth {
                        Some(auth) => {
                            let lockout = auth.lockout_status();
                            context.insert(
                                "auth_manager",
                                &json!({
                                    "is_locked": lockout.is_locked,
                                    "lock_until": lockout
                                        .lock_until
                                        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
                                    "failed_login_attempts": lockout.failed_attempts,
                                    "max_failed_attempts": lockout.max_failed_attempts,
                                }),
                            );
                            context.insert("active_sessions", &auth.active_sessions());
                            context.insert("user_count", &auth.user_count());
                        }
                        None => {
                            context.insert("auth_manager", &serde_json::Value::Null);
                            context.insert("active_sessions", &Vec::<()>::new());
                            context.insert("user_count", &0);
                        }
                    }
                    context.insert("api_stats", &api_stats.snapshot());
                    Ok(())
                }),
        )?;
    }

    apis.register_get(["/api/status"], move |_params| {
        let payload = match &auth {
            Some(auth) => json!({
                "auth_enabled": true,
                "users": auth.user_count(),
                "active_sessions": auth.session_count(),
                "locked": auth.is_locked(),
            }),
            None => json!({
                "auth_enabled": false,
                "users": 0,
                "active_sessions": 0,
                "locked": false,
            }),
        };
        Ok(ApiReply::ok(payload))
    })?;

    Ok(())
}
