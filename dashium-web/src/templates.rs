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

use anyhow::{Context, Result};
use dashium_template::TemplateEngine;
use std::path::Path;

pub fn init_templates(templates_dir: &str, development_mode: bool) -> Result<TemplateEngine> {
    // Create templates directory if it doesn't exist
    std::fs::create_dir_all(templates_dir).context("Failed to create templates directory")?;

    create_default_templates(templates_dir)?;

    Ok(TemplateEngine::new(templates_dir, development_mode))
}

/// Write the built-in templates that are missing from `templates_dir`
fn create_default_templates(templates_dir: &str) -> Result<()> {
    let base_dir = Path::new(templates_dir);

    for (name, content) in DEFAULT_TEMPLATES {
        let path = base_dir.join(name);
        if path.exists() {
            continue;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write default template {}", path.display()))?;
        tracing::info!("Created default template {}", path.display());
    }

    Ok(())
}

const DEFAULT_TEMPLATES: [(&str, &str); 6] = [
    ("base.html", BASE_TEMPLATE),
    ("index.html", INDEX_TEMPLATE),
    ("login.html", LOGIN_TEMPLATE),
    ("logout.html", LOGOUT_TEMPLATE),
    ("admin.html", ADMIN_TEMPLATE),
    ("dashboard.html", DASHBOARD_TEMPLATE),
];

const BASE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{% block title %}{{ page_title | Dashboard }} - {{ site_title }}{% endblock %}</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            margin: 0;
            color: #222;
        }
        nav {
            display: flex;
            gap: 15px;
            align-items: center;
            padding: 10px 20px;
            background: #1f2933;
        }
        nav a, nav .brand {
            color: #f5f7fa;
            text-decoration: none;
        }
        nav .brand {
            font-weight: bold;
            margin-right: 20px;
        }
        nav .auth {
            margin-left: auto;
        }
        main {
            max-width: 960px;
            margin: 0 auto;
            padding: 20px;
        }
        table {
            border-collapse: collapse;
            width: 100%;
        }
        th, td {
            text-align: left;
            padding: 4px 8px;
            border-bottom: 1px solid #eee;
        }
        footer {
            max-width: 960px;
            margin: 40px auto 0;
            padding: 20px;
            border-top: 1px solid #eee;
            font-size: 0.9em;
            color: #666;
        }
    </style>
    {% block head %}{% endblock %}
</head>
<body>
    <nav>
        <span class="brand">{{ site_title }}</span>
        {% for link in top_bar_links %}<a href="{{ link.url }}">{{ link.title }}</a>
        {% endfor %}
        {% if show_logout_button %}<a class="auth" href="/logout">Log out ({{ user.username }})</a>{% endif %}
        {% if show_login_button %}<a class="auth" href="/login">Log in</a>{% endif %}
    </nav>
    <main>
        {% block content %}{% endblock %}
    </main>
    <footer>{{ server_info }} | {{ current_time }}</footer>
</body>
</html>
"#;

const INDEX_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block content %}
<h1>{{ site_title }}</h1>
<p>{{ home_page_intro }}</p>
{% if dashboards %}
<ul class="dashboards">
    {% for dashboard in dashboards %}
    <li><a href="{{ dashboard.url }}">{{ dashboard.icon }} {{ dashboard.title }}</a>{% if dashboard.description %} <span>{{ dashboard.description }}</span>{% endif %}</li>
    {% endfor %}
</ul>
{% endif %}
{% endblock %}
"#;

const LOGIN_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block content %}
<h1>Log in</h1>
<form id="login-form">
    <input type="hidden" name="next" value="{{ next_url | / }}">
    <p><label>Username <input type="text" name="username" autocomplete="username" required></label></p>
    <p><label>Password <input type="password" name="password" autocomplete="current-password" required></label></p>
    <p><button type="submit">Log in</button></p>
    <p id="login-error" role="alert"></p>
</form>
<script>
document.getElementById('login-form').addEventListener('submit', async function (event) {
    event.preventDefault();
    const form = event.target;
    const error = document.getElementById('login-error');
    error.textContent = '';
    const response = await fetch('/login', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({
            username: form.username.value,
            password: form.password.value,
            next: form.next.value
        })
    });
    const result = await response.json();
    if (response.ok && result.success) {
        window.location.href = result.redirect;
    } else {
        error.textContent = result.error || 'Login failed';
    }
});
</script>
{% endblock %}
"#;

const LOGOUT_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block content %}
<h1>Logged out</h1>
<p>You have been logged out. <a href="/login">Log in again</a>.</p>
{% endblock %}
"#;

const ADMIN_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block content %}
<h1>Administration</h1>

<h2>Authentication</h2>
{% if auth_required %}
<table>
    <tr><th>Users</th><td>{{ user_count }}</td></tr>
    <tr><th>Login locked</th><td>{{ auth_manager.is_locked }}</td></tr>
    {% if auth_manager.is_locked %}<tr><th>Locked until</th><td>{{ auth_manager.lock_until }}</td></tr>{% endif %}
    <tr><th>Failed attempts</th><td>{{ auth_manager.failed_login_attempts }} / {{ auth_manager.max_failed_attempts }}</td></tr>
</table>

<h2>Active sessions</h2>
<table>
    <tr><th>#</th><th>User</th><th>Created</th><th>Last active</th></tr>
    {% for session in active_sessions %}
    <tr><td>{{ session.debug_id }}</td><td>{{ session.username }}</td><td>{{ session.created_at }}</td><td>{{ session.last_active_at }}</td></tr>
    {% endfor %}
</table>
{% else %}
<p>Authentication is disabled.</p>
{% endif %}

<h2>API usage</h2>
<table>
    <tr><th>Parameters</th><th>Calls</th><th>Errors</th><th>Avg (ms)</th><th>Max (ms)</th></tr>
    {% for row in api_stats %}
    <tr><td>{{ row.api_name }}</td><td>{{ row.total_calls }}</td><td>{{ row.total_errors }}</td><td>{{ row.avg_response_time_ms }}</td><td>{{ row.max_response_time_ms }}</td></tr>
    {% endfor %}
</table>
{% endblock %}
"#;

const DASHBOARD_TEMPLATE: &str = r#"{% extends "base.html" %}

{% block content %}
<h1>{{ dashboard_name }}</h1>
{% if description %}<p class="description">{{ description }}</p>{% endif %}

<form class="dashboard-controls">
    {% if event_name_param_choices %}
    <label>{{ event_name_param_label | Source }}
        <select name="event_name_param">
            {% for choice in event_name_param_choices %}<option value="{{ choice }}"{% if choice == default_event_name_param %} selected{% endif %}>{{ choice }}</option>
            {% endfor %}
        </select>
    </label>
    {% endif %}
    {% if show_page_time_aggregation_selection %}
    <label>Aggregation
        <select name="time_aggregation" data-default="{{ default_time_aggregation }}">
            <option value="disabled">None</option>
            <option value="hourly">Hourly</option>
            <option value="daily">Daily</option>
            <option value="weekly">Weekly</option>
            <option value="monthly">Monthly</option>
        </select>
    </label>
    {% endif %}
</form>

<div class="widgets">
    {% for widget in widgets %}
    <section class="widget" data-index="{{ loop.index0 }}" data-type="{{ widget.type | unknown }}">
        <h2>{{ widget.title | }}</h2>
    </section>
    {% endfor %}
</div>

<ul class="data-sources">
    {% for source in data_sources %}<li>{{ source.source_id | source }}</li>
    {% endfor %}
</ul>
{% endblock %}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use dashium_template::{Context as TemplateContext, MemorySource};
    use serde_json::json;
    use tempfile::TempDir;

    fn engine() -> TemplateEngine {
        let mut source = MemorySource::new();
        for (name, content) in DEFAULT_TEMPLATES {
            source.insert(name, content);
        }
        TemplateEngine::with_source(source, true)
    }

    fn base_context() -> TemplateContext {
        let mut context = TemplateContext::new();
        context.insert("site_title", "Ops");
        context.insert("server_info", "Dashium");
        context.insert("current_time", "2025-01-01 00:00:00");
        context.insert("top_bar_links", &json!([{"title": "Home", "url": "/"}]));
        context.insert("show_logout_button", &false);
        context.insert("show_login_button", &true);
        context
    }

    #[test]
    fn test_init_writes_missing_templates_only() {
        let dir = TempDir::new().unwrap();
        let templates_dir = dir.path().join("templates");
        std::fs::create_dir_all(&templates_dir).unwrap();
        std::fs::write(templates_dir.join("index.html"), "custom").unwrap();

        init_templates(templates_dir.to_str().unwrap(), true).unwrap();

        for (name, _) in DEFAULT_TEMPLATES {
            assert!(templates_dir.join(name).exists(), "{} missing", name);
        }
        assert_eq!(
            std::fs::read_to_string(templates_dir.join("index.html")).unwrap(),
            "custom"
        );
    }

    #[test]
    fn test_default_templates_parse_and_render() {
        let engine = engine();
        let mut context = base_context();
        context.insert("page_title", "Home");
        context.insert("home_page_intro", "Hello operators");

        let html = engine.try_render("index.html", &context).unwrap();
        assert!(html.contains("<title>Home - Ops</title>"));
        assert!(html.contains("<p>Hello operators</p>"));
        assert!(html.contains("<a href=\"/\">Home</a>"));
        assert!(html.contains("href=\"/login\">Log in</a>"));
        assert!(!html.contains("Log out"));
    }

    #[test]
    fn test_index_template_lists_dashboards() {
        let engine = engine();
        let mut context = base_context();
        context.insert(
            "dashboards",
            &json!([{"title": "CPU", "icon": "&#9881;", "description": "Load", "url": "/dashboard/cpu"}]),
        );

        let html = engine.try_render("index.html", &context).unwrap();
        assert!(html.contains("<a href=\"/dashboard/cpu\">&#9881; CPU</a> <span>Load</span>"));
    }

    #[test]
    fn test_dashboard_template_renders_widgets() {
        let engine = engine();
        let mut context = base_context();
        context.insert("page_title", "CPU");
        context.insert("dashboard_name", "CPU");
        context.insert("description", "Line one<br />Line two");
        context.insert("event_name_param_choices", &json!(["host-a", "host-b"]));
        context.insert("default_event_name_param", "host-b");
        context.insert("event_name_param_label", "Host");
        context.insert("show_page_time_aggregation_selection", &true);
        context.insert("default_time_aggregation", "hourly");
        context.insert("widgets", &json!([{"type": "graph", "title": "Load"}, {}]));
        context.insert("data_sources", &json!([{"source_id": "cpu_load"}]));

        let html = engine.try_render("dashboard.html", &context).unwrap();
        assert!(html.contains("<title>CPU - Ops</title>"));
        assert!(html.contains("<h1>CPU</h1>"));
        assert!(html.contains("<p class=\"description\">Line one<br />Line two</p>"));
        assert!(html.contains("<option value=\"host-b\" selected>host-b</option>"));
        assert!(html.contains("<option value=\"host-a\">host-a</option>"));
        assert!(html.contains("data-default=\"hourly\""));
        assert!(html.contains("data-index=\"0\" data-type=\"graph\""));
        assert!(html.contains("data-index=\"1\" data-type=\"unknown\""));
        assert!(html.contains("<h2>Load</h2>"));
        assert!(html.contains("<li>cpu_load</li>"));
    }

    #[test]
    fn test_login_template_uses_next_url() {
        let engine = engine();
        let mut context = base_context();
        context.insert("next_url", "/admin");

        let html = engine.try_render("login.html", &context).unwrap();
        assert!(html.contains("name=\"next\" value=\"/admin\""));
        assert!(html.contains("fetch('/login'"));
    }

    #[test]
    fn test_admin_template_renders_stats() {
        let engine = engine();
        let mut context = base_context();
        context.insert("auth_required", &true);
        context.insert("user_count", &2);
        context.insert(
            "auth_manager",
            &json!({
                "is_locked": false,
                "lock_until": null,
                "failed_login_attempts": 1,
                "max_failed_attempts": 10
            }),
        );
        context.insert(
            "active_sessions",
            &json!([{"debug_id": 1, "username": "admin", "created_at": "t0", "last_active_at": "t1"}]),
        );
        context.insert(
            "api_stats",
            &json!([{
                "api_name": "type=cpu",
                "total_calls": 3,
                "total_errors": 1,
                "avg_response_time_ms": 2.5,
                "max_response_time_ms": 4.0
            }]),
        );

        let html = engine.try_render("admin.html", &context).unwrap();
        assert!(html.contains("<td>1 / 10</td>"));
        assert!(html.contains("<td>admin</td>"));
        assert!(html.contains("<td>type=cpu</td><td>3</td><td>1</td><td>2.5</td>"));
        assert!(!html.contains("Locked until"));
        assert!(!html.contains("Authentication is disabled"));
    }
}
