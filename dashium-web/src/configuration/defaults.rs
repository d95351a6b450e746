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

//! Default configuration values for Dashium
//!
//! Each function returns the default value for a specific configuration field.

use super::TopBarLink;

// Server defaults
pub fn default_host() -> String {
    "localhost".to_string()
}

pub fn default_port() -> u16 {
    8080
}

// Path defaults
pub fn default_templates_directory() -> String {
    "web_assets/templates".to_string()
}

pub fn default_static_directory() -> String {
    "web_assets/static".to_string()
}

// Auth defaults
pub fn default_auth_enabled() -> bool {
    true
}

// Session defaults
pub fn default_session_timeout_minutes() -> i64 {
    1440 // 24 hours
}

pub fn default_cleanup_interval_minutes() -> u64 {
    30
}

pub fn default_secure_cookies() -> bool {
    false
}

// Lockout defaults
pub fn default_lockout_max_attempts() -> u32 {
    10
}

pub fn default_lockout_duration_minutes() -> i64 {
    30
}

// Web view defaults
pub fn default_application_name() -> String {
    "Unnamed Application".to_string()
}

pub fn default_server_info() -> String {
    format!("Dashium Web Server {}", env!("CARGO_PKG_VERSION"))
}

pub fn default_home_page_intro() -> String {
    "Welcome to your monitoring dashboard.".to_string()
}

pub fn default_top_bar_links() -> Vec<TopBarLink> {
    vec![TopBarLink {
        title: "Home".to_string(),
        url: "/".to_string(),
    }]
}

pub fn default_enable_admin_panel() -> bool {
    true
}

// TLS defaults
pub fn default_enable_https() -> bool {
    false
}

// Dashboard defaults
pub fn default_time_aggregation() -> String {
    "disabled".to_string()
}

pub fn default_development_mode() -> bool {
    false
}
