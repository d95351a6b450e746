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

//! TOML configuration parser for Dashium
//!
//! Reads configuration files from standard locations and merges them.
//! Every field is optional so a file may hold any subset of the settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::TopBarLink;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub server: Option<TomlServerConfig>,
    pub paths: Option<TomlPathConfig>,
    pub auth: Option<TomlAuthConfig>,
    pub session: Option<TomlSessionConfig>,
    pub lockout: Option<TomlLockoutConfig>,
    pub web_views: Option<TomlWebViewsConfig>,
    pub tls: Option<TomlTlsConfig>,
    pub dashboards: Option<Vec<TomlDashboardEntry>>,
    pub development_mode: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlPathConfig {
    pub templates: Option<String>,
    pub static_files: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlAuthConfig {
    pub enabled: Option<bool>,
    pub users: Option<Vec<TomlUserEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlUserEntry {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlSessionConfig {
    pub timeout_minutes: Option<i64>,
    pub cleanup_interval_minutes: Option<u64>,
    pub secure_cookies: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlLockoutConfig {
    pub max_attempts: Option<u32>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlWebViewsConfig {
    pub application_name: Option<String>,
    pub server_info: Option<String>,
    pub home_page_intro: Option<String>,
    pub top_bar_links: Option<Vec<TopBarLink>>,
    pub enable_admin_panel: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlTlsConfig {
    pub enable_https: Option<bool>,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    pub cert_chain_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlDashboardEntry {
    pub id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub inline_description: Option<String>,
    pub long_description: Option<String>,
    pub default_event_name_param: Option<String>,
    pub event_name_param_label: Option<String>,
    pub show_page_time_aggregation_selection: Option<bool>,
    pub default_time_aggregation: Option<String>,
    pub event_name_param_choices: Option<Vec<toml::Value>>,
    pub data: Option<Vec<toml::Table>>,
    pub widgets: Option<Vec<toml::Table>>,
}

/// Parse a TOML configuration file if it exists
pub fn parse_toml_file<P: AsRef<Path>>(path: P) -> Result<TomlConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

    toml::from_str(&content).with_context(|| {
        format!(
            "Failed to parse TOML configuration file: {}",
            path.display()
        )
    })
}

/// Configuration file paths in order of precedence (lowest to highest).
///
/// `DASHIUM_CONFIG` replaces the standard list with a single file.
pub fn get_config_file_paths() -> Vec<PathBuf> {
    if let Ok(explicit) = std::env::var("DASHIUM_CONFIG") {
        return vec![PathBuf::from(explicit)];
    }

    let mut paths = vec![PathBuf::from("/etc/dashium.toml")];

    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".dashium.toml"));
    }

    paths.push(PathBuf::from("./dashium.toml"));
    paths
}

/// Overwrite `target` when `source` has a value
fn take<T>(target: &mut Option<T>, source: Option<T>) {
    if source.is_some() {
        *target = source;
    }
}

/// Merge multiple TOML configurations, with later configs taking precedence
pub fn merge_toml_configs(configs: Vec<TomlConfig>) -> TomlConfig {
    let mut merged = TomlConfig::default();

    for config in configs {
        if let Some(server) = config.server {
            let merged_server = merged.server.get_or_insert_with(Default::default);
            take(&mut merged_server.host, server.host);
            take(&mut merged_server.port, server.port);
        }

        if let Some(paths) = config.paths {
            let merged_paths = merged.paths.get_or_insert_with(Default::default);
            take(&mut merged_paths.templates, paths.templates);
            take(&mut merged_paths.static_files, paths.static_files);
        }

        if let Some(auth) = config.auth {
            let merged_auth = merged.auth.get_or_insert_with(Default::default);
            take(&mut merged_auth.enabled, auth.enabled);
            take(&mut merged_auth.users, auth.users);
        }

        if let Some(session) = config.session {
            let merged_session = merged.session.get_or_insert_with(Default::default);
            take(&mut merged_session.timeout_minutes, session.timeout_minutes);
            take(
                &mut merged_session.cleanup_interval_minutes,
                session.cleanup_interval_minutes,
            );
            take(&mut merged_session.secure_cookies, session.secure_cookies);
        }

        if let Some(lockout) = config.lockout {
            let merged_lockout = merged.lockout.get_or_insert_with(Default::default);
            take(&mut merged_lockout.max_attempts, lockout.max_attempts);
            take(&mut merged_lockout.duration_minutes, lockout.duration_minutes);
        }

        if let Some(views) = config.web_views {
            let merged_views = merged.web_views.get_or_insert_with(Default::default);
            take(&mut merged_views.application_name, views.application_name);
            take(&mut merged_views.server_info, views.server_info);
            take(&mut merged_views.home_page_intro, views.home_page_intro);
            take(&mut merged_views.top_bar_links, views.top_bar_links);
            take(&mut merged_views.enable_admin_panel, views.enable_admin_panel);
        }

        if let Some(tls) = config.tls {
            let merged_tls = merged.tls.get_or_insert_with(Default::default);
            take(&mut merged_tls.enable_https, tls.enable_https);
            take(&mut merged_tls.cert_file, tls.cert_file);
            take(&mut merged_tls.key_file, tls.key_file);
            take(&mut merged_tls.cert_chain_file, tls.cert_chain_file);
        }

        take(&mut merged.dashboards, config.dashboards);
        take(&mut merged.development_mode, config.development_mode);
    }

    merged
}
