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

use anyhow::{anyhow, Context, Result};
use dashium_core::AuthSettings;
use serde::{Deserialize, Serialize};
use std::{env, fmt::Display, path::Path, str::FromStr};

pub mod defaults;
pub mod parser;

/// Main configuration structure containing all sub-configurations
///
/// # Example
///
/// ```rust,no_run
/// use dashium_web::configuration::Configuration;
///
/// let config = Configuration::load().expect("Failed to load configuration");
/// println!("Server running on: {}", config.bind_addr());
/// println!("Session timeout: {} minutes", config.session.timeout_minutes);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Configuration {
    pub development_mode: bool,
    pub server: ServerConfig,
    pub paths: PathConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub lockout: LockoutConfig,
    pub web_views: WebViewsConfig,
    pub tls: TlsConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dashboards: Vec<DashboardConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PathConfig {
    pub templates: String,
    pub static_files: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuthConfig {
    pub enabled: bool,
    pub users: Vec<UserCredentials>,
}

/// A user account declared in configuration
#[derive(Clone, Deserialize, Serialize, PartialEq)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SessionConfig {
    pub timeout_minutes: i64,
    pub cleanup_interval_minutes: u64,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LockoutConfig {
    /// Zero disables the lockout
    pub max_attempts: u32,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WebViewsConfig {
    pub application_name: String,
    pub server_info: String,
    pub home_page_intro: String,
    pub enable_admin_panel: bool,
    pub top_bar_links: Vec<TopBarLink>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TopBarLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    pub enable_https: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_chain_file: Option<String>,
}

/// A dashboard page served under `/dashboard/{url}`
///
/// `data` and `widgets` are passed to the page template as-is.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DashboardConfig {
    pub id: String,
    pub url: String,
    pub title: String,
    pub icon: String,
    pub inline_description: String,
    pub long_description: String,
    pub default_event_name_param: String,
    pub event_name_param_label: String,
    pub show_page_time_aggregation_selection: bool,
    pub default_time_aggregation: String,
    pub event_name_param_choices: Vec<toml::Value>,
    pub data: Vec<toml::Table>,
    pub widgets: Vec<toml::Table>,
}

/// Upper bound for every minute-valued setting (one year)
pub const MAX_MINUTES: i64 = 366 * 24 * 60;

/// Environment value, else file value, else default
fn layered<T>(var: &str, file_value: Option<T>, default: impl FnOnce() -> T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: {:?}", var, raw)),
        Err(_) => Ok(file_value.unwrap_or_else(default)),
    }
}

fn layered_path(var: &str, file_value: Option<String>) -> Option<String> {
    env::var(var).ok().or(file_value).filter(|p| !p.trim().is_empty())
}

fn layered_bool(var: &str, file_value: Option<bool>, default: bool) -> Result<bool> {
    match env::var(var) {
        Ok(raw) => parse_bool(&raw).with_context(|| format!("Invalid value for {}: {:?}", var, raw)),
        Err(_) => Ok(file_value.unwrap_or(default)),
    }
}

/// Accepts true/false, yes/no, on/off and 1/0 in any case
pub fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(anyhow!("expected a boolean, got {:?}", other)),
    }
}

impl Configuration {
    /// Load configuration from environment variables and optional configuration files
    ///
    /// Configuration loading order (later sources override earlier ones):
    /// 1. Default values
    /// 2. /etc/dashium.toml (if exists)
    /// 3. ~/.dashium.toml (if exists)
    /// 4. ./dashium.toml (if exists)
    /// 5. Environment variables
    ///
    /// `DASHIUM_CONFIG` names a single file that replaces steps 2-4.
    pub fn load() -> Result<Self> {
        let toml_config = Self::load_toml_config()?;
        Self::from_toml(toml_config)
    }

    /// Build a configuration from an already-merged TOML layer plus the environment
    pub fn from_toml(toml_config: parser::TomlConfig) -> Result<Self> {
        let server = ServerConfig::load(&toml_config)?;
        let paths = PathConfig::load(&toml_config)?;
        let auth = AuthConfig::load(&toml_config)?;
        let session = SessionConfig::load(&toml_config)?;
        let lockout = LockoutConfig::load(&toml_config)?;
        let web_views = WebViewsConfig::load(&toml_config);
        let tls = TlsConfig::load(&toml_config)?;
        let dashboards = DashboardConfig::load_all(&toml_config)?;

        let development_mode = layered_bool(
            "DEVELOPMENT_MODE",
            toml_config.development_mode,
            defaults::default_development_mode(),
        )?;

        Ok(Self {
            server,
            paths,
            auth,
            session,
            lockout,
            web_views,
            tls,
            dashboards,
            development_mode,
        })
    }

    /// Load and merge TOML configuration files from standard locations
    fn load_toml_config() -> Result<parser::TomlConfig> {
        let mut configs = Vec::new();

        for path in parser::get_config_file_paths() {
            let config = parser::parse_toml_file(&path)?;
            if path.exists() {
                tracing::info!("Loaded configuration file {}", path.display());
            }
            configs.push(config);
        }

        Ok(parser::merge_toml_configs(configs))
    }

    /// Convert the current configuration to TOML format
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Get the server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Session and lockout tunables for the auth manager
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            session_timeout: self.session.timeout(),
            max_failed_attempts: self.lockout.max_attempts,
            lockout_duration: self.lockout.duration(),
        }
    }
}

impl ServerConfig {
    fn load(toml_config: &parser::TomlConfig) -> Result<Self> {
        let file = toml_config.server.clone().unwrap_or_default();

        Ok(Self {
            host: layered("HOST", file.host, defaults::default_host)?,
            port: layered("PORT", file.port, defaults::default_port)?,
        })
    }
}

impl PathConfig {
    fn load(toml_config: &parser::TomlConfig) -> Result<Self> {
        let file = toml_config.paths.clone().unwrap_or_default();

        Ok(Self {
            templates: layered(
                "TEMPLATES_DIR",
                file.templates,
                defaults::default_templates_directory,
            )?,
            static_files: layered(
                "STATIC_DIR",
                file.static_files,
                defaults::default_static_directory,
            )?,
        })
    }
}

impl AuthConfig {
    fn load(toml_config: &parser::TomlConfig) -> Result<Self> {
        let file = toml_config.auth.clone().unwrap_or_default();

        let enabled = layered_bool(
            "AUTHENTICATION_ENABLED",
            file.enabled,
            defaults::default_auth_enabled(),
        )?;

        let users = file
            .users
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match (entry.username, entry.password) {
                (Some(username), Some(password)) if !username.is_empty() => {
                    Some(UserCredentials { username, password })
                }
                _ => {
                    tracing::warn!(
                        "Ignoring auth.users entry {}: username and password are required",
                        index
                    );
                    None
                }
            })
            .collect();

        Ok(Self { enabled, users })
    }
}

impl SessionConfig {
    fn load(toml_config: &parser::TomlConfig) -> Result<Self> {
        let file = toml_config.session.clone().unwrap_or_default();

        let timeout_minutes = layered(
            "SESSION_TIMEOUT_MINUTES",
            file.timeout_minutes,
            defaults::default_session_timeout_minutes,
        )?;
        if !(1..=MAX_MINUTES).contains(&timeout_minutes) {
            anyhow::bail!(
                "session timeout must be between 1 and {} minutes, got {}",
                MAX_MINUTES,
                timeout_minutes
            );
        }

        let cleanup_interval_minutes = layered(
            "SESSION_CLEANUP_INTERVAL_MINUTES",
            file.cleanup_interval_minutes,
            defaults::default_cleanup_interval_minutes,
        )?;
        if !(1..=MAX_MINUTES as u64).contains(&cleanup_interval_minutes) {
            anyhow::bail!(
                "session cleanup interval must be between 1 and {} minutes, got {}",
                MAX_MINUTES,
                cleanup_interval_minutes
            );
        }

        Ok(Self {
            timeout_minutes,
            cleanup_interval_minutes,
            secure_cookies: layered_bool(
                "SECURE_COOKIES",
                file.secure_cookies,
                defaults::default_secure_cookies(),
            )?,
        })
    }
}

impl LockoutConfig {
    fn load(toml_config: &parser::TomlConfig) -> Result<Self> {
        let file = toml_config.lockout.clone().unwrap_or_default();

        let duration_minutes = layered(
            "LOCKOUT_DURATION_MINUTES",
            file.duration_minutes,
            defaults::default_lockout_duration_minutes,
        )?;
        if !(0..=MAX_MINUTES).contains(&duration_minutes) {
            anyhow::bail!(
                "lockout duration must be between 0 and {} minutes, got {}",
                MAX_MINUTES,
                duration_minutes
            );
        }

        Ok(Self {
            max_attempts: layered(
                "LOCKOUT_MAX_ATTEMPTS",
                file.max_attempts,
                defaults::default_lockout_max_attempts,
            )?,
            duration_minutes,
        })
    }
}

impl WebViewsConfig {
    fn load(toml_config: &parser::TomlConfig) -> Self {
        let file = toml_config.web_views.clone().unwrap_or_default();

        Self {
            application_name: file
                .application_name
                .unwrap_or_else(defaults::default_application_name),
            server_info: file.server_info.unwrap_or_else(defaults::default_server_info),
            home_page_intro: file
                .home_page_intro
                .unwrap_or_else(defaults::default_home_page_intro),
            top_bar_links: file
                .top_bar_links
                .unwrap_or_else(defaults::default_top_bar_links),
            enable_admin_panel: file
                .enable_admin_panel
                .unwrap_or_else(defaults::default_enable_admin_panel),
        }
    }
}

impl TlsConfig {
    fn load(toml_config: &parser::TomlConfig) -> Result<Self> {
        let file = toml_config.tls.clone().unwrap_or_default();

        let config = Self {
            enable_https: layered_bool(
                "ENABLE_HTTPS",
                file.enable_https,
                defaults::default_enable_https(),
            )?,
            cert_file: layered_path("SSL_CERT_FILE", file.cert_file),
            key_file: layered_path("SSL_KEY_FILE", file.key_file),
            cert_chain_file: layered_path("SSL_CERT_CHAIN_FILE", file.cert_chain_file),
        };

        if config.enable_https {
            config.check_files()?;
        }
        Ok(config)
    }

    /// HTTPS needs a certificate and key on disk; a chain file is optional
    fn check_files(&self) -> Result<()> {
        let (Some(cert_file), Some(key_file)) = (&self.cert_file, &self.key_file) else {
            anyhow::bail!("HTTPS is enabled but tls.cert_file and tls.key_file are required");
        };

        let required = [("certificate", cert_file), ("key", key_file)];
        let chain = self.cert_chain_file.as_ref().map(|f| ("certificate chain", f));

        for (kind, file) in required.into_iter().chain(chain) {
            if !Path::new(file).exists() {
                anyhow::bail!("TLS {} file not found: {}", kind, file);
            }
        }
        Ok(())
    }
}

impl DashboardConfig {
    fn load_all(toml_config: &parser::TomlConfig) -> Result<Vec<Self>> {
        toml_config
            .dashboards
            .clone()
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let id = entry
                    .id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| anyhow!("dashboards entry {} is missing 'id'", index))?;

                Ok(Self {
                    url: entry.url.unwrap_or_else(|| id.clone()),
                    title: entry.title.unwrap_or_else(|| id.clone()),
                    icon: entry.icon.unwrap_or_default(),
                    inline_description: entry.inline_description.unwrap_or_default(),
                    long_description: entry.long_description.unwrap_or_default(),
                    default_event_name_param: entry.default_event_name_param.unwrap_or_default(),
                    event_name_param_label: entry.event_name_param_label.unwrap_or_default(),
                    show_page_time_aggregation_selection: entry
                        .show_page_time_aggregation_selection
                        .unwrap_or(true),
                    default_time_aggregation: entry
                        .default_time_aggregation
                        .unwrap_or_else(defaults::default_time_aggregation),
                    event_name_param_choices: entry.event_name_param_choices.unwrap_or_default(),
                    data: entry.data.unwrap_or_default(),
                    widgets: entry.widgets.unwrap_or_default(),
                    id,
                })
            })
            .collect()
    }

    /// Request path of the dashboard page
    pub fn path(&self) -> String {
        format!("/dashboard/{}", self.url.trim_start_matches('/'))
    }

    /// Long description, else the inline one, with line breaks as `<br />`
    pub fn description_html(&self) -> String {
        let text = if self.long_description.is_empty() {
            &self.inline_description
        } else {
            &self.long_description
        };
        text.replace('\n', "<br />")
    }
}

impl LockoutConfig {
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.duration_minutes)
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.timeout_minutes)
    }

    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_minutes * 60)
    }
}

impl Default for Configuration {
    /// Built-in defaults with no files or environment applied
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: defaults::default_host(),
                port: defaults::default_port(),
            },
            paths: PathConfig {
                templates: defaults::default_templates_directory(),
                static_files: defaults::default_static_directory(),
            },
            auth: AuthConfig {
                enabled: defaults::default_auth_enabled(),
                users: Vec::new(),
            },
            session: SessionConfig {
                timeout_minutes: defaults::default_session_timeout_minutes(),
                cleanup_interval_minutes: defaults::default_cleanup_interval_minutes(),
                secure_cookies: defaults::default_secure_cookies(),
            },
            lockout: LockoutConfig {
                max_attempts: defaults::default_lockout_max_attempts(),
                duration_minutes: defaults::default_lockout_duration_minutes(),
            },
            web_views: WebViewsConfig {
                application_name: defaults::default_application_name(),
                server_info: defaults::default_server_info(),
                home_page_intro: defaults::default_home_page_intro(),
                top_bar_links: defaults::default_top_bar_links(),
                enable_admin_panel: defaults::default_enable_admin_panel(),
            },
            tls: TlsConfig::default(),
            dashboards: Vec::new(),
            development_mode: defaults::default_development_mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool(" YES ").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("off").unwrap());
        assert!(!parse_bool("False").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_incomplete_users_are_skipped() {
        let toml_config: parser::TomlConfig = toml::from_str(
            r#"
[[auth.users]]
username = "admin"
password = "pw"

[[auth.users]]
username = "nopass"

[[auth.users]]
password = "nouser"
"#,
        )
        .unwrap();

        let auth = AuthConfig::load(&toml_config).unwrap();
        assert_eq!(auth.users.len(), 1);
        assert_eq!(auth.users[0].username, "admin");
    }

    #[test]
    fn test_web_views_from_file() {
        let toml_config: parser::TomlConfig = toml::from_str(
            r#"
[web_views]
application_name = "Ops"
enable_admin_panel = false
"#,
        )
        .unwrap();

        let views = WebViewsConfig::load(&toml_config);
        assert_eq!(views.application_name, "Ops");
        assert!(!views.enable_admin_panel);
        assert_eq!(views.top_bar_links, defaults::default_top_bar_links());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = UserCredentials {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_auth_settings() {
        let mut config = Configuration::default();
        config.session.timeout_minutes = 90;
        config.lockout.max_attempts = 4;
        config.lockout.duration_minutes = 15;

        let settings = config.auth_settings();
        assert_eq!(settings.session_timeout, chrono::Duration::minutes(90));
        assert_eq!(settings.max_failed_attempts, 4);
        assert_eq!(settings.lockout_duration, chrono::Duration::minutes(15));
    }

    #[test]
    fn test_dashboards_from_file() {
        let toml_config: parser::TomlConfig = toml::from_str(
            r#"
[[dashboards]]
id = "cpu"
title = "CPU Usage"
icon = "bars"
inline_description = "Load per host"
long_description = "Load per host\nsampled every minute"

[[dashboards.widgets]]
type = "graph"
title = "Load"

[[dashboards]]
id = "memory"
url = "/mem"
"#,
        )
        .unwrap();

        let dashboards = DashboardConfig::load_all(&toml_config).unwrap();
        assert_eq!(dashboards.len(), 2);

        let cpu = &dashboards[0];
        assert_eq!(cpu.url, "cpu");
        assert_eq!(cpu.path(), "/dashboard/cpu");
        assert_eq!(cpu.widgets[0]["type"].as_str(), Some("graph"));
        assert_eq!(cpu.default_time_aggregation, "disabled");
        assert!(cpu.show_page_time_aggregation_selection);
        assert_eq!(
            cpu.description_html(),
            "Load per host<br />sampled every minute"
        );

        let memory = &dashboards[1];
        assert_eq!(memory.title, "memory");
        assert_eq!(memory.path(), "/dashboard/mem");
        assert_eq!(memory.description_html(), "");
    }

    #[test]
    fn test_dashboard_without_id_is_an_error() {
        let toml_config: parser::TomlConfig = toml::from_str(
            r#"
[[dashboards]]
title = "Nameless"
"#,
        )
        .unwrap();

        let err = DashboardConfig::load_all(&toml_config).unwrap_err();
        assert!(err.to_string().contains("missing 'id'"));
    }

    #[test]
    fn test_tls_requires_existing_cert_and_key() {
        let dir = tempfile::TempDir::new().unwrap();
        let cert = dir.path().join("cert.pem");
        std::fs::write(&cert, "cert").unwrap();
        let cert = cert.to_string_lossy().into_owned();
        let missing = dir.path().join("missing.pem").to_string_lossy().into_owned();

        let mut tls = TlsConfig {
            enable_https: true,
            cert_file: Some(cert.clone()),
            key_file: None,
            cert_chain_file: None,
        };
        assert!(tls.check_files().is_err());

        tls.key_file = Some(missing.clone());
        let err = tls.check_files().unwrap_err();
        assert!(err.to_string().contains("key file not found"));

        tls.key_file = Some(cert.clone());
        assert!(tls.check_files().is_ok());

        tls.cert_chain_file = Some(missing);
        let err = tls.check_files().unwrap_err();
        assert!(err.to_string().contains("certificate chain file not found"));
    }

    #[test]
    fn test_bind_addr() {
        let config = Configuration::default();
        assert_eq!(config.bind_addr(), "localhost:8080");
    }
}
